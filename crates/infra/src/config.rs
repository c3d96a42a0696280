//! Configuration loading and representation.

use thiserror::Error;

use crate::repo::Dialect;

const DEFAULT_MAX_CONNECTIONS: u32 = 5;

/// Configuration error raised while reading the environment.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required setting: {0}")]
    Missing(&'static str),

    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },

    #[error("unsupported database url scheme: {0}")]
    UnsupportedScheme(String),
}

/// Database connection settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoConfig {
    pub database_url: String,
    pub max_connections: u32,
}

impl RepoConfig {
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
        }
    }

    /// Read `DATABASE_URL` (required) and `DATABASE_MAX_CONNECTIONS`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let database_url = lookup("DATABASE_URL")
            .filter(|url| !url.trim().is_empty())
            .ok_or(ConfigError::Missing("DATABASE_URL"))?;

        let max_connections = match lookup("DATABASE_MAX_CONNECTIONS") {
            Some(raw) => raw
                .trim()
                .parse::<u32>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| ConfigError::Invalid {
                    key: "DATABASE_MAX_CONNECTIONS",
                    reason: format!("expected a positive integer, got '{raw}'"),
                })?,
            None => DEFAULT_MAX_CONNECTIONS,
        };

        let config = Self {
            database_url,
            max_connections,
        };
        // Reject unsupported backends before anything tries to connect.
        config.dialect()?;
        Ok(config)
    }

    pub fn dialect(&self) -> Result<Dialect, ConfigError> {
        Dialect::from_url(&self.database_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup<'a>(pairs: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<String> + 'a {
        move |key| {
            pairs
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.to_string())
        }
    }

    #[test]
    fn requires_database_url() {
        let err = RepoConfig::from_lookup(lookup(&[])).unwrap_err();
        assert_eq!(err, ConfigError::Missing("DATABASE_URL"));
    }

    #[test]
    fn reads_url_and_pool_size() {
        let config = RepoConfig::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://localhost/app"),
            ("DATABASE_MAX_CONNECTIONS", "12"),
        ]))
        .unwrap();
        assert_eq!(config.max_connections, 12);
        assert_eq!(config.dialect(), Ok(Dialect::Postgres));
    }

    #[test]
    fn rejects_zero_connections() {
        let err = RepoConfig::from_lookup(lookup(&[
            ("DATABASE_URL", "sqlite::memory:"),
            ("DATABASE_MAX_CONNECTIONS", "0"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "DATABASE_MAX_CONNECTIONS", .. }));
    }

    #[test]
    fn rejects_unknown_scheme() {
        let err = RepoConfig::from_lookup(lookup(&[("DATABASE_URL", "mysql://db/app")])).unwrap_err();
        assert_eq!(err, ConfigError::UnsupportedScheme("mysql".to_string()));
    }
}
