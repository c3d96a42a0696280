//! SQL dialect differences the data-access layer cares about.
//!
//! Two things vary by backend: the statement that raises a transaction to
//! serializable isolation, and the positional placeholder syntax. Statements
//! written with `?` placeholders are rewritten by [`Dialect::rebind`];
//! statements written with `:name` parameters by [`Dialect::compile_named`].

use std::collections::BTreeMap;

use groundwork_core::QueryArg;
use serde::Serialize;
use thiserror::Error;

use crate::config::ConfigError;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Dialect {
    Postgres,
    Sqlite,
}

/// A `:name` parameter had no value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("could not find name {0} in named arguments")]
pub struct MissingNamedArg(pub String);

/// Named bind parameters for [`Dialect::compile_named`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NamedArgs(BTreeMap<String, QueryArg>);

impl NamedArgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<QueryArg>) -> Self {
        self.0.insert(name.into(), value.into());
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<QueryArg>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&QueryArg> {
        self.0.get(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Dialect {
    /// Detect the dialect from a connection URL scheme.
    pub fn from_url(url: &str) -> Result<Self, ConfigError> {
        let scheme = url.split(':').next().unwrap_or_default().to_ascii_lowercase();
        match scheme.as_str() {
            "postgres" | "postgresql" => Ok(Dialect::Postgres),
            "sqlite" => Ok(Dialect::Sqlite),
            _ => Err(ConfigError::UnsupportedScheme(scheme)),
        }
    }

    /// Statement run first inside every serializable transaction.
    ///
    /// SQLite transactions are always serializable; the pragma pins the one
    /// setting that would weaken that for shared-cache connections.
    pub fn serializable_statement(self) -> &'static str {
        match self {
            Dialect::Postgres => "SET TRANSACTION ISOLATION LEVEL SERIALIZABLE",
            Dialect::Sqlite => "PRAGMA read_uncommitted = false",
        }
    }

    /// Placeholder for the 1-based parameter `index`.
    pub fn placeholder(self, index: usize) -> String {
        match self {
            Dialect::Postgres => format!("${index}"),
            Dialect::Sqlite => format!("?{index}"),
        }
    }

    /// Rewrite `?` placeholders into this dialect's syntax.
    ///
    /// Placeholders inside quoted literals and identifiers are left alone.
    pub fn rebind(self, query: &str) -> String {
        if self == Dialect::Sqlite {
            return query.to_string();
        }

        let mut out = String::with_capacity(query.len() + 8);
        let mut index = 0;
        scan(query, |token| match token {
            Token::Text(text) => out.push_str(text),
            Token::Char('?') => {
                index += 1;
                out.push_str(&self.placeholder(index));
            }
            Token::Char(c) => out.push(c),
            Token::Name(name) => {
                out.push(':');
                out.push_str(name);
            }
        });
        out
    }

    /// Rewrite `:name` parameters into positional placeholders.
    ///
    /// Returns the rewritten statement and the positional arguments in order.
    /// A name used twice binds once. `::` casts are not parameters.
    pub fn compile_named(
        self,
        query: &str,
        args: &NamedArgs,
    ) -> Result<(String, Vec<QueryArg>), MissingNamedArg> {
        let mut out = String::with_capacity(query.len() + 8);
        let mut order: Vec<&str> = Vec::new();
        let mut missing = None;

        scan(query, |token| match token {
            Token::Text(text) => out.push_str(text),
            Token::Char(c) => out.push(c),
            Token::Name(name) => {
                if args.get(name).is_none() && missing.is_none() {
                    missing = Some(name.to_string());
                }
                let position = match order.iter().position(|seen| *seen == name) {
                    Some(existing) => existing + 1,
                    None => {
                        order.push(name);
                        order.len()
                    }
                };
                out.push_str(&self.placeholder(position));
            }
        });

        if let Some(name) = missing {
            return Err(MissingNamedArg(name));
        }

        let positional = order
            .iter()
            .filter_map(|name| args.get(name).cloned())
            .collect();
        Ok((out, positional))
    }
}

enum Token<'a> {
    /// Passed through verbatim (quoted literals, identifiers, comments, `::`).
    Text(&'a str),
    Char(char),
    Name(&'a str),
}

/// Tokenize just enough SQL to find placeholders outside quotes and comments.
fn scan<'a>(query: &'a str, mut emit: impl FnMut(Token<'a>)) {
    let bytes = query.as_bytes();
    let mut i = 0;

    while i < query.len() {
        let c = query[i..].chars().next().unwrap_or_default();
        match c {
            '-' if bytes.get(i + 1) == Some(&b'-') => {
                let end = query[i..]
                    .find('\n')
                    .map(|offset| i + offset)
                    .unwrap_or(query.len());
                emit(Token::Text(&query[i..end]));
                i = end;
            }
            '/' if bytes.get(i + 1) == Some(&b'*') => {
                let end = query[i + 2..]
                    .find("*/")
                    .map(|offset| i + 2 + offset + 2)
                    .unwrap_or(query.len());
                emit(Token::Text(&query[i..end]));
                i = end;
            }
            '\'' | '"' => {
                let end = query[i + 1..]
                    .find(c)
                    .map(|offset| i + 1 + offset + 1)
                    .unwrap_or(query.len());
                emit(Token::Text(&query[i..end]));
                i = end;
            }
            ':' if bytes.get(i + 1) == Some(&b':') => {
                emit(Token::Text(&query[i..i + 2]));
                i += 2;
            }
            ':' if bytes.get(i + 1).is_some_and(|b| b.is_ascii_alphabetic() || *b == b'_') => {
                let start = i + 1;
                let end = query[start..]
                    .find(|ch: char| !(ch.is_ascii_alphanumeric() || ch == '_'))
                    .map(|offset| start + offset)
                    .unwrap_or(query.len());
                emit(Token::Name(&query[start..end]));
                i = end;
            }
            _ => {
                emit(Token::Char(c));
                i += c.len_utf8();
            }
        }
    }
}
