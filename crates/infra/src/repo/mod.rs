//! Relational data access over `sqlx`'s `Any` driver.
//!
//! [`Repo`] owns the pool. It hands out pool-bound DAOs with
//! [`Repo::non_tx`] and runs units of work in serializable transactions with
//! [`Repo::serializable_tx`].

pub mod dao;
pub mod dialect;
pub mod record;
pub mod tx;

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use groundwork_core::{BoxError, Error};
use groundwork_observability::Logger;
use sqlx::any::AnyPoolOptions;
use sqlx::AnyPool;
use tokio::sync::Mutex;

use crate::config::RepoConfig;
use crate::scope::Scope;

pub use dao::{Dao, ExecResult};
pub use dialect::{Dialect, MissingNamedArg, NamedArgs};
pub use record::{ColumnMismatch, Record, Scalar, TooManyRows};
pub use tx::{serializable_tx, Transactional, TxCounters, TxStats};

/// SQLSTATE for a serialization failure.
const SERIALIZATION_FAILURE: &str = "40001";

#[derive(Debug, Clone)]
pub struct Repo {
    pool: AnyPool,
    dialect: Dialect,
    counters: Arc<TxCounters>,
}

impl Repo {
    pub fn new(pool: AnyPool, dialect: Dialect) -> Self {
        Self {
            pool,
            dialect,
            counters: Arc::new(TxCounters::default()),
        }
    }

    /// Open a pool for `config.database_url`.
    pub async fn connect(config: &RepoConfig) -> Result<Self, Error> {
        let dialect = config
            .dialect()
            .map_err(|err| Error::wrap(err, "Invalid database configuration"))?;

        sqlx::any::install_default_drivers();
        let pool = AnyPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&config.database_url)
            .await
            .map_err(|err| Error::wrap_db(err, "Failed to connect to database"))?;

        Ok(Self::new(pool, dialect))
    }

    pub fn pool(&self) -> &AnyPool {
        &self.pool
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn counters(&self) -> &TxCounters {
        &self.counters
    }

    /// A DAO bound to the pool; every statement runs in its own implicit
    /// transaction.
    pub fn non_tx(&self, scope: &Scope) -> Dao {
        Dao::for_pool(self.pool.clone(), self.dialect, scope)
    }

    /// Run `work` in a serializable transaction. See [`tx`] for the outcome
    /// rules.
    pub async fn serializable_tx<T, F, Fut>(&self, scope: &Scope, work: F) -> Result<T, Error>
    where
        F: FnOnce(Dao) -> Fut,
        Fut: Future<Output = Result<T, Error>>,
    {
        tx::serializable_tx(self, scope, work).await
    }
}

#[async_trait]
impl Transactional for Repo {
    type Handle = Dao;

    async fn begin(&self, scope: &Scope) -> Result<Dao, BoxError> {
        let tx = self.pool.begin().await?;
        Ok(Dao::for_transaction(
            Arc::new(Mutex::new(Some(tx))),
            self.dialect,
            scope,
        ))
    }

    async fn set_serializable(&self, dao: &Dao) -> Result<(), Error> {
        dao.exec(self.dialect.serializable_statement(), &[]).await?;
        Ok(())
    }

    async fn commit(&self, dao: &Dao) -> Result<(), BoxError> {
        match dao.take_transaction().await {
            Some(tx) => Ok(tx.commit().await?),
            None => Err(Error::new("transaction already finished").into()),
        }
    }

    /// A transaction already taken by a failed commit was rolled back when
    /// sqlx dropped it, so there is nothing left to do.
    async fn rollback(&self, dao: &Dao) -> Result<(), BoxError> {
        match dao.take_transaction().await {
            Some(tx) => Ok(tx.rollback().await?),
            None => Ok(()),
        }
    }

    fn counters(&self) -> &TxCounters {
        &self.counters
    }

    fn handle_logger(&self, dao: &Dao) -> Logger {
        dao.scope().logger().clone()
    }
}

/// Whether `err` was caused by a serialization conflict (SQLSTATE 40001).
///
/// Such transactions can be retried from the start.
pub fn is_serialization_failure(err: &Error) -> bool {
    err.base().causes().any(|cause| {
        matches!(
            cause.downcast_ref::<sqlx::Error>(),
            Some(sqlx::Error::Database(db)) if db.code().as_deref() == Some(SERIALIZATION_FAILURE)
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_errors_are_not_serialization_failures() {
        assert!(!is_serialization_failure(&Error::new("boom")));
        assert!(!is_serialization_failure(&Error::wrap_db(
            sqlx::Error::RowNotFound,
            "Error running Get"
        )));
    }
}
