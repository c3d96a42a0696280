//! Data-access object: statement execution bound to a pool or a transaction.
//!
//! A [`Dao`] is created by [`Repo::non_tx`](super::Repo::non_tx) (bound to the
//! pool) or inside [`Repo::serializable_tx`](super::Repo::serializable_tx)
//! (bound to the open transaction). Every failure comes back as a classified
//! [`Error`]; driver failures carry the statement and its arguments.
//!
//! ## Cancellation
//!
//! Each operation races the driver future against the scope's cancellation
//! token. A cancelled operation fails with a query error whose cause is
//! [`Cancelled`], which classifies it as a third-party warning.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use futures::TryStreamExt;
use groundwork_core::{BoxError, Cancelled, Error, QueryArg};
use sqlx::any::{AnyArguments, AnyRow};
use sqlx::pool::PoolConnection;
use sqlx::query::Query;
use sqlx::{Any, AnyConnection, AnyPool, Transaction};
use tokio::sync::Mutex;

use super::dialect::{Dialect, NamedArgs};
use super::record::{column_names, Record, TooManyRows};
use crate::scope::Scope;

static NEXT_DAO_ID: AtomicU64 = AtomicU64::new(0);

/// Process-wide DAO id. Strictly increasing, starts at 1.
pub(crate) fn next_dao_id() -> u64 {
    NEXT_DAO_ID.fetch_add(1, Ordering::Relaxed) + 1
}

/// Transaction slot shared by a transaction DAO and the executor that owns
/// the commit/rollback decision. `None` once the transaction has finished.
pub(crate) type SharedTx = Arc<Mutex<Option<Transaction<'static, Any>>>>;

#[derive(Clone)]
enum Binding {
    Pool(AnyPool),
    Tx(SharedTx),
}

impl Binding {
    fn kind(&self) -> &'static str {
        match self {
            Binding::Pool(_) => "non-tx",
            Binding::Tx(_) => "tx",
        }
    }
}

/// Outcome of `exec` / `named_exec`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecResult {
    pub rows_affected: u64,
}

#[derive(Clone)]
pub struct Dao {
    id: u64,
    binding: Binding,
    dialect: Dialect,
    strict: bool,
    scope: Scope,
}

impl fmt::Debug for Dao {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dao")
            .field("id", &self.id)
            .field("kind", &self.binding.kind())
            .field("dialect", &self.dialect)
            .field("strict", &self.strict)
            .finish()
    }
}

enum Failure {
    Driver(sqlx::Error),
    Mapping(BoxError),
    Cancelled,
    Finished,
}

/// Run `$body` with `$conn: &mut AnyConnection` taken from the DAO's binding.
macro_rules! with_connection {
    ($dao:expr, $conn:ident => $body:expr) => {
        match &$dao.binding {
            Binding::Pool(pool) => match pool.acquire().await {
                Ok(mut pooled) => {
                    let $conn: &mut AnyConnection = pooled_connection(&mut pooled);
                    $body
                }
                Err(err) => Err(Failure::Driver(err)),
            },
            Binding::Tx(slot) => {
                let mut guard = slot.lock().await;
                match guard.as_mut() {
                    Some(tx) => {
                        let $conn: &mut AnyConnection = &mut **tx;
                        $body
                    }
                    None => Err(Failure::Finished),
                }
            }
        }
    };
}

fn pooled_connection(pooled: &mut PoolConnection<Any>) -> &mut AnyConnection {
    &mut **pooled
}

impl Dao {
    pub(crate) fn for_pool(pool: AnyPool, dialect: Dialect, scope: &Scope) -> Self {
        Self::bind(Binding::Pool(pool), dialect, scope)
    }

    pub(crate) fn for_transaction(tx: SharedTx, dialect: Dialect, scope: &Scope) -> Self {
        Self::bind(Binding::Tx(tx), dialect, scope)
    }

    fn bind(binding: Binding, dialect: Dialect, scope: &Scope) -> Self {
        let id = next_dao_id();
        let kind = binding.kind();
        let logger = scope
            .logger()
            .child(|| tracing::info_span!("dao", dao_id = id, dao_type = kind));
        logger.debug("DAO created");

        Self {
            id,
            binding,
            dialect,
            strict: true,
            scope: scope.with_logger(logger),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// The scope this DAO runs under; its logger carries the DAO's fields.
    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    pub fn is_transactional(&self) -> bool {
        matches!(self.binding, Binding::Tx(_))
    }

    /// Rewrite `?` placeholders for this DAO's dialect.
    pub fn rebind(&self, query: &str) -> String {
        self.dialect.rebind(query)
    }

    /// A DAO over the same binding that ignores result columns the record
    /// type does not declare. `self` keeps strict mapping.
    pub fn unsafe_mapping(&self) -> Dao {
        let logger = self
            .scope
            .logger()
            .child(|| tracing::info_span!("unsafe_dao", unsafe_mapping = true));
        logger.info(match self.binding {
            Binding::Pool(_) => "Unsafe DAO created",
            Binding::Tx(_) => "Unsafe transaction DAO created",
        });

        Self {
            id: self.id,
            binding: self.binding.clone(),
            dialect: self.dialect,
            strict: false,
            scope: self.scope.with_logger(logger),
        }
    }

    pub async fn exec(&self, query: &str, args: &[QueryArg]) -> Result<ExecResult, Error> {
        self.log_statement("exec", query, args);
        let outcome = self
            .guarded(async { with_connection!(self, conn => run_exec(conn, query, args).await) })
            .await;
        outcome.map_err(|failure| self.classify(failure, "Error running Exec", query, args))
    }

    /// Exactly one row mapped into `T`.
    pub async fn get<T: Record>(&self, query: &str, args: &[QueryArg]) -> Result<T, Error> {
        self.log_statement("get", query, args);
        let strict = self.strict;
        let outcome = self
            .guarded(async {
                with_connection!(self, conn => run_get::<T>(conn, query, args, strict).await)
            })
            .await;
        outcome.map_err(|failure| self.classify(failure, "Error running Get", query, args))
    }

    pub async fn select<T: Record>(&self, query: &str, args: &[QueryArg]) -> Result<Vec<T>, Error> {
        self.log_statement("select", query, args);
        let strict = self.strict;
        let outcome = self
            .guarded(async {
                with_connection!(self, conn => run_select::<T>(conn, query, args, strict).await)
            })
            .await;
        outcome.map_err(|failure| self.classify(failure, "Error running Select", query, args))
    }

    /// Execute a statement written with `:name` parameters.
    pub async fn named_exec(&self, query: &str, args: &NamedArgs) -> Result<ExecResult, Error> {
        self.log_statement("named_exec", query, args);
        let (compiled, positional) = match self.dialect.compile_named(query, args) {
            Ok(compiled) => compiled,
            Err(missing) => {
                return Err(Error::wrap_query(
                    missing,
                    "Error running NamedExec",
                    query,
                    Vec::new(),
                ));
            }
        };

        let outcome = self
            .guarded(async {
                with_connection!(self, conn => run_exec(conn, &compiled, &positional).await)
            })
            .await;
        outcome.map_err(|failure| {
            self.classify(failure, "Error running NamedExec", &compiled, &positional)
        })
    }

    /// Take the transaction out of the shared slot, leaving it finished.
    pub(crate) async fn take_transaction(&self) -> Option<Transaction<'static, Any>> {
        match &self.binding {
            Binding::Tx(slot) => slot.lock().await.take(),
            Binding::Pool(_) => None,
        }
    }

    async fn guarded<T>(
        &self,
        operation: impl Future<Output = Result<T, Failure>>,
    ) -> Result<T, Failure> {
        let token = self.scope.cancellation();
        if token.is_cancelled() {
            return Err(Failure::Cancelled);
        }
        tokio::select! {
            biased;
            _ = token.cancelled() => Err(Failure::Cancelled),
            outcome = operation => outcome,
        }
    }

    #[track_caller]
    fn classify(&self, failure: Failure, message: &str, query: &str, args: &[QueryArg]) -> Error {
        let args = args.to_vec();
        match failure {
            Failure::Driver(err) => Error::wrap_query(err, message, query, args),
            Failure::Mapping(err) => Error::wrap_query(err, message, query, args),
            Failure::Cancelled => Error::wrap_query(Cancelled, message, query, args),
            Failure::Finished => Error::new("transaction already finished"),
        }
    }

    fn log_statement(
        &self,
        operation: &'static str,
        query: &str,
        args: &(impl fmt::Debug + ?Sized),
    ) {
        self.scope.logger().in_scope(|| {
            tracing::debug!(operation, query, args = ?args, "Running statement");
        });
    }
}

fn bind_all<'q>(
    mut query: Query<'q, Any, AnyArguments<'q>>,
    args: &[QueryArg],
) -> Query<'q, Any, AnyArguments<'q>> {
    for arg in args {
        query = match arg.clone() {
            QueryArg::Null => query.bind(None::<String>),
            QueryArg::Bool(value) => query.bind(value),
            QueryArg::Int(value) => query.bind(value),
            QueryArg::Float(value) => query.bind(value),
            QueryArg::Text(value) => query.bind(value),
            QueryArg::Bytes(value) => query.bind(value),
        };
    }
    query
}

fn map_row<T: Record>(row: &AnyRow, strict: bool) -> Result<T, Failure> {
    if strict {
        T::check_columns(&column_names(row)).map_err(|err| Failure::Mapping(Box::new(err)))?;
    }
    T::from_row(row).map_err(Failure::Driver)
}

async fn run_exec(
    conn: &mut AnyConnection,
    query: &str,
    args: &[QueryArg],
) -> Result<ExecResult, Failure> {
    let done = bind_all(sqlx::query(query), args)
        .execute(conn)
        .await
        .map_err(Failure::Driver)?;
    Ok(ExecResult {
        rows_affected: done.rows_affected(),
    })
}

async fn run_get<T: Record>(
    conn: &mut AnyConnection,
    query: &str,
    args: &[QueryArg],
    strict: bool,
) -> Result<T, Failure> {
    let mut rows = bind_all(sqlx::query(query), args).fetch(conn);

    let first = match rows.try_next().await.map_err(Failure::Driver)? {
        Some(row) => row,
        None => return Err(Failure::Driver(sqlx::Error::RowNotFound)),
    };
    if rows.try_next().await.map_err(Failure::Driver)?.is_some() {
        return Err(Failure::Mapping(Box::new(TooManyRows)));
    }

    map_row(&first, strict)
}

async fn run_select<T: Record>(
    conn: &mut AnyConnection,
    query: &str,
    args: &[QueryArg],
    strict: bool,
) -> Result<Vec<T>, Failure> {
    let rows = bind_all(sqlx::query(query), args)
        .fetch_all(conn)
        .await
        .map_err(Failure::Driver)?;
    rows.iter().map(|row| map_row(row, strict)).collect()
}
