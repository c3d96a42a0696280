//! Infrastructure layer: request scope, configuration, data access and the
//! serializable transaction executor.

pub mod config;
pub mod repo;
pub mod scope;

pub use config::{ConfigError, RepoConfig};
pub use repo::{
    is_serialization_failure, serializable_tx, ColumnMismatch, Dao, Dialect, ExecResult,
    MissingNamedArg, NamedArgs, Record, Repo, Scalar, TooManyRows, Transactional, TxCounters,
    TxStats,
};
pub use scope::Scope;
