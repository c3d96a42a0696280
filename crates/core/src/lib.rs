//! `groundwork-core`: the classified error model shared by every layer.
//!
//! This crate is pure data: no I/O, no logging, no driver types. Failures are
//! classified once, at the point they are detected, and then travel unchanged
//! up to the logging and HTTP boundaries.

pub mod error;
pub mod query_arg;
pub mod stack;

pub use error::{
    is_cancellation, AppResult, ApplicationError, BoxError, Cancelled, Error, ErrorFields, Origin,
    QueryError, Severity,
};
pub use query_arg::QueryArg;
pub use stack::{StackFrame, MAX_FRAMES};
