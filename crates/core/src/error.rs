//! Classified error model.
//!
//! Every failure carries two classifications:
//!
//! - [`Origin`]: whose fault it is (the caller's input, this application, or a
//!   third-party system such as the database).
//! - [`Severity`]: whether it is an unexpected failure or an anticipated,
//!   recoverable condition (for example a caller abandoning a request).
//!
//! `Origin` decides what the outside world sees (`internal()` errors are
//! redacted to their message at the HTTP boundary) and `Severity` decides the log
//! level (`warning()` errors are logged at warn).
//!
//! Errors are built exactly once, at the failure site, through the constructors
//! on [`Error`]. Each constructor records a stack snapshot starting at its caller.

use std::error::Error as StdError;
use std::fmt;

use serde::Serialize;

use crate::query_arg::QueryArg;
use crate::stack::{self, StackFrame};

/// Owned, thread-safe cause.
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Result type used across the workspace.
pub type AppResult<T> = Result<T, Error>;

/// Whether a failure was expected.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Unexpected failure.
    Error,
    /// Anticipated or recoverable condition.
    Warning,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
        }
    }
}

/// Which party caused a failure.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Origin {
    /// Malformed or invalid caller-supplied data.
    Input,
    /// A bug or invariant violation in this codebase.
    Application,
    /// Another system: database, network peer, external API.
    ThirdParty,
}

impl Origin {
    pub fn as_str(self) -> &'static str {
        match self {
            Origin::Input => "input",
            Origin::Application => "application",
            Origin::ThirdParty => "third-party",
        }
    }

    /// Internal failures are not the caller's fault and must not leak details.
    pub fn is_internal(self) -> bool {
        matches!(self, Origin::Application | Origin::ThirdParty)
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Signal that an operation was abandoned by its caller.
///
/// A cause chain containing this value classifies database failures as
/// warnings rather than errors.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, thiserror::Error)]
#[error("operation cancelled")]
pub struct Cancelled;

/// Returns true if `err` or any of its sources is a [`Cancelled`].
pub fn is_cancellation(err: &(dyn StdError + 'static)) -> bool {
    let mut next = Some(err);
    while let Some(current) = next {
        if current.is::<Cancelled>() {
            return true;
        }
        next = current.source();
    }
    false
}

/// The shared body of every classified error.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct ApplicationError {
    severity: Severity,
    origin: Origin,
    message: String,
    #[source]
    inner: Option<BoxError>,
    stack_trace: Vec<StackFrame>,
}

impl ApplicationError {
    #[track_caller]
    fn capture(
        severity: Severity,
        origin: Origin,
        message: impl Into<String>,
        inner: Option<BoxError>,
    ) -> Self {
        Self {
            severity,
            origin,
            message: message.into(),
            inner,
            stack_trace: stack::capture(),
        }
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn origin(&self) -> Origin {
        self.origin
    }

    /// Human-readable description. Stable across retries; not an identifier.
    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn inner(&self) -> Option<&(dyn StdError + Send + Sync + 'static)> {
        self.inner.as_deref()
    }

    pub fn stack_trace(&self) -> &[StackFrame] {
        &self.stack_trace
    }

    pub fn internal(&self) -> bool {
        self.origin.is_internal()
    }

    pub fn warning(&self) -> bool {
        self.severity == Severity::Warning
    }

    /// True if some error in the inner cause chain has type `E` and equals `target`.
    ///
    /// Always false when there is no inner cause.
    pub fn is<E>(&self, target: &E) -> bool
    where
        E: StdError + PartialEq + 'static,
    {
        self.causes()
            .any(|cause| cause.downcast_ref::<E>().is_some_and(|found| found == target))
    }

    /// True if some error in the inner cause chain has type `E`.
    pub fn has_cause<E>(&self) -> bool
    where
        E: StdError + 'static,
    {
        self.causes().any(|cause| cause.is::<E>())
    }

    /// Walk the inner cause and its sources, nearest first.
    pub fn causes(&self) -> impl Iterator<Item = &(dyn StdError + 'static)> {
        let first = self
            .inner
            .as_deref()
            .map(|inner| inner as &(dyn StdError + 'static));
        std::iter::successors(first, |&current| current.source())
    }
}

/// A data-access failure, with the statement and bind parameters that failed.
///
/// The statement and parameters are diagnostics only; nothing executes them.
/// Its source is the shared body, whose own source is the driver cause.
#[derive(Debug, thiserror::Error)]
#[error("{base}")]
pub struct QueryError {
    #[source]
    base: ApplicationError,
    query: String,
    args: Vec<QueryArg>,
}

impl QueryError {
    pub fn base(&self) -> &ApplicationError {
        &self.base
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn args(&self) -> &[QueryArg] {
        &self.args
    }
}

/// A classified failure.
///
/// Both variants share the [`ApplicationError`] body; `Query` adds the failing
/// statement for diagnostics.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Application(#[from] ApplicationError),
    #[error(transparent)]
    Query(#[from] QueryError),
}

impl Error {
    /// Unexpected application failure caused by `cause`.
    #[track_caller]
    pub fn wrap(cause: impl Into<BoxError>, message: impl Into<String>) -> Self {
        Self::Application(ApplicationError::capture(
            Severity::Error,
            Origin::Application,
            message,
            Some(cause.into()),
        ))
    }

    /// Unexpected application failure with no underlying cause.
    #[track_caller]
    pub fn new(message: impl Into<String>) -> Self {
        Self::Application(ApplicationError::capture(
            Severity::Error,
            Origin::Application,
            message,
            None,
        ))
    }

    /// A checked validation failure on caller input. Expected, so a warning.
    #[track_caller]
    pub fn new_input(message: impl Into<String>) -> Self {
        Self::Application(ApplicationError::capture(
            Severity::Warning,
            Origin::Input,
            message,
            None,
        ))
    }

    /// Caller input that broke parsing or decoding in a way no check anticipated.
    #[track_caller]
    pub fn wrap_input(cause: impl Into<BoxError>, message: impl Into<String>) -> Self {
        Self::Application(ApplicationError::capture(
            Severity::Error,
            Origin::Input,
            message,
            Some(cause.into()),
        ))
    }

    /// Database failure. A warning when the cause is a cancellation.
    #[track_caller]
    pub fn wrap_db(cause: impl Into<BoxError>, message: impl Into<String>) -> Self {
        let cause = cause.into();
        Self::Application(ApplicationError::capture(
            db_severity(&cause),
            Origin::ThirdParty,
            message,
            Some(cause),
        ))
    }

    /// Statement failure, carrying the statement and its parameters.
    #[track_caller]
    pub fn wrap_query(
        cause: impl Into<BoxError>,
        message: impl Into<String>,
        query: impl Into<String>,
        args: Vec<QueryArg>,
    ) -> Self {
        let cause = cause.into();
        Self::Query(QueryError {
            base: ApplicationError::capture(
                db_severity(&cause),
                Origin::ThirdParty,
                message,
                Some(cause),
            ),
            query: query.into(),
            args,
        })
    }

    pub fn base(&self) -> &ApplicationError {
        match self {
            Error::Application(err) => err,
            Error::Query(err) => &err.base,
        }
    }

    pub fn as_query(&self) -> Option<&QueryError> {
        match self {
            Error::Query(err) => Some(err),
            Error::Application(_) => None,
        }
    }

    pub fn severity(&self) -> Severity {
        self.base().severity()
    }

    pub fn origin(&self) -> Origin {
        self.base().origin()
    }

    pub fn message(&self) -> &str {
        self.base().message()
    }

    pub fn inner(&self) -> Option<&(dyn StdError + Send + Sync + 'static)> {
        self.base().inner()
    }

    pub fn stack_trace(&self) -> &[StackFrame] {
        self.base().stack_trace()
    }

    pub fn internal(&self) -> bool {
        self.base().internal()
    }

    pub fn warning(&self) -> bool {
        self.base().warning()
    }

    pub fn is<E>(&self, target: &E) -> bool
    where
        E: StdError + PartialEq + 'static,
    {
        self.base().is(target)
    }

    pub fn has_cause<E>(&self) -> bool
    where
        E: StdError + 'static,
    {
        self.base().has_cause::<E>()
    }

    /// Flattened, serializable view for log sinks that know nothing of this type.
    pub fn fields(&self) -> ErrorFields {
        let base = self.base();
        ErrorFields {
            message: base.message.clone(),
            origin: base.origin,
            severity: base.severity,
            internal: base.internal(),
            stack: base.stack_trace.clone(),
            inner: base.inner.as_ref().map(|inner| inner.to_string()),
            query: self.as_query().map(|q| q.query.clone()),
            query_args: self.as_query().map(|q| q.args.clone()),
        }
    }
}

fn db_severity(cause: &BoxError) -> Severity {
    if is_cancellation(&**cause) {
        Severity::Warning
    } else {
        Severity::Error
    }
}

/// Every field of an [`Error`], detached from the error itself.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorFields {
    pub message: String,
    pub origin: Origin,
    pub severity: Severity,
    pub internal: bool,
    pub stack: Vec<StackFrame>,
    pub inner: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query_args: Option<Vec<QueryArg>>,
}
