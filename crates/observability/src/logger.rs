//! The logger capability passed to every component that logs.
//!
//! A [`Logger`] is a `tracing` dispatcher plus a parent span. Everything
//! emitted through it goes to that dispatcher, nested under that span, no
//! matter what the process default is. Child loggers add context by opening a
//! child span (`dao_id`, `request_id`, ...), so each event carries the fields of
//! every logger it was derived from.

use groundwork_core::Error;
use tracing::{dispatcher, Dispatch, Level, Span};

/// Log levels, including the two that other loggers terminate on.
///
/// `Fatal` and `Panic` are emitted at `ERROR` with a `level_label` field and
/// never terminate the process or unwind. Terminating is a separate, explicit
/// decision for the caller.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
    Fatal,
    Panic,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
            LogLevel::Fatal => "fatal",
            LogLevel::Panic => "panic",
        }
    }

    pub fn tracing_level(self) -> Level {
        match self {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error | LogLevel::Fatal | LogLevel::Panic => Level::ERROR,
        }
    }
}

/// Architectural layer of a function boundary.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Layer {
    Handler,
    Service,
    Repo,
}

impl Layer {
    pub fn as_str(self) -> &'static str {
        match self {
            Layer::Handler => "handler",
            Layer::Service => "service",
            Layer::Repo => "repo",
        }
    }

    fn called(self) -> &'static str {
        match self {
            Layer::Handler => "Handler called",
            Layer::Service => "Service called",
            Layer::Repo => "Repo called",
        }
    }

    fn returned(self) -> &'static str {
        match self {
            Layer::Handler => "Handler returned",
            Layer::Service => "Service returned",
            Layer::Repo => "Repo returned",
        }
    }
}

/// Structured logger bound to an explicit dispatcher.
#[derive(Debug, Clone)]
pub struct Logger {
    dispatch: Dispatch,
    span: Span,
}

/// Error fields flattened to primitive values `tracing` can record.
struct ErrorEvent {
    origin: &'static str,
    severity: &'static str,
    internal: bool,
    stack: String,
    inner: Option<String>,
    query: Option<String>,
    query_args: Option<String>,
}

impl ErrorEvent {
    fn from_error(err: &Error) -> Self {
        let fields = err.fields();
        Self {
            origin: fields.origin.as_str(),
            severity: fields.severity.as_str(),
            internal: fields.internal,
            stack: serde_json::to_string(&fields.stack).unwrap_or_default(),
            inner: fields.inner,
            query: fields.query,
            query_args: fields
                .query_args
                .map(|args| serde_json::to_string(&args).unwrap_or_default()),
        }
    }
}

macro_rules! error_event {
    ($level:ident, $event:expr, $message:expr $(, $key:ident = $value:expr)*) => {
        tracing::event!(
            Level::$level,
            origin = $event.origin,
            severity = $event.severity,
            internal = $event.internal,
            error_stack = %$event.stack,
            inner_error = $event.inner.as_deref(),
            query = $event.query.as_deref(),
            query_args = $event.query_args.as_deref(),
            $($key = $value,)*
            "{}",
            $message
        )
    };
}

impl Logger {
    /// Logger emitting to `dispatch`, with no parent span.
    pub fn new(dispatch: Dispatch) -> Self {
        Self {
            dispatch,
            span: Span::none(),
        }
    }

    /// Snapshot of the dispatcher currently in effect (normally the global one).
    ///
    /// Call this at the edge of the program, not inside library code.
    pub fn current() -> Self {
        dispatcher::get_default(|dispatch| Self::new(dispatch.clone()))
    }

    /// Logger that discards everything.
    pub fn disabled() -> Self {
        Self::new(Dispatch::none())
    }

    pub fn dispatch(&self) -> &Dispatch {
        &self.dispatch
    }

    pub fn span(&self) -> &Span {
        &self.span
    }

    /// Run `f` with this logger's dispatcher as default and its span entered.
    ///
    /// Any `tracing` macro used inside `f` is routed through this logger.
    pub fn in_scope<T>(&self, f: impl FnOnce() -> T) -> T {
        dispatcher::with_default(&self.dispatch, || self.span.in_scope(f))
    }

    /// Derive a logger whose events nest under the span built by `make_span`.
    ///
    /// The span is created inside this logger's scope, so it becomes a child
    /// of this logger's span.
    pub fn child(&self, make_span: impl FnOnce() -> Span) -> Self {
        let span = self.in_scope(make_span);
        Self {
            dispatch: self.dispatch.clone(),
            span,
        }
    }

    pub fn for_request(&self, request_id: &str) -> Self {
        self.child(|| tracing::info_span!("request", request_id = %request_id))
    }

    /// Enter a layer function: logs "<Layer> called" under a span naming it.
    pub fn function(&self, layer: Layer, function: &'static str) -> Self {
        let logger =
            self.child(|| tracing::info_span!("call", layer = layer.as_str(), function = function));
        logger.info(layer.called());
        logger
    }

    /// Pair of [`Logger::function`].
    pub fn returned(&self, layer: Layer) {
        self.info(layer.returned());
    }

    pub fn log(&self, level: LogLevel, message: &str) {
        self.in_scope(|| match level {
            LogLevel::Trace => tracing::trace!("{}", message),
            LogLevel::Debug => tracing::debug!("{}", message),
            LogLevel::Info => tracing::info!("{}", message),
            LogLevel::Warn => tracing::warn!("{}", message),
            LogLevel::Error => tracing::error!("{}", message),
            LogLevel::Fatal => tracing::error!(level_label = "fatal", "{}", message),
            LogLevel::Panic => tracing::error!(level_label = "panic", "{}", message),
        })
    }

    pub fn trace(&self, message: &str) {
        self.log(LogLevel::Trace, message);
    }

    pub fn debug(&self, message: &str) {
        self.log(LogLevel::Debug, message);
    }

    pub fn info(&self, message: &str) {
        self.log(LogLevel::Info, message);
    }

    pub fn warn(&self, message: &str) {
        self.log(LogLevel::Warn, message);
    }

    pub fn error(&self, message: &str) {
        self.log(LogLevel::Error, message);
    }

    /// Highest severity. Does not exit.
    pub fn fatal(&self, message: &str) {
        self.log(LogLevel::Fatal, message);
    }

    /// Highest severity. Does not unwind.
    pub fn panic(&self, message: &str) {
        self.log(LogLevel::Panic, message);
    }

    /// Log `message` with every field of `err` attached.
    pub fn log_error(&self, level: LogLevel, err: &Error, message: &str) {
        let event = ErrorEvent::from_error(err);
        self.in_scope(|| match level {
            LogLevel::Trace => error_event!(TRACE, event, message),
            LogLevel::Debug => error_event!(DEBUG, event, message),
            LogLevel::Info => error_event!(INFO, event, message),
            LogLevel::Warn => error_event!(WARN, event, message),
            LogLevel::Error => error_event!(ERROR, event, message),
            LogLevel::Fatal => error_event!(ERROR, event, message, level_label = "fatal"),
            LogLevel::Panic => error_event!(ERROR, event, message, level_label = "panic"),
        })
    }

    /// Log `err` at warn if it is a warning, at error otherwise.
    pub fn report(&self, err: &Error, message: &str) {
        let level = if err.warning() {
            LogLevel::Warn
        } else {
            LogLevel::Error
        };
        self.log_error(level, err, message);
    }

    /// Log a condition an operator must look at (leaked transaction, held lock).
    ///
    /// Emitted at panic level with `operator_attention = true`.
    pub fn alert(&self, err: &Error, message: &str) {
        let event = ErrorEvent::from_error(err);
        self.in_scope(|| {
            error_event!(
                ERROR,
                event,
                message,
                level_label = "panic",
                operator_attention = true
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::InMemorySink;
    use groundwork_core::query_args;
    use tracing::level_filters::LevelFilter;

    fn capture(max_level: LevelFilter) -> (InMemorySink, Logger) {
        let sink = InMemorySink::new();
        let logger = Logger::new(sink.dispatch(max_level));
        (sink, logger)
    }

    #[test]
    fn respects_the_injected_dispatch_level() {
        let (sink, logger) = capture(LevelFilter::INFO);
        logger.info("kept");
        logger.debug("dropped");

        let events = sink.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0]["message"], "kept");
    }

    #[test]
    fn fatal_and_panic_are_labelled_errors() {
        let (sink, logger) = capture(LevelFilter::INFO);
        logger.fatal("f");
        logger.panic("p");

        let events = sink.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0]["level"], "ERROR");
        assert_eq!(events[0]["level_label"], "fatal");
        assert_eq!(events[1]["level_label"], "panic");
    }

    #[test]
    fn child_span_fields_travel_with_events() {
        let (sink, logger) = capture(LevelFilter::TRACE);
        let child = logger.child(|| tracing::info_span!("dao", dao_id = 9u64));
        child.info("inside");

        let events = sink.events();
        assert_eq!(events[0]["span"]["dao_id"], 9);
    }

    #[test]
    fn report_picks_level_from_severity() {
        let (sink, logger) = capture(LevelFilter::TRACE);
        logger.report(&Error::new_input("bad id"), "handler failed");
        logger.report(&Error::new("bug"), "handler failed");

        let events = sink.events();
        assert_eq!(events[0]["level"], "WARN");
        assert_eq!(events[0]["origin"], "input");
        assert_eq!(events[1]["level"], "ERROR");
        assert_eq!(events[1]["origin"], "application");
    }

    #[test]
    fn query_errors_log_statement_and_args() {
        let (sink, logger) = capture(LevelFilter::TRACE);
        let err = Error::wrap_query("syntax error", "Error running Exec", "SELEC 1", query_args![5]);
        logger.log_error(LogLevel::Error, &err, "query failed");

        let event = &sink.events()[0];
        assert_eq!(event["query"], "SELEC 1");
        assert_eq!(event["query_args"], "[5]");
        assert_eq!(event["inner_error"], "syntax error");
        assert_eq!(event["origin"], "third-party");
        assert!(event["error_stack"].as_str().is_some_and(|s| s.starts_with('[')));
    }

    #[test]
    fn alert_marks_operator_attention() {
        let (sink, logger) = capture(LevelFilter::INFO);
        logger.alert(&Error::wrap_db("conn lost", "failed to rollback"), "rollback failed");

        let event = &sink.events()[0];
        assert_eq!(event["operator_attention"], true);
        assert_eq!(event["level_label"], "panic");
    }

    #[test]
    fn function_boundaries_log_called_and_returned() {
        let (sink, logger) = capture(LevelFilter::INFO);
        let scoped = logger.function(Layer::Repo, "load_user");
        scoped.returned(Layer::Repo);

        let events = sink.events();
        assert_eq!(events[0]["message"], "Repo called");
        assert_eq!(events[0]["span"]["function"], "load_user");
        assert_eq!(events[1]["message"], "Repo returned");
    }

    #[test]
    fn disabled_logger_is_silent() {
        let logger = Logger::disabled();
        logger.panic("nothing happens");
        logger.report(&Error::new("x"), "still nothing");
    }
}
