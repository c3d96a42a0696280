//! Explicit per-request execution scope.
//!
//! A [`Scope`] carries what a request flow needs across layers: the logger to
//! emit through, the cancellation signal, and the request's correlation id.
//! It is passed by reference through call signatures; nothing is looked up
//! from ambient state.

use std::sync::Arc;

use groundwork_observability::Logger;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone)]
pub struct Scope {
    logger: Logger,
    cancellation: CancellationToken,
    request_id: Option<Arc<str>>,
}

impl Scope {
    /// A scope with its own, not-yet-cancelled token.
    pub fn new(logger: Logger) -> Self {
        Self {
            logger,
            cancellation: CancellationToken::new(),
            request_id: None,
        }
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// Attach a correlation id; the logger gains a `request` span carrying it.
    pub fn with_request_id(mut self, request_id: impl Into<Arc<str>>) -> Self {
        let request_id = request_id.into();
        self.logger = self.logger.for_request(&request_id);
        self.request_id = Some(request_id);
        self
    }

    /// Same cancellation and request id, different logger.
    pub fn with_logger(&self, logger: Logger) -> Self {
        Self {
            logger,
            cancellation: self.cancellation.clone(),
            request_id: self.request_id.clone(),
        }
    }

    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    pub fn request_id(&self) -> Option<&str> {
        self.request_id.as_deref()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// Signal cancellation to every operation running under this scope.
    pub fn cancel(&self) {
        self.cancellation.cancel();
    }
}
