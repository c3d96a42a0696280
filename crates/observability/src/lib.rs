//! Tracing setup and the injectable [`Logger`] capability.
//!
//! Library code never looks up a process-wide logger: it receives a [`Logger`]
//! (usually inside a request scope) and logs through it. Binaries call
//! [`init`] once and hand [`Logger::current`] to the components they build.

pub mod config;
pub mod logger;
pub mod memory;
pub mod subscriber;

pub use config::ObservabilityConfig;
pub use logger::{Layer, LogLevel, Logger};
pub use memory::InMemorySink;

/// Initialize process-wide tracing from the environment.
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    subscriber::init(&ObservabilityConfig::from_env());
}
