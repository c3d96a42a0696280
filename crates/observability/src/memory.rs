//! In-memory JSON log sink.
//!
//! Intended for tests/dev: build a [`Logger`](crate::Logger) over
//! [`InMemorySink::dispatch`] and read back what was emitted.

use std::io;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::Dispatch;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::fmt::MakeWriter;

/// Shared buffer receiving one JSON object per event.
#[derive(Debug, Clone, Default)]
pub struct InMemorySink {
    buf: Arc<Mutex<Vec<u8>>>,
}

impl InMemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A dispatcher writing flattened JSON events at `max_level` and above.
    pub fn dispatch(&self, max_level: LevelFilter) -> Dispatch {
        let subscriber = tracing_subscriber::fmt()
            .json()
            .flatten_event(true)
            .with_current_span(true)
            .with_span_list(true)
            .with_max_level(max_level)
            .with_writer(self.clone())
            .finish();
        Dispatch::new(subscriber)
    }

    /// Everything written so far.
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.lock()).into_owned()
    }

    /// Written events, parsed. Lines that are not JSON are skipped.
    pub fn events(&self) -> Vec<serde_json::Value> {
        self.contents()
            .lines()
            .filter_map(|line| serde_json::from_str(line).ok())
            .collect()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> MutexGuard<'_, Vec<u8>> {
        self.buf.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Writer handed out per event by [`InMemorySink`].
#[derive(Debug)]
pub struct InMemoryWriter {
    sink: InMemorySink,
}

impl io::Write for InMemoryWriter {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.sink.lock().extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for InMemorySink {
    type Writer = InMemoryWriter;

    fn make_writer(&'a self) -> Self::Writer {
        InMemoryWriter { sink: self.clone() }
    }
}
