//! Diagnostic output channel shared by every layer.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

/// Sink for the human-readable diagnostic lines the integration produces:
/// command lines before execution, tool stderr, and caught errors.
pub trait LogSink: Send + Sync + fmt::Debug {
    /// Append one line to the channel.
    fn append_line(&self, line: &str);
}

/// Forwards every line to `tracing` under the `clearcase` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn append_line(&self, line: &str) {
        tracing::info!(target: "clearcase", "{line}");
    }
}

/// Keeps every line in memory, in order.
///
/// Cloning shares the same buffer.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    lines: Arc<Mutex<Vec<String>>>,
}

impl MemorySink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all recorded lines.
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Whether any recorded line contains `needle`.
    #[must_use]
    pub fn contains(&self, needle: &str) -> bool {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .any(|line| line.contains(needle))
    }

    /// Remove all recorded lines.
    pub fn clear(&self) {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl LogSink for MemorySink {
    fn append_line(&self, line: &str) {
        tracing::debug!(target: "clearcase", "{line}");
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(line.to_string());
    }
}
