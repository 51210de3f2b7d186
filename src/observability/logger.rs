//! Logger trait and the built-in implementations.

use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;

use super::level::LogLevel;

/// Sink for diagnostics raised outside the running test.
///
/// Zones call [`Logger::warn`] for every exposed error, most notably late-task
/// violations. Implementations must be shareable across threads because the
/// configuration holding them may be built on one thread and used on another.
pub trait Logger: Send + Sync {
    /// Reports a warning.
    fn warn(&self, message: &str);

    /// Reports an informational message.
    fn info(&self, message: &str) {
        let _ = message;
    }

    /// Reports a debug message.
    fn debug(&self, message: &str) {
        let _ = message;
    }
}

impl<L: Logger + ?Sized> Logger for Arc<L> {
    fn warn(&self, message: &str) {
        (**self).warn(message);
    }

    fn info(&self, message: &str) {
        (**self).info(message);
    }

    fn debug(&self, message: &str) {
        (**self).debug(message);
    }
}

/// Logger that forwards to `tracing` under the `must_assert` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn warn(&self, message: &str) {
        tracing::warn!(target: "must_assert", "{message}");
    }

    fn info(&self, message: &str) {
        tracing::info!(target: "must_assert", "{message}");
    }

    fn debug(&self, message: &str) {
        tracing::debug!(target: "must_assert", "{message}");
    }
}

/// A single recorded log line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogEntry {
    /// Severity.
    pub level: LogLevel,
    /// Message text.
    pub message: String,
}

/// Logger that keeps every entry at or above a threshold in memory.
#[derive(Debug, Default)]
pub struct MemoryLogger {
    entries: Mutex<Vec<LogEntry>>,
    min_level: LogLevel,
}

impl MemoryLogger {
    /// Creates a logger that records warnings only.
    #[must_use]
    pub fn new() -> Self {
        Self::with_min_level(LogLevel::Warn)
    }

    /// Creates a logger recording entries at or above `min_level`.
    #[must_use]
    pub fn with_min_level(min_level: LogLevel) -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            min_level,
        }
    }

    /// Returns a snapshot of the recorded entries.
    #[must_use]
    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries.lock().clone()
    }

    /// Returns the recorded warning messages.
    #[must_use]
    pub fn warnings(&self) -> Vec<String> {
        self.entries
            .lock()
            .iter()
            .filter(|e| e.level == LogLevel::Warn)
            .map(|e| e.message.clone())
            .collect()
    }

    /// Removes and returns every recorded entry.
    pub fn drain(&self) -> Vec<LogEntry> {
        std::mem::take(&mut *self.entries.lock())
    }

    /// Returns the number of recorded entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Returns true if nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    fn record(&self, level: LogLevel, message: &str) {
        if !level.is_enabled_at(self.min_level) {
            return;
        }
        self.entries.lock().push(LogEntry {
            level,
            message: message.to_string(),
        });
    }
}

impl Logger for MemoryLogger {
    fn warn(&self, message: &str) {
        self.record(LogLevel::Warn, message);
    }

    fn info(&self, message: &str) {
        self.record(LogLevel::Info, message);
    }

    fn debug(&self, message: &str) {
        self.record(LogLevel::Debug, message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_logger_filters_by_level() {
        let logger = MemoryLogger::new();
        logger.debug("noise");
        logger.info("progress");
        logger.warn("late task");
        assert_eq!(logger.warnings(), vec!["late task".to_string()]);
        assert_eq!(logger.len(), 1);
    }

    #[test]
    fn drain_empties() {
        let logger = MemoryLogger::with_min_level(LogLevel::Debug);
        logger.debug("a");
        logger.warn("b");
        let drained = logger.drain();
        assert_eq!(drained.len(), 2);
        assert_eq!(drained[0].level, LogLevel::Debug);
        assert!(logger.is_empty());
    }

    #[test]
    fn arc_forwards() {
        let logger = Arc::new(MemoryLogger::new());
        let shared: Arc<dyn Logger> = logger.clone();
        shared.warn("via arc");
        assert_eq!(logger.warnings(), vec!["via arc".to_string()]);
    }
}
