//! Logging surface for zone diagnostics.
//!
//! Late-task violations and other exposed errors are reported through a
//! [`Logger`], not through the test that happens to be running. Two loggers
//! ship with the crate:
//!
//! - [`TracingLogger`]: forwards to `tracing` (the default)
//! - [`MemoryLogger`]: records entries in memory for inspection by harnesses
//!   and tests

pub mod level;
pub mod logger;

pub use level::LogLevel;
pub use logger::{LogEntry, Logger, MemoryLogger, TracingLogger};
