//! Test utilities for must-assert.
//!
//! This module provides shared helpers for unit and integration tests:
//! - Consistent tracing-based logging initialization
//! - Phase/section macros for readable test output
//! - An isolated plugin fixture (own registry, in-memory logger)
//! - Helpers for running a single test body through the runner
//!
//! # Example
//! ```
//! use must_assert::test_utils::{init_test_logging, Fixture};
//! use must_assert::wrapper::TestFn;
//!
//! init_test_logging();
//! let fixture = Fixture::new();
//! let result = fixture.run_one("adds", TestFn::sync(|cx| cx.expect(1 + 1).to_be(2)));
//! assert!(result.failure_messages.is_empty());
//! ```

use std::sync::{Arc, Once};

use tracing_subscriber::fmt::format::FmtSpan;

use crate::config::MustAssertConfig;
use crate::host::{Runner, RunnerConfig, Suite, TestApi, TestResult};
use crate::observability::MemoryLogger;
use crate::plugin::MustAssert;
use crate::runtime::EventLoop;
use crate::wrapper::TestFn;
use crate::zone::ZoneRegistry;

static INIT_LOGGING: Once = Once::new();

/// Initialize test logging with trace-level output.
///
/// Safe to call multiple times; only initializes once.
pub fn init_test_logging() {
    init_test_logging_with_level(tracing::Level::TRACE);
}

/// Initialize test logging with a custom level.
///
/// The first call wins; later calls are no-ops.
pub fn init_test_logging_with_level(level: tracing::Level) {
    INIT_LOGGING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_max_level(level)
            .with_test_writer()
            .with_file(true)
            .with_line_number(true)
            .with_target(true)
            .with_thread_ids(true)
            .with_span_events(FmtSpan::CLOSE)
            .with_ansi(false)
            .try_init();
    });
}

/// A plugin with its own registry and an in-memory logger.
///
/// Tests built on a fixture never share the active-zone pointer with other
/// tests running in parallel.
#[derive(Debug, Clone)]
pub struct Fixture {
    /// The isolated registry.
    pub registry: Arc<ZoneRegistry>,
    /// Captured diagnostics.
    pub logger: Arc<MemoryLogger>,
    /// The plugin, configured with `registry` and `logger`.
    pub plugin: MustAssert,
}

impl Fixture {
    /// Creates a fixture with the default policy.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(MustAssertConfig::default())
    }

    /// Creates a fixture from `config`, replacing its registry and logger.
    #[must_use]
    pub fn with_config(config: MustAssertConfig) -> Self {
        let registry = Arc::new(ZoneRegistry::new());
        let logger = Arc::new(MemoryLogger::new());
        let plugin = MustAssert::new(
            config
                .registry(Arc::clone(&registry))
                .logger(Arc::clone(&logger)),
        );
        Self {
            registry,
            logger,
            plugin,
        }
    }

    /// Creates an enhanced, empty suite.
    #[must_use]
    pub fn suite(&self, name: &str) -> crate::enhancer::Enhanced<Suite> {
        self.plugin.enhance(Suite::new(name))
    }

    /// Runs one wrapped test on a fresh loop and returns its result.
    #[must_use]
    pub fn run_one(&self, name: &str, body: TestFn) -> TestResult {
        let event_loop = EventLoop::new();
        self.run_one_on(&event_loop, name, body)
    }

    /// Runs one wrapped test on `event_loop` and returns its result.
    pub fn run_one_on(&self, event_loop: &EventLoop, name: &str, body: TestFn) -> TestResult {
        let mut api = self.suite(name);
        api.test(name, body, None);
        let mut report = Runner::new(RunnerConfig::new()).run_on(event_loop, api.into_inner());
        report.test_results.remove(0)
    }

    /// Returns the captured late-task warnings.
    #[must_use]
    pub fn warnings(&self) -> Vec<String> {
        self.logger.warnings()
    }
}

impl Default for Fixture {
    fn default() -> Self {
        Self::new()
    }
}

/// Log a test phase transition with a visual separator.
#[macro_export]
macro_rules! test_phase {
    ($name:expr) => {
        tracing::info!(phase = %$name, "========================================");
        tracing::info!(phase = %$name, "TEST PHASE: {}", $name);
        tracing::info!(phase = %$name, "========================================");
    };
}

/// Log a section within a test phase.
#[macro_export]
macro_rules! test_section {
    ($name:expr) => {
        tracing::debug!(section = %$name, "--- {} ---", $name);
    };
}

/// Log test completion with summary.
#[macro_export]
macro_rules! test_complete {
    ($name:expr) => {
        tracing::info!(test = %$name, "test completed successfully: {}", $name);
    };
    ($name:expr, $($key:ident = $value:expr),* $(,)?) => {
        tracing::info!(
            test = %$name,
            $($key = %$value,)*
            "test completed successfully: {}",
            $name
        );
    };
}

/// Log before assertions for context.
#[macro_export]
macro_rules! assert_with_log {
    ($cond:expr, $msg:expr, $expected:expr, $actual:expr) => {
        tracing::debug!(
            expected = ?$expected,
            actual = ?$actual,
            "Asserting: {}",
            $msg
        );
        assert!($cond, "{}: expected {:?}, got {:?}", $msg, $expected, $actual);
    };
}

/// Assert that a test result has the given status.
#[macro_export]
macro_rules! assert_status {
    ($result:expr, $status:ident) => {
        match &$result {
            r if r.status == $crate::host::TestStatus::$status => {}
            other => panic!(
                "expected {} to be {:?}, got {:?}",
                other.full_name,
                $crate::host::TestStatus::$status,
                other
            ),
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn fixture_runs_one_test() {
        init_test_logging();
        crate::test_phase!("fixture_runs_one_test");
        let fixture = Fixture::new();
        let result = fixture.run_one("empty", TestFn::sync(|_| Ok(())));
        crate::assert_status!(result, Failed);
        let result = fixture.run_one("asserts", TestFn::sync(|cx| cx.expect(1).to_be(1)));
        crate::assert_status!(result, Passed);
        crate::test_complete!("fixture_runs_one_test");
    }

    #[test]
    fn fixture_captures_warnings() {
        init_test_logging();
        let fixture = Fixture::new();
        let result = fixture.run_one(
            "late",
            TestFn::sync(|cx| {
                cx.set_timeout(Duration::from_millis(5), |cx| cx.expect(1).to_be(1));
                Ok(())
            }),
        );
        crate::assert_status!(result, Failed);
        let warnings = fixture.warnings();
        crate::assert_with_log!(warnings.len() == 1, "one warning", 1, warnings.len());
        crate::test_section!("isolation");
        assert_eq!(fixture.registry.current(), None);
    }
}
