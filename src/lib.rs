//! must-assert: every test must assert, and a finished test's async work
//! cannot run late.
//!
//! # Overview
//!
//! Each wrapped test invocation gets its own zone on a deterministic,
//! single-threaded event loop with virtual time. Tasks (timers, microtasks,
//! spawned futures) remember the zone they were scheduled in. Once the test
//! settles its zone is finished, and any task of that zone that tries to run
//! afterwards is intercepted instead of silently asserting into the next
//! test. Tests that never assert fail with `expect.hasAssertions()`
//! semantics; unhandled rejections raised during a test fail that test.
//!
//! # Module Structure
//!
//! - [`types`]: identifiers and virtual time
//! - [`record`]: zone and task records
//! - [`trace`]: bounded causal traces for diagnostics
//! - [`zone`]: the zone registry, per-zone behavior and the task interceptor
//! - [`runtime`]: the event loop, promises, timers, the rejection channel
//! - [`cx`]: the capability context test bodies receive
//! - [`expect`]: the assertion API and its assertion counters
//! - [`wrapper`]: the test wrapper for sync, async and callback tests
//! - [`enhancer`]: wraps a host's declaration functions
//! - [`plugin`]: [`MustAssert`], the entry point
//! - [`host`]: a minimal host harness: suites, the runner and reports
//! - [`suites`]: built-in end-to-end suites
//! - [`observability`]: the logger seam
//! - [`config`]: plugin configuration and environment overrides
//! - [`error`]: error types
//!
//! # Example
//!
//! ```
//! use must_assert::host::{Runner, RunnerConfig, Suite, TestStatus};
//! use must_assert::{MustAssert, TestFn};
//!
//! let plugin = MustAssert::default();
//! let mut api = plugin.enhance(Suite::new("math"));
//! api.it("adds", TestFn::sync(|cx| cx.expect(1 + 1).to_be(2)), None);
//! api.it("forgets to assert", TestFn::sync(|_| Ok(())), None);
//!
//! let report = Runner::new(RunnerConfig::new()).run(api.into_inner());
//! assert_eq!(report.test_results[0].status, TestStatus::Passed);
//! assert_eq!(report.test_results[1].status, TestStatus::Failed);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::module_inception)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::cast_possible_truncation)]

#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod cx;
pub mod enhancer;
pub mod error;
pub mod expect;
pub mod host;
pub mod observability;
pub mod plugin;
pub mod record;
pub mod runtime;
pub mod suites;
pub mod test_utils;
pub mod trace;
pub mod types;
pub mod wrapper;
pub mod zone;

// Re-exports for convenient access to core types
pub use config::{ConfigError, MustAssertConfig};
pub use cx::Cx;
pub use enhancer::{Declaration, Enhanced};
pub use error::{Error, ErrorKind, Result, ResultExt};
pub use expect::{Expect, Expectation};
pub use plugin::MustAssert;
pub use runtime::{EventLoop, LoopConfig, Promise};
pub use types::{TaskId, Time, ZoneId};
pub use wrapper::{wrap_test, Done, TestFn};
pub use zone::{LateTaskPolicy, OnInvokeTask, ZoneRegistry, ZoneSpec};
