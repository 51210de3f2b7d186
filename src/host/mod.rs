//! A minimal in-process host test framework.
//!
//! The plugin needs a host to enhance: something that declares tests, runs
//! them one at a time on an event loop and reports aggregate counts.
//!
//! - [`api`]: the [`TestApi`] declaration surface
//! - [`suite`]: [`Suite`], a [`TestApi`] that records declarations
//! - [`runner`]: [`Runner`], sequential execution with virtual-time timeouts
//! - [`report`]: [`RunReport`] and the suite-level [`SuiteExpectation`]

pub mod api;
pub mod report;
pub mod runner;
pub mod suite;

pub use api::{each_body, format_each_name, EachBody, TestApi};
pub use report::{RunReport, SuiteExpectation, TestResult, TestStatus};
pub use runner::{Runner, RunnerConfig};
pub use suite::{Suite, TestEntry, TestMode};
