//! Built-in end-to-end suites.
//!
//! Each suite is declared through an [`Enhanced`] API, so its test bodies run
//! in zones, and carries the aggregate outcome a harness should see.
//!
//! - [`failing`]: every executed test fails
//! - [`passing`]: every executed test passes

pub mod failing;
pub mod passing;

use core::fmt;

use crate::enhancer::Enhanced;
use crate::host::{Suite, SuiteExpectation};
use crate::plugin::MustAssert;

/// A built-in suite.
#[derive(Clone, Copy)]
pub struct SuiteInfo {
    /// Name used on the command line.
    pub name: &'static str,
    /// One-line description.
    pub description: &'static str,
    /// Outcome the suite is expected to produce.
    pub expectation: SuiteExpectation,
    declare: fn(&mut Enhanced<Suite>),
}

impl SuiteInfo {
    /// Declares the suite's tests through `plugin`.
    #[must_use]
    pub fn build(&self, plugin: &MustAssert) -> Suite {
        let mut api = plugin.enhance(Suite::new(self.name));
        (self.declare)(&mut api);
        api.into_inner()
    }
}

impl fmt::Debug for SuiteInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SuiteInfo")
            .field("name", &self.name)
            .field("expectation", &self.expectation)
            .finish_non_exhaustive()
    }
}

/// Every built-in suite.
pub const CATALOG: &[SuiteInfo] = &[
    SuiteInfo {
        name: failing::NAME,
        description: "tests that must fail once assertions are required",
        expectation: SuiteExpectation::AllFail,
        declare: failing::declare::<Suite>,
    },
    SuiteInfo {
        name: passing::NAME,
        description: "tests that keep passing with assertions required",
        expectation: SuiteExpectation::AllPass,
        declare: passing::declare::<Suite>,
    },
];

/// Looks up a built-in suite by name.
#[must_use]
pub fn find(name: &str) -> Option<&'static SuiteInfo> {
    CATALOG.iter().find(|s| s.name == name)
}

/// Names of the built-in suites.
pub fn names() -> impl Iterator<Item = &'static str> {
    CATALOG.iter().map(|s| s.name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MustAssertConfig;
    use crate::host::{Runner, RunnerConfig};
    use crate::observability::MemoryLogger;
    use crate::zone::ZoneRegistry;
    use std::sync::Arc;

    fn plugin(logger: &Arc<MemoryLogger>) -> MustAssert {
        MustAssert::new(
            MustAssertConfig::default()
                .registry(Arc::new(ZoneRegistry::new()))
                .logger(Arc::clone(logger)),
        )
    }

    #[test]
    fn catalog_lookup() {
        assert_eq!(names().collect::<Vec<_>>(), ["failing", "passing"]);
        assert!(find("passing").is_some());
        assert!(find("flaky").is_none());
    }

    #[test]
    fn failing_suite_fails_everything() {
        let logger = Arc::new(MemoryLogger::new());
        let info = find(failing::NAME).expect("registered");
        let report = Runner::new(RunnerConfig::new()).run(info.build(&plugin(&logger)));
        assert_eq!(report.num_total_tests, 15);
        assert_eq!(report.num_failed_tests, 15, "{report:#?}");
        info.expectation.check(&report).expect("all fail");
        assert!(!logger.warnings().is_empty());
    }

    #[test]
    fn passing_suite_passes_everything() {
        let logger = Arc::new(MemoryLogger::new());
        let info = find(passing::NAME).expect("registered");
        let report = Runner::new(RunnerConfig::new()).run(info.build(&plugin(&logger)));
        assert_eq!(report.num_passed_tests, 12, "{report:#?}");
        assert_eq!(report.num_pending_tests, 1);
        assert_eq!(report.num_todo_tests, 1);
        info.expectation.check(&report).expect("all pass");
        assert!(logger.warnings().is_empty());
    }
}
