//! Aggregate results of a run, in the layout Jest's `--json` output uses.

use core::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::{Error, Result};

/// Outcome of one test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TestStatus {
    /// Ran and passed.
    Passed,
    /// Ran and failed.
    Failed,
    /// Skipped.
    Pending,
    /// Declared with `todo`.
    Todo,
}

impl TestStatus {
    /// Returns the status name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Passed => "passed",
            Self::Failed => "failed",
            Self::Pending => "pending",
            Self::Todo => "todo",
        }
    }
}

impl fmt::Display for TestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TestResult {
    /// Group names and test name.
    pub full_name: String,
    /// Outcome.
    pub status: TestStatus,
    /// Rendered failure messages, in the order they were raised.
    pub failure_messages: Vec<String>,
    /// Virtual time the test took.
    pub duration_ms: u64,
}

/// Aggregate report of one suite run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    /// Suite name.
    pub suite: String,
    /// Declared tests.
    pub num_total_tests: usize,
    /// Passed tests.
    pub num_passed_tests: usize,
    /// Failed tests.
    pub num_failed_tests: usize,
    /// Skipped tests.
    pub num_pending_tests: usize,
    /// Todo tests.
    pub num_todo_tests: usize,
    /// True when no test failed.
    pub success: bool,
    /// Per-test results in declaration order.
    pub test_results: Vec<TestResult>,
}

impl RunReport {
    /// Creates an empty report for `suite`.
    #[must_use]
    pub fn new(suite: impl Into<String>) -> Self {
        Self {
            suite: suite.into(),
            success: true,
            ..Self::default()
        }
    }

    /// Adds one result and updates the counters.
    pub fn push(&mut self, result: TestResult) {
        self.num_total_tests += 1;
        match result.status {
            TestStatus::Passed => self.num_passed_tests += 1,
            TestStatus::Failed => {
                self.num_failed_tests += 1;
                self.success = false;
            }
            TestStatus::Pending => self.num_pending_tests += 1,
            TestStatus::Todo => self.num_todo_tests += 1,
        }
        self.test_results.push(result);
    }

    /// Tests that actually ran.
    #[must_use]
    pub const fn num_executed_tests(&self) -> usize {
        self.num_total_tests - self.num_pending_tests - self.num_todo_tests
    }

    /// Results with the given status.
    pub fn with_status(&self, status: TestStatus) -> impl Iterator<Item = &TestResult> {
        self.test_results.iter().filter(move |r| r.status == status)
    }
}

/// What a harness expects of a suite's report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuiteExpectation {
    /// Every executed test passed.
    AllPass,
    /// Every executed test failed.
    AllFail,
}

impl SuiteExpectation {
    /// Checks `report` against the expectation.
    ///
    /// A report in which no test executed never satisfies an expectation.
    pub fn check(self, report: &RunReport) -> Result<()> {
        let executed = report.num_executed_tests();
        if executed == 0 {
            return Err(Error::user(format!(
                "suite {:?} executed no tests",
                report.suite
            )));
        }
        let (matching, wanted) = match self {
            Self::AllPass => (report.num_passed_tests, TestStatus::Failed),
            Self::AllFail => (report.num_failed_tests, TestStatus::Passed),
        };
        if matching == executed {
            return Ok(());
        }
        let offenders: Vec<&str> = report
            .with_status(wanted)
            .map(|r| r.full_name.as_str())
            .collect();
        Err(Error::user(format!(
            "expected {self} for suite {:?}: {matching} of {executed} executed tests matched; unexpectedly {wanted}: {}",
            report.suite,
            offenders.join(", ")
        )))
    }
}

impl fmt::Display for SuiteExpectation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::AllPass => "all-pass",
            Self::AllFail => "all-fail",
        })
    }
}

impl FromStr for SuiteExpectation {
    type Err = String;

    fn from_str(s: &str) -> core::result::Result<Self, Self::Err> {
        match s {
            "all-pass" | "pass" => Ok(Self::AllPass),
            "all-fail" | "fail" => Ok(Self::AllFail),
            other => Err(format!("unknown expectation: {other}")),
        }
    }
}
