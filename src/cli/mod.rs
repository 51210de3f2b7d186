//! CLI utilities for the `must-assert` binary.
//!
//! - **Dual-mode output**: JSON or human output based on environment
//! - **Structured errors**: RFC 9457-style errors with context and suggestions
//! - **Semantic exit codes**: machine-parseable exit codes for automation
//!
//! # Output Format Detection
//!
//! The output format is detected from:
//! 1. `MUST_ASSERT_OUTPUT_FORMAT` environment variable
//! 2. `CI` environment variable (forces JSON)
//! 3. TTY detection (JSON for pipes, human for terminals)
//!
//! Colors respect `NO_COLOR` and `CLICOLOR_FORCE`.
//!
//! # Exit Codes
//!
//! - 0: the suite met its expectation
//! - 1: user error (bad input, unknown suite, bad configuration)
//! - 2: runtime error
//! - 3: internal error (bug)
//! - 10: the suite did not meet its expectation

pub mod error;
pub mod exit;
pub mod output;
pub mod summary;

pub use error::{errors, CliError};
pub use exit::ExitCode;
pub use output::{ColorChoice, Output, OutputFormat, Outputtable};
pub use summary::{RunSummary, SuiteEntry, SuiteListing};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{Runner, RunnerConfig, SuiteExpectation};
    use crate::test_utils::{init_test_logging, Fixture};

    #[test]
    fn passing_suite_summary_exits_zero() {
        init_test_logging();
        crate::test_phase!("passing_suite_summary_exits_zero");
        let fixture = Fixture::new();
        let info = crate::suites::find("passing").expect("registered");
        let report = Runner::new(RunnerConfig::new()).run(info.build(&fixture.plugin));
        let summary = RunSummary::new(report, SuiteExpectation::AllPass, fixture.warnings());
        crate::assert_with_log!(summary.expectation_met, "expectation met", true, summary.expectation_met);
        crate::test_complete!("passing_suite_summary_exits_zero");
    }

    #[test]
    fn wrong_expectation_maps_to_test_failure() {
        init_test_logging();
        let fixture = Fixture::new();
        let info = crate::suites::find("failing").expect("registered");
        let report = Runner::new(RunnerConfig::new()).run(info.build(&fixture.plugin));
        let summary = RunSummary::new(report, SuiteExpectation::AllPass, fixture.warnings());
        assert!(!summary.expectation_met);
        let err = errors::expectation_failed(
            SuiteExpectation::AllPass,
            &summary.report,
            summary.mismatch.as_deref().unwrap_or_default(),
        );
        assert_eq!(err.exit_code, ExitCode::TEST_FAILURE);
    }
}
