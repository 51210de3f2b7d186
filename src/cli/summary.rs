//! Printable views of runs and of the suite catalog.

use serde::Serialize;

use super::output::Outputtable;
use crate::host::{RunReport, SuiteExpectation, TestStatus};
use crate::suites::SuiteInfo;

const GREEN: &str = "\x1b[32m";
const RED: &str = "\x1b[31m";
const DIM: &str = "\x1b[2m";
const RESET: &str = "\x1b[0m";

/// One suite in `must-assert list`.
#[derive(Debug, Clone, Serialize)]
pub struct SuiteEntry {
    /// Suite name.
    pub name: &'static str,
    /// Expected aggregate outcome.
    pub expectation: String,
    /// One-line description.
    pub description: &'static str,
}

impl From<&SuiteInfo> for SuiteEntry {
    fn from(info: &SuiteInfo) -> Self {
        Self {
            name: info.name,
            expectation: info.expectation.to_string(),
            description: info.description,
        }
    }
}

/// The suite catalog.
#[derive(Debug, Clone, Serialize)]
pub struct SuiteListing {
    /// Listed suites.
    pub suites: Vec<SuiteEntry>,
}

impl SuiteListing {
    /// Lists every built-in suite.
    #[must_use]
    pub fn builtin() -> Self {
        Self {
            suites: crate::suites::CATALOG.iter().map(SuiteEntry::from).collect(),
        }
    }
}

impl Outputtable for SuiteListing {
    fn human_format(&self, _color: bool) -> String {
        let width = self.suites.iter().map(|s| s.name.len()).max().unwrap_or(0);
        let mut out = String::new();
        for suite in &self.suites {
            out.push_str(&format!(
                "{:<width$}  {:<8}  {}\n",
                suite.name, suite.expectation, suite.description
            ));
        }
        out
    }
}

/// A finished run, checked against its expectation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    /// The runner's report.
    #[serde(flatten)]
    pub report: RunReport,
    /// Expectation the run was checked against.
    pub expectation: String,
    /// Whether the expectation held.
    pub expectation_met: bool,
    /// Why the expectation failed, if it did.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mismatch: Option<String>,
    /// Late-task warnings captured during the run.
    pub warnings: Vec<String>,
}

impl RunSummary {
    /// Checks `report` against `expectation`.
    #[must_use]
    pub fn new(report: RunReport, expectation: SuiteExpectation, warnings: Vec<String>) -> Self {
        let mismatch = expectation.check(&report).err().map(|e| e.to_string());
        Self {
            report,
            expectation: expectation.to_string(),
            expectation_met: mismatch.is_none(),
            mismatch,
            warnings,
        }
    }
}

fn paint(color: bool, code: &str, text: &str) -> String {
    if color {
        format!("{code}{text}{RESET}")
    } else {
        text.to_string()
    }
}

impl Outputtable for RunSummary {
    fn human_format(&self, color: bool) -> String {
        let mut out = format!("suite {}\n", self.report.suite);
        for result in &self.report.test_results {
            let mark = match result.status {
                TestStatus::Passed => paint(color, GREEN, "PASS"),
                TestStatus::Failed => paint(color, RED, "FAIL"),
                TestStatus::Pending => paint(color, DIM, "SKIP"),
                TestStatus::Todo => paint(color, DIM, "TODO"),
            };
            out.push_str(&format!(
                "  {mark} {} ({} ms)\n",
                result.full_name, result.duration_ms
            ));
            for message in &result.failure_messages {
                for line in message.lines() {
                    out.push_str(&format!("       {line}\n"));
                }
            }
        }
        if !self.warnings.is_empty() {
            out.push_str(&format!("\n{} late task warning(s)\n", self.warnings.len()));
            for warning in &self.warnings {
                out.push_str(&format!("  {}\n", paint(color, DIM, warning)));
            }
        }
        let r = &self.report;
        out.push_str(&format!(
            "\nTests: {} passed, {} failed, {} skipped, {} todo, {} total\n",
            r.num_passed_tests, r.num_failed_tests, r.num_pending_tests, r.num_todo_tests, r.num_total_tests
        ));
        let verdict = if self.expectation_met {
            paint(color, GREEN, "met")
        } else {
            paint(color, RED, "NOT met")
        };
        out.push_str(&format!("Expectation {}: {verdict}\n", self.expectation));
        if let Some(ref mismatch) = self.mismatch {
            out.push_str(mismatch);
            out.push('\n');
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::TestResult;

    fn report() -> RunReport {
        let mut report = RunReport::new("mini");
        report.push(TestResult {
            full_name: "group adds".into(),
            status: TestStatus::Passed,
            failure_messages: Vec::new(),
            duration_ms: 3,
        });
        report.push(TestResult {
            full_name: "group empty".into(),
            status: TestStatus::Failed,
            failure_messages: vec!["MissingAssertions: none".into()],
            duration_ms: 0,
        });
        report
    }

    #[test]
    fn summary_records_mismatch() {
        let summary = RunSummary::new(report(), SuiteExpectation::AllPass, Vec::new());
        assert!(!summary.expectation_met);
        let text = summary.human_format(false);
        assert!(text.contains("  PASS group adds (3 ms)\n"));
        assert!(text.contains("  FAIL group empty (0 ms)\n       MissingAssertions: none\n"));
        assert!(text.contains("Expectation all-pass: NOT met"));
        assert!(text.contains("unexpectedly failed: group empty"));
    }

    #[test]
    fn summary_json_flattens_report() {
        let summary = RunSummary::new(report(), SuiteExpectation::AllPass, vec!["late".into()]);
        let json = serde_json::to_value(&summary).expect("serializes");
        assert_eq!(json["suite"], "mini");
        assert_eq!(json["numFailedTests"], 1);
        assert_eq!(json["expectationMet"], false);
        assert_eq!(json["warnings"][0], "late");
    }

    #[test]
    fn listing_names_builtin_suites() {
        let listing = SuiteListing::builtin();
        let text = listing.human_format(false);
        assert!(text.starts_with("failing  all-fail"));
        assert!(text.contains("passing  all-pass"));
    }
}
