//! Structured error messages for the CLI.
//!
//! Follows RFC 9457 (Problem Details) style for machine-readable errors
//! with human-friendly formatting.

use super::exit::ExitCode;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Structured error following RFC 9457 (Problem Details) style.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CliError {
    /// Error type identifier (machine-readable).
    #[serde(rename = "type")]
    pub error_type: String,

    /// Short human-readable title.
    pub title: String,

    /// Detailed explanation.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub detail: String,

    /// Suggested action for recovery.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,

    /// Additional context (varies by error type).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub context: BTreeMap<String, serde_json::Value>,

    /// Exit code for this error.
    pub exit_code: i32,
}

impl CliError {
    /// Create a new CLI error.
    #[must_use]
    pub fn new(error_type: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            error_type: error_type.into(),
            title: title.into(),
            detail: String::new(),
            suggestion: None,
            context: BTreeMap::new(),
            exit_code: ExitCode::RUNTIME_ERROR,
        }
    }

    /// Add detailed explanation.
    #[must_use]
    pub fn detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = detail.into();
        self
    }

    /// Add a suggested recovery action.
    #[must_use]
    pub fn suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Add context field.
    #[must_use]
    pub fn context(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        if let Ok(v) = serde_json::to_value(value) {
            self.context.insert(key.into(), v);
        }
        self
    }

    /// Set exit code.
    #[must_use]
    pub const fn exit_code(mut self, code: i32) -> Self {
        self.exit_code = code;
        self
    }

    /// Format for human output.
    ///
    /// When `color` is true, includes ANSI escape codes for terminal coloring.
    #[must_use]
    pub fn human_format(&self, color: bool) -> String {
        let mut out = String::new();

        if color {
            out.push_str("\x1b[1;31m");
        }
        out.push_str("Error: ");
        out.push_str(&self.title);
        if color {
            out.push_str("\x1b[0m");
        }
        out.push('\n');

        if !self.detail.is_empty() {
            out.push_str(&self.detail);
            out.push('\n');
        }

        if let Some(ref suggestion) = self.suggestion {
            out.push('\n');
            if color {
                out.push_str("\x1b[33m");
            }
            out.push_str("Suggestion: ");
            out.push_str(suggestion);
            if color {
                out.push_str("\x1b[0m");
            }
            out.push('\n');
        }

        if !self.context.is_empty() {
            out.push('\n');
            if color {
                out.push_str("\x1b[2m");
            }
            out.push_str("Context:\n");
            for (k, v) in &self.context {
                out.push_str(&format!("  {k}: {v}\n"));
            }
            if color {
                out.push_str("\x1b[0m");
            }
        }

        out
    }

    /// Format as JSON.
    #[must_use]
    pub fn json_format(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| self.title.clone())
    }
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.error_type, self.title)
    }
}

impl std::error::Error for CliError {}

/// Standard error constructors.
pub mod errors {
    use super::*;
    use crate::config::ConfigError;
    use crate::host::{RunReport, SuiteExpectation};

    /// Invalid argument error.
    #[must_use]
    pub fn invalid_argument(arg: &str, reason: &str) -> CliError {
        CliError::new("invalid_argument", format!("Invalid argument: {arg}"))
            .detail(reason)
            .exit_code(ExitCode::USER_ERROR)
    }

    /// Unknown suite name.
    #[must_use]
    pub fn unknown_suite(name: &str, known: &[&str]) -> CliError {
        CliError::new("unknown_suite", format!("Unknown suite: {name}"))
            .detail(format!("Available suites: {}", known.join(", ")))
            .suggestion("Run `must-assert list` to see the built-in suites")
            .context("suite", name)
            .exit_code(ExitCode::USER_ERROR)
    }

    /// Invalid `MUST_ASSERT_*` configuration.
    #[must_use]
    pub fn invalid_config(err: &ConfigError) -> CliError {
        CliError::new("invalid_config", "Invalid configuration")
            .detail(err.to_string())
            .suggestion("Fix or unset the offending MUST_ASSERT_* environment variable")
            .exit_code(ExitCode::USER_ERROR)
    }

    /// The suite did not produce the expected outcome.
    #[must_use]
    pub fn expectation_failed(expectation: SuiteExpectation, report: &RunReport, reason: &str) -> CliError {
        CliError::new(
            "expectation_failed",
            format!("Suite {} did not meet expectation {expectation}", report.suite),
        )
        .detail(reason)
        .context("passed", report.num_passed_tests)
        .context("failed", report.num_failed_tests)
        .context("executed", report.num_executed_tests())
        .exit_code(ExitCode::TEST_FAILURE)
    }

    /// Output could not be written.
    #[must_use]
    pub fn io_error(err: &std::io::Error) -> CliError {
        CliError::new("io_error", "I/O error")
            .detail(err.to_string())
            .exit_code(ExitCode::RUNTIME_ERROR)
    }
}
