//! Semantic exit codes for the must-assert CLI.
//!
//! Exit codes follow common conventions and are in the valid range (0-125).
//! Codes 126-255 are reserved by shells for special purposes.

/// Semantic exit codes.
pub struct ExitCode;

impl ExitCode {
    /// Success - the suite produced the expected outcome.
    pub const SUCCESS: i32 = 0;

    /// User error - bad arguments, unknown suite, invalid configuration.
    pub const USER_ERROR: i32 = 1;

    /// Runtime error - the run could not complete.
    pub const RUNTIME_ERROR: i32 = 2;

    /// Internal error - bug in the tool itself.
    pub const INTERNAL_ERROR: i32 = 3;

    // Application-specific codes (10-125)

    /// Test failure - the suite did not produce the expected outcome.
    pub const TEST_FAILURE: i32 = 10;

    /// Get human-readable description of an exit code.
    #[must_use]
    pub const fn description(code: i32) -> &'static str {
        match code {
            0 => "success",
            1 => "user error (invalid input/arguments)",
            2 => "runtime error",
            3 => "internal error (bug)",
            10 => "test failure",
            _ => "unknown",
        }
    }

    /// Check if an exit code indicates success (code 0).
    #[must_use]
    pub const fn is_success(code: i32) -> bool {
        code == Self::SUCCESS
    }

    /// Check if an exit code indicates any kind of failure (non-zero).
    #[must_use]
    pub const fn is_failure(code: i32) -> bool {
        code != Self::SUCCESS
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    const CODES: [i32; 5] = [
        ExitCode::SUCCESS,
        ExitCode::USER_ERROR,
        ExitCode::RUNTIME_ERROR,
        ExitCode::INTERNAL_ERROR,
        ExitCode::TEST_FAILURE,
    ];

    #[test]
    fn exit_codes_are_distinct_and_in_range() {
        let unique: HashSet<_> = CODES.iter().collect();
        assert_eq!(CODES.len(), unique.len(), "Exit codes must be unique");
        for code in CODES {
            assert!(
                (0..=125).contains(&code),
                "Exit code {code} out of valid range (0-125)"
            );
            assert_ne!(ExitCode::description(code), "unknown");
        }
    }

    #[test]
    fn unknown_code_description() {
        assert_eq!(ExitCode::description(99), "unknown");
        assert_eq!(ExitCode::description(-1), "unknown");
    }

    #[test]
    fn is_success_and_failure() {
        assert!(ExitCode::is_success(0));
        assert!(!ExitCode::is_success(10));
        assert!(!ExitCode::is_failure(0));
        assert!(ExitCode::is_failure(1));
    }
}
