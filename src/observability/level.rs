//! Logging severity levels.

use core::fmt;
use std::str::FromStr;

use serde::Serialize;

/// Severity level for log entries.
///
/// Levels are ordered: Debug < Info < Warn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Debugging information.
    Debug,
    /// General informational messages.
    #[default]
    Info,
    /// Warning conditions, including late-task reports.
    Warn,
}

impl LogLevel {
    /// Returns true if this level is enabled given the threshold.
    #[must_use]
    pub const fn is_enabled_at(&self, threshold: Self) -> bool {
        (*self as u8) >= (threshold as u8)
    }

    /// Returns the lowercase name.
    #[must_use]
    pub const fn as_str_lower(&self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Debug => write!(f, "DEBUG"),
            Self::Info => write!(f, "INFO"),
            Self::Warn => write!(f, "WARN"),
        }
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warn),
            _ => Err(format!("invalid log level: {s}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering() {
        assert!(LogLevel::Debug < LogLevel::Info);
        assert!(LogLevel::Info < LogLevel::Warn);
        assert!(LogLevel::Warn.is_enabled_at(LogLevel::Info));
        assert!(!LogLevel::Debug.is_enabled_at(LogLevel::Info));
    }

    #[test]
    fn parse() {
        assert_eq!("WARN".parse::<LogLevel>(), Ok(LogLevel::Warn));
        assert_eq!("warning".parse::<LogLevel>(), Ok(LogLevel::Warn));
        assert!("loud".parse::<LogLevel>().is_err());
    }
}
