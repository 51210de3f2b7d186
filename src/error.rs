//! Error types and error handling strategy for must-assert.
//!
//! Error handling follows these principles:
//!
//! - Errors are explicit and typed (no stringly-typed errors)
//! - Errors raised by a test body are never swallowed; they fail that test
//! - Errors raised by the interception machinery are *exposed*: the zone's
//!   error handler logs them and does not let them fail whichever test happens
//!   to be running
//! - Panics inside task bodies are caught and converted to [`ErrorKind::Panicked`]
//!
//! # Error Categories
//!
//! - **Assertion**: a matcher failed, or the assertion-count contract was not met
//! - **Zone**: a task ran outside the zone that scheduled it
//! - **Async**: rejections, timeouts and panics surfaced by the event loop
//! - **Config**: invalid configuration input
//! - **Internal**: bugs and invalid states

use core::fmt;
use std::sync::Arc;

use crate::record::TaskKind;
use crate::types::{TaskId, ZoneId};

/// The kind of error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    // === Assertion ===
    /// A matcher compared two values and they did not match.
    AssertionFailed,
    /// The test required at least one assertion and made none.
    MissingAssertions,
    /// The test declared an exact assertion count that was not met.
    AssertionCountMismatch,

    // === Zone ===
    /// A task fired after the test that scheduled it had settled.
    LateTask,

    // === Async ===
    /// A promise rejected that nobody was waiting on while the test ran.
    UnhandledRejection,
    /// A promise rejected.
    Rejected,
    /// The test did not settle before its deadline.
    Timeout,
    /// A test or task body panicked.
    Panicked,

    // === Config ===
    /// Invalid configuration.
    Config,

    // === Internal / user ===
    /// Internal error (bug).
    Internal,
    /// User-provided error.
    User,
}

impl ErrorKind {
    /// Returns the error category for this kind.
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::AssertionFailed | Self::MissingAssertions | Self::AssertionCountMismatch => {
                ErrorCategory::Assertion
            }
            Self::LateTask => ErrorCategory::Zone,
            Self::UnhandledRejection | Self::Rejected | Self::Timeout | Self::Panicked => {
                ErrorCategory::Async
            }
            Self::Config => ErrorCategory::Config,
            Self::Internal => ErrorCategory::Internal,
            Self::User => ErrorCategory::User,
        }
    }
}

/// High-level error category for grouping related errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Assertion library failures.
    Assertion,
    /// Zone isolation violations.
    Zone,
    /// Event-loop level failures.
    Async,
    /// Configuration failures.
    Config,
    /// Internal errors.
    Internal,
    /// User-originated errors.
    User,
}

/// Diagnostic context for an error.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorContext {
    /// The zone the error is attributed to.
    pub zone_id: Option<ZoneId>,
    /// The task that raised the error.
    pub task_id: Option<TaskId>,
    /// The kind of that task.
    pub task_kind: Option<TaskKind>,
    /// Name of the test owning the zone.
    pub test_name: Option<String>,
}

/// The main error type for must-assert operations.
#[derive(Debug, Clone)]
pub struct Error {
    kind: ErrorKind,
    message: Option<String>,
    stack: Option<String>,
    exposed: bool,
    source: Option<Arc<dyn std::error::Error + Send + Sync>>,
    context: ErrorContext,
}

impl Error {
    /// Creates a new error with the given kind.
    #[must_use]
    pub const fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            message: None,
            stack: None,
            exposed: false,
            source: None,
            context: ErrorContext {
                zone_id: None,
                task_id: None,
                task_kind: None,
                test_name: None,
            },
        }
    }

    /// Returns the error kind.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the error category.
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        self.kind.category()
    }

    /// Adds a message description to the error.
    #[must_use]
    pub fn with_message(mut self, msg: impl Into<String>) -> Self {
        self.message = Some(msg.into());
        self
    }

    /// Attaches a (cleaned) stack trace rendering.
    #[must_use]
    pub fn with_stack(mut self, stack: impl Into<String>) -> Self {
        self.stack = Some(stack.into());
        self
    }

    /// Adds structured context to the error.
    #[must_use]
    pub fn with_context(mut self, ctx: ErrorContext) -> Self {
        self.context = ctx;
        self
    }

    /// Adds a source error to the chain.
    #[must_use]
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Arc::new(source));
        self
    }

    /// Tags the error as raised by the interception machinery.
    ///
    /// Exposed errors are reported through the zone's logger instead of
    /// propagating into the test that is currently running.
    #[must_use]
    pub fn exposed(mut self) -> Self {
        self.exposed = true;
        self
    }

    /// Returns true if the error was raised by the interception machinery.
    #[must_use]
    pub const fn is_exposed(&self) -> bool {
        self.exposed
    }

    /// Returns the error message, if any.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Returns the attached stack rendering, if any.
    #[must_use]
    pub fn stack(&self) -> Option<&str> {
        self.stack.as_deref()
    }

    /// Returns the error context.
    #[must_use]
    pub fn context(&self) -> &ErrorContext {
        &self.context
    }

    /// Mutable access to the error context.
    pub fn context_mut(&mut self) -> &mut ErrorContext {
        &mut self.context
    }

    /// Returns true for errors that come from the assertion library.
    #[must_use]
    pub const fn is_assertion_error(&self) -> bool {
        matches!(self.kind.category(), ErrorCategory::Assertion)
    }

    /// Creates a failed-matcher error.
    #[must_use]
    pub fn assertion_failed(detail: impl Into<String>) -> Self {
        Self::new(ErrorKind::AssertionFailed).with_message(detail)
    }

    /// Creates the error raised when a test made no assertions.
    #[must_use]
    pub fn missing_assertions() -> Self {
        Self::new(ErrorKind::MissingAssertions)
            .with_message("expect.hasAssertions(): Expected at least one assertion to be called but received none.")
    }

    /// Creates the error raised when an exact assertion count was not met.
    #[must_use]
    pub fn assertion_count_mismatch(expected: usize, received: usize) -> Self {
        let noun = |n: usize| if n == 1 { "assertion" } else { "assertions" };
        let call = if received == 1 { "call" } else { "calls" };
        Self::new(ErrorKind::AssertionCountMismatch).with_message(format!(
            "expect.assertions({expected}): Expected {expected} {} to be called but received {received} assertion {call}.",
            noun(expected)
        ))
    }

    /// Creates a rejection error.
    #[must_use]
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self::new(ErrorKind::Rejected).with_message(reason)
    }

    /// Wraps a rejection captured on the unhandled-rejection channel.
    #[must_use]
    pub fn unhandled_rejection(cause: &Self) -> Self {
        let mut err = Self::new(ErrorKind::UnhandledRejection)
            .with_message(format!("unhandled promise rejection during test: {cause}"))
            .with_context(cause.context.clone());
        err.stack.clone_from(&cause.stack);
        err.source = Some(Arc::new(cause.clone()));
        err
    }

    /// Creates a test timeout error.
    #[must_use]
    pub fn timeout(timeout_ms: u64) -> Self {
        Self::new(ErrorKind::Timeout)
            .with_message(format!("Exceeded timeout of {timeout_ms} ms for a test."))
    }

    /// Creates an error from a caught panic payload.
    #[must_use]
    pub fn panicked(payload: &(dyn std::any::Any + Send)) -> Self {
        let detail = payload
            .downcast_ref::<&str>()
            .map(|s| (*s).to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-string panic payload".to_string());
        Self::new(ErrorKind::Panicked).with_message(detail)
    }

    /// Creates a configuration error.
    #[must_use]
    pub fn config(detail: impl Into<String>) -> Self {
        Self::new(ErrorKind::Config).with_message(detail)
    }

    /// Creates a user error.
    #[must_use]
    pub fn user(detail: impl Into<String>) -> Self {
        Self::new(ErrorKind::User).with_message(detail)
    }

    /// Creates an internal error (bug).
    #[must_use]
    pub fn internal(detail: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal).with_message(detail)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.kind)?;
        if let Some(msg) = &self.message {
            write!(f, ": {msg}")?;
        }
        Ok(())
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_ref().map(|e| e.as_ref() as _)
    }
}

/// Extension trait for adding context to Results.
#[allow(clippy::result_large_err)]
pub trait ResultExt<T> {
    /// Attach a context message on error.
    fn context(self, msg: impl Into<String>) -> Result<T>;
    /// Attach context message computed lazily on error.
    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T>;
}

impl<T, E: Into<Error>> ResultExt<T> for core::result::Result<T, E> {
    fn context(self, msg: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.into().with_message(msg))
    }

    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T> {
        self.map_err(|e| e.into().with_message(f()))
    }
}

/// A specialized Result type for must-assert operations.
#[allow(clippy::result_large_err)]
pub type Result<T> = core::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[derive(Debug)]
    struct Underlying;

    impl fmt::Display for Underlying {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "underlying")
        }
    }

    impl std::error::Error for Underlying {}

    #[test]
    fn display_without_message() {
        let err = Error::new(ErrorKind::Internal);
        assert_eq!(err.to_string(), "Internal");
    }

    #[test]
    fn display_with_message() {
        let err = Error::user("boom");
        assert_eq!(err.to_string(), "User: boom");
    }

    #[test]
    fn source_chain_is_exposed() {
        let err = Error::user("outer").with_source(Underlying);
        let source = err.source().expect("source missing");
        assert_eq!(source.to_string(), "underlying");
    }

    #[test]
    fn missing_assertions_message_matches_jest() {
        let err = Error::missing_assertions();
        assert_eq!(err.kind(), ErrorKind::MissingAssertions);
        assert!(err
            .to_string()
            .contains("Expected at least one assertion to be called but received none."));
    }

    #[test]
    fn count_mismatch_pluralizes() {
        let err = Error::assertion_count_mismatch(1, 2);
        assert!(err
            .to_string()
            .contains("Expected 1 assertion to be called but received 2 assertion calls."));
        let err = Error::assertion_count_mismatch(3, 1);
        assert!(err
            .to_string()
            .contains("Expected 3 assertions to be called but received 1 assertion call."));
    }

    #[test]
    fn exposure_tag_is_sticky_across_clone() {
        let err = Error::new(ErrorKind::LateTask).exposed();
        assert!(err.is_exposed());
        assert!(err.clone().is_exposed());
        assert!(!Error::user("x").is_exposed());
    }

    #[test]
    fn unhandled_rejection_keeps_cause() {
        let cause = Error::rejected("oops").with_stack("at somewhere");
        let err = Error::unhandled_rejection(&cause);
        assert_eq!(err.kind(), ErrorKind::UnhandledRejection);
        assert_eq!(err.stack(), Some("at somewhere"));
        assert!(err.to_string().contains("oops"));
        assert!(err.source().is_some());
    }

    #[test]
    fn panicked_extracts_payload() {
        let payload: Box<dyn std::any::Any + Send> = Box::new("kaboom");
        let err = Error::panicked(payload.as_ref());
        assert_eq!(err.kind(), ErrorKind::Panicked);
        assert_eq!(err.message(), Some("kaboom"));
    }

    #[test]
    fn categories() {
        assert_eq!(ErrorKind::LateTask.category(), ErrorCategory::Zone);
        assert_eq!(
            ErrorKind::MissingAssertions.category(),
            ErrorCategory::Assertion
        );
        assert!(Error::assertion_failed("x").is_assertion_error());
        assert_eq!(ErrorKind::Timeout.category(), ErrorCategory::Async);
    }

    #[test]
    fn result_ext_adds_message() {
        let res: core::result::Result<(), Error> = Err(Error::new(ErrorKind::Internal));
        let err = res.context("while draining").expect_err("expected err");
        assert_eq!(err.to_string(), "Internal: while draining");
    }
}
