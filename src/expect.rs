//! A minimal assertion library with assertion-count introspection.
//!
//! Every matcher call counts as one assertion, pass or fail. A test may
//! declare how many assertions it expects ([`Expect::assertions`]) or that it
//! expects at least one ([`Expect::has_assertions`]); the host verifies the
//! declaration after the test finishes.
//!
//! The test wrapper reads the state through [`AssertionIntrospection`] and
//! may only *add* the "at least one" requirement, never change an explicit
//! declaration.

use core::fmt::{self, Debug};
use std::cell::RefCell;
use std::rc::Rc;

use serde::Serialize;

use crate::error::{Error, Result};

/// Assertion bookkeeping for the test currently running.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssertionState {
    /// Matcher calls made so far.
    pub assertion_calls: usize,
    /// Exact count declared with `assertions(n)`.
    pub expected_assertions_number: Option<usize>,
    /// Whether `has_assertions()` was declared.
    pub is_expecting_assertions: bool,
}

impl AssertionState {
    /// Returns true if the test declared any assertion-count expectation.
    #[must_use]
    pub const fn has_declaration(&self) -> bool {
        self.expected_assertions_number.is_some() || self.is_expecting_assertions
    }
}

/// Read/extend access to an assertion library's state.
pub trait AssertionIntrospection {
    /// Returns the current state, or `None` if the library cannot report it.
    fn snapshot(&self) -> Option<AssertionState>;

    /// Adds the "at least one assertion" requirement.
    fn require_assertions(&self);
}

/// Returns true if the library supports introspection and the test declared
/// no assertion-count expectation of its own.
#[must_use]
pub fn needs_assertion_check(api: &dyn AssertionIntrospection) -> bool {
    api.snapshot().is_some_and(|state| !state.has_declaration())
}

/// Shared handle to the assertion state of one event loop.
#[derive(Clone, Default)]
pub struct Expect {
    state: Rc<RefCell<AssertionState>>,
}

impl Expect {
    /// Creates a fresh assertion state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts an assertion on `actual`.
    pub fn that<T>(&self, actual: T) -> Expectation<T> {
        Expectation {
            actual,
            expect: self.clone(),
            negated: false,
        }
    }

    /// Declares the exact number of assertions the test must make.
    pub fn assertions(&self, count: usize) {
        self.state.borrow_mut().expected_assertions_number = Some(count);
    }

    /// Declares that the test must make at least one assertion.
    pub fn has_assertions(&self) {
        self.state.borrow_mut().is_expecting_assertions = true;
    }

    /// Returns a copy of the current state.
    #[must_use]
    pub fn state(&self) -> AssertionState {
        self.state.borrow().clone()
    }

    /// Clears the state before the next test.
    pub fn reset(&self) {
        *self.state.borrow_mut() = AssertionState::default();
    }

    /// Checks the declarations against the calls made.
    pub fn verify(&self) -> Result<()> {
        let state = self.state.borrow();
        if let Some(expected) = state.expected_assertions_number {
            if expected != state.assertion_calls {
                return Err(Error::assertion_count_mismatch(
                    expected,
                    state.assertion_calls,
                ));
            }
        }
        if state.is_expecting_assertions && state.assertion_calls == 0 {
            return Err(Error::missing_assertions());
        }
        Ok(())
    }

    fn record_call(&self) {
        self.state.borrow_mut().assertion_calls += 1;
    }
}

impl AssertionIntrospection for Expect {
    fn snapshot(&self) -> Option<AssertionState> {
        Some(self.state())
    }

    fn require_assertions(&self) {
        self.has_assertions();
    }
}

impl fmt::Debug for Expect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Expect").field(&*self.state.borrow()).finish()
    }
}

/// A pending assertion on one value.
#[must_use = "an expectation does nothing until a matcher is called"]
pub struct Expectation<T> {
    actual: T,
    expect: Expect,
    negated: bool,
}

impl<T> Expectation<T> {
    /// Inverts the next matcher.
    pub fn not(mut self) -> Self {
        self.negated = !self.negated;
        self
    }

    fn check(self, pass: bool, matcher: &str, detail: impl FnOnce(&T) -> String) -> Result<()> {
        self.expect.record_call();
        if pass != self.negated {
            return Ok(());
        }
        let not = if self.negated { ".not" } else { "" };
        Err(Error::assertion_failed(format!(
            "expect(received){not}.{matcher}(expected)\n\n{}",
            detail(&self.actual)
        )))
    }
}

impl<T: Debug> Expectation<T> {
    /// Passes if `actual == expected`.
    pub fn to_be<U>(self, expected: U) -> Result<()>
    where
        T: PartialEq<U>,
        U: Debug,
    {
        let pass = self.actual == expected;
        self.check(pass, "toBe", |actual| {
            format!("Expected: {expected:?}\nReceived: {actual:?}")
        })
    }

    /// Passes if `actual` equals `expected` structurally.
    ///
    /// Rust equality is always structural, so this is [`Self::to_be`] under
    /// the name test authors expect for composite values.
    pub fn to_equal<U>(self, expected: U) -> Result<()>
    where
        T: PartialEq<U>,
        U: Debug,
    {
        let pass = self.actual == expected;
        self.check(pass, "toEqual", |actual| {
            format!("Expected: {expected:?}\nReceived: {actual:?}")
        })
    }

    /// Passes if `actual > bound`.
    pub fn to_be_greater_than<U>(self, bound: U) -> Result<()>
    where
        T: PartialOrd<U>,
        U: Debug,
    {
        let pass = self.actual > bound;
        self.check(pass, "toBeGreaterThan", |actual| {
            format!("Expected: > {bound:?}\nReceived:   {actual:?}")
        })
    }

    /// Passes if `actual < bound`.
    pub fn to_be_less_than<U>(self, bound: U) -> Result<()>
    where
        T: PartialOrd<U>,
        U: Debug,
    {
        let pass = self.actual < bound;
        self.check(pass, "toBeLessThan", |actual| {
            format!("Expected: < {bound:?}\nReceived:   {actual:?}")
        })
    }
}

impl Expectation<bool> {
    /// Passes if `actual` is true.
    pub fn to_be_truthy(self) -> Result<()> {
        let pass = self.actual;
        self.check(pass, "toBeTruthy", |actual| format!("Received: {actual}"))
    }

    /// Passes if `actual` is false.
    pub fn to_be_falsy(self) -> Result<()> {
        let pass = !self.actual;
        self.check(pass, "toBeFalsy", |actual| format!("Received: {actual}"))
    }
}

impl<T: Debug> Expectation<Option<T>> {
    /// Passes if `actual` is `Some`.
    pub fn to_be_defined(self) -> Result<()> {
        let pass = self.actual.is_some();
        self.check(pass, "toBeDefined", |actual| format!("Received: {actual:?}"))
    }
}

impl<T: AsRef<str>> Expectation<T> {
    /// Passes if `actual` contains `needle`.
    pub fn to_contain(self, needle: &str) -> Result<()> {
        let pass = self.actual.as_ref().contains(needle);
        self.check(pass, "toContain", |actual| {
            format!("Expected substring: {needle:?}\nReceived string:    {:?}", actual.as_ref())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn matchers_count_pass_and_fail() {
        let expect = Expect::new();
        assert!(expect.that(1).to_be(1).is_ok());
        assert!(expect.that(1).to_be(2).is_err());
        assert!(expect.that(true).to_be_truthy().is_ok());
        assert_eq!(expect.state().assertion_calls, 3);
    }

    #[test]
    fn failure_message_names_matcher() {
        let expect = Expect::new();
        let err = expect.that(3).to_be(4).expect_err("mismatch");
        assert_eq!(err.kind(), ErrorKind::AssertionFailed);
        assert_eq!(
            err.message(),
            Some("expect(received).toBe(expected)\n\nExpected: 4\nReceived: 3")
        );
    }

    #[test]
    fn not_inverts() {
        let expect = Expect::new();
        assert!(expect.that("a").not().to_be("b").is_ok());
        let err = expect.that(5).not().to_be(5).expect_err("negated match");
        assert!(err.message().unwrap_or_default().starts_with("expect(received).not.toBe"));
    }

    #[test]
    fn ordering_matchers() {
        let expect = Expect::new();
        assert!(expect.that(10).to_be_greater_than(3).is_ok());
        assert!(expect.that(10).to_be_less_than(3).is_err());
        assert!(expect.that(String::from("hello world")).to_contain("world").is_ok());
        assert!(expect.that(Some(1)).to_be_defined().is_ok());
        assert!(expect.that(false).to_be_falsy().is_ok());
    }

    #[test]
    fn verify_has_assertions() {
        let expect = Expect::new();
        assert!(expect.verify().is_ok());
        expect.has_assertions();
        let err = expect.verify().expect_err("none made");
        assert_eq!(err.kind(), ErrorKind::MissingAssertions);
        expect.that(1).to_equal(1).expect("passes");
        assert!(expect.verify().is_ok());
    }

    #[test]
    fn verify_exact_count() {
        let expect = Expect::new();
        expect.assertions(2);
        expect.that(1).to_be(1).expect("passes");
        let err = expect.verify().expect_err("one short");
        assert_eq!(err.kind(), ErrorKind::AssertionCountMismatch);
        expect.that(2).to_be(2).expect("passes");
        assert!(expect.verify().is_ok());
    }

    #[test]
    fn reset_clears_everything() {
        let expect = Expect::new();
        expect.assertions(1);
        expect.has_assertions();
        expect.that(1).to_be(1).expect("passes");
        expect.reset();
        assert_eq!(expect.state(), AssertionState::default());
    }

    struct Opaque;

    impl AssertionIntrospection for Opaque {
        fn snapshot(&self) -> Option<AssertionState> {
            None
        }

        fn require_assertions(&self) {}
    }

    #[test]
    fn introspection_gate() {
        let expect = Expect::new();
        assert!(needs_assertion_check(&expect));
        expect.assertions(0);
        assert!(!needs_assertion_check(&expect));
        expect.reset();
        expect.require_assertions();
        assert!(!needs_assertion_check(&expect));
        assert!(!needs_assertion_check(&Opaque));
    }
}
