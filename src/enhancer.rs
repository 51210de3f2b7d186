//! The API enhancer.
//!
//! Wraps a host's [`TestApi`] so the body-accepting declarations (the default
//! `test` and the focused `only`) route their bodies through the test
//! wrapper. `skip`, `each` and `todo` pass through untouched: skipped and
//! todo bodies never run, and table-driven tests are not wrapped.

use core::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::host::{EachBody, TestApi};
use crate::wrapper::{wrap_test, TestFn};
use crate::zone::ZoneSpec;

/// The declaration capabilities the enhancer knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Declaration {
    /// `test` / `it`.
    Test,
    /// `only` / `fit`.
    Only,
    /// `skip`.
    Skip,
    /// `each`.
    Each,
    /// `todo`.
    Todo,
}

impl Declaration {
    /// Every declaration, in a fixed order.
    pub const ALL: [Self; 5] = [Self::Test, Self::Only, Self::Skip, Self::Each, Self::Todo];

    /// Returns true if bodies declared this way run inside a zone.
    #[must_use]
    pub const fn routes_body(self) -> bool {
        matches!(self, Self::Test | Self::Only)
    }

    /// Returns the host-facing name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Test => "test",
            Self::Only => "only",
            Self::Skip => "skip",
            Self::Each => "each",
            Self::Todo => "todo",
        }
    }
}

impl fmt::Display for Declaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A [`TestApi`] whose `test` and `only` bodies run in zones.
pub struct Enhanced<A> {
    api: A,
    spec: Arc<ZoneSpec>,
}

impl<A: TestApi> Enhanced<A> {
    /// Enhances `api` with zones built from `spec`.
    #[must_use]
    pub fn new(api: A, spec: Arc<ZoneSpec>) -> Self {
        Self { api, spec }
    }

    /// Alias of [`TestApi::test`].
    pub fn it(&mut self, name: &str, body: TestFn, timeout_ms: Option<u64>) {
        self.test(name, body, timeout_ms);
    }

    /// Alias of [`TestApi::only`].
    pub fn fit(&mut self, name: &str, body: TestFn, timeout_ms: Option<u64>) {
        self.only(name, body, timeout_ms);
    }

    /// Declares the tests added by `declare` inside a named group.
    pub fn describe(&mut self, name: &str, declare: impl FnOnce(&mut Self)) {
        self.api.describe_start(name);
        declare(self);
        self.api.describe_end();
    }

    /// Returns the zone behavior used for wrapped bodies.
    #[must_use]
    pub fn spec(&self) -> &Arc<ZoneSpec> {
        &self.spec
    }

    /// Returns the underlying API.
    #[must_use]
    pub fn inner(&self) -> &A {
        &self.api
    }

    /// Returns the underlying API.
    pub fn into_inner(self) -> A {
        self.api
    }

    /// Wraps `body` in a zone and hands it to `declare` on the inner API.
    fn route(
        &mut self,
        declaration: Declaration,
        declare: fn(&mut A, &str, TestFn, Option<u64>),
        name: &str,
        body: TestFn,
        timeout_ms: Option<u64>,
    ) {
        tracing::trace!(
            target: "must_assert",
            declaration = declaration.as_str(),
            test = name,
            "body routed through a zone"
        );
        let body = wrap_test(&self.spec, name, body);
        declare(&mut self.api, name, body, timeout_ms);
    }
}

impl<A: TestApi> TestApi for Enhanced<A> {
    fn test(&mut self, name: &str, body: TestFn, timeout_ms: Option<u64>) {
        self.route(Declaration::Test, A::test, name, body, timeout_ms);
    }

    fn only(&mut self, name: &str, body: TestFn, timeout_ms: Option<u64>) {
        self.route(Declaration::Only, A::only, name, body, timeout_ms);
    }

    fn skip(&mut self, name: &str, body: TestFn, timeout_ms: Option<u64>) {
        self.api.skip(name, body, timeout_ms);
    }

    fn todo(&mut self, name: &str) {
        self.api.todo(name);
    }

    fn each(&mut self, table: Vec<Vec<Value>>, name: &str, body: EachBody, timeout_ms: Option<u64>) {
        self.api.each(table, name, body, timeout_ms);
    }

    fn describe_start(&mut self, name: &str) {
        self.api.describe_start(name);
    }

    fn describe_end(&mut self) {
        self.api.describe_end();
    }
}

impl<A: fmt::Debug> fmt::Debug for Enhanced<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Enhanced")
            .field("api", &self.api)
            .field("spec", &self.spec)
            .finish()
    }
}
