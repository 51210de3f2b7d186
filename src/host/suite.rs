//! A declared test suite.

use core::fmt;

use serde::Serialize;
use serde_json::Value;

use super::api::{format_each_name, EachBody, TestApi};
use crate::wrapper::TestFn;

/// How a declared test participates in a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TestMode {
    /// Runs unless another test is focused.
    Run,
    /// Runs; unfocused tests are skipped.
    Focus,
    /// Reported as pending.
    Skip,
    /// Reported as todo.
    Todo,
}

/// One declared test.
pub struct TestEntry {
    /// Group names and the test name joined by spaces.
    pub full_name: String,
    /// Participation mode.
    pub mode: TestMode,
    /// The body; `None` for todo tests.
    pub body: Option<TestFn>,
    /// Per-test timeout override.
    pub timeout_ms: Option<u64>,
}

impl fmt::Debug for TestEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestEntry")
            .field("full_name", &self.full_name)
            .field("mode", &self.mode)
            .field("style", &self.body.as_ref().map(TestFn::style))
            .field("timeout_ms", &self.timeout_ms)
            .finish()
    }
}

/// Tests collected through [`TestApi`], in declaration order.
#[derive(Debug, Default)]
pub struct Suite {
    name: String,
    entries: Vec<TestEntry>,
    groups: Vec<String>,
}

impl Suite {
    /// Creates an empty suite.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Returns the suite name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the declared tests.
    #[must_use]
    pub fn entries(&self) -> &[TestEntry] {
        &self.entries
    }

    /// Returns the number of declared tests.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing was declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns true if any test is focused.
    #[must_use]
    pub fn has_focus(&self) -> bool {
        self.entries.iter().any(|e| e.mode == TestMode::Focus)
    }

    /// Returns the currently open group names.
    #[must_use]
    pub fn groups(&self) -> &[String] {
        &self.groups
    }

    /// Consumes the suite, returning its tests.
    #[must_use]
    pub fn into_entries(self) -> Vec<TestEntry> {
        self.entries
    }

    fn full_name(&self, name: &str) -> String {
        if self.groups.is_empty() {
            return name.to_string();
        }
        let mut full = self.groups.join(" ");
        full.push(' ');
        full.push_str(name);
        full
    }

    fn push(&mut self, name: &str, mode: TestMode, body: Option<TestFn>, timeout_ms: Option<u64>) {
        let full_name = self.full_name(name);
        self.entries.push(TestEntry {
            full_name,
            mode,
            body,
            timeout_ms,
        });
    }
}

impl TestApi for Suite {
    fn test(&mut self, name: &str, body: TestFn, timeout_ms: Option<u64>) {
        self.push(name, TestMode::Run, Some(body), timeout_ms);
    }

    fn only(&mut self, name: &str, body: TestFn, timeout_ms: Option<u64>) {
        self.push(name, TestMode::Focus, Some(body), timeout_ms);
    }

    fn skip(&mut self, name: &str, body: TestFn, timeout_ms: Option<u64>) {
        self.push(name, TestMode::Skip, Some(body), timeout_ms);
    }

    fn todo(&mut self, name: &str) {
        self.push(name, TestMode::Todo, None, None);
    }

    fn each(&mut self, table: Vec<Vec<Value>>, name: &str, body: EachBody, timeout_ms: Option<u64>) {
        for (index, row) in table.into_iter().enumerate() {
            let title = format_each_name(name, &row, index);
            let body = EachBody::clone(&body);
            let test = TestFn::sync(move |cx| body(cx, &row));
            self.push(&title, TestMode::Run, Some(test), timeout_ms);
        }
    }

    fn describe_start(&mut self, name: &str) {
        self.groups.push(name.to_string());
    }

    fn describe_end(&mut self) {
        self.groups.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::api::each_body;
    use serde_json::json;

    #[test]
    fn names_follow_groups() {
        let mut suite = Suite::new("s");
        suite.test("top", TestFn::sync(|_| Ok(())), None);
        suite.describe_start("outer");
        suite.describe_start("inner");
        suite.skip("deep", TestFn::sync(|_| Ok(())), Some(10));
        suite.describe_end();
        suite.todo("later");
        suite.describe_end();
        let names: Vec<_> = suite.entries().iter().map(|e| e.full_name.as_str()).collect();
        assert_eq!(names, ["top", "outer inner deep", "outer later"]);
        assert_eq!(suite.entries()[1].mode, TestMode::Skip);
        assert_eq!(suite.entries()[1].timeout_ms, Some(10));
        assert!(suite.entries()[2].body.is_none());
        assert!(suite.groups().is_empty());
    }

    #[test]
    fn each_expands_rows() {
        let mut suite = Suite::new("s");
        suite.each(
            vec![vec![json!(1), json!(2)], vec![json!(3), json!(4)]],
            "adds %i and %i",
            each_body(|_, _| Ok(())),
            None,
        );
        let names: Vec<_> = suite.entries().iter().map(|e| e.full_name.clone()).collect();
        assert_eq!(names, ["adds 1 and 2", "adds 3 and 4"]);
        assert!(!suite.has_focus());
    }

    #[test]
    fn only_sets_focus() {
        let mut suite = Suite::new("s");
        suite.only("focused", TestFn::sync(|_| Ok(())), None);
        assert!(suite.has_focus());
        assert_eq!(suite.len(), 1);
    }
}
