//! Backtrace cleaning.
//!
//! Rendered backtraces are split into frames (a numbered symbol line plus its
//! `at file:line` lines). A frame is dropped when any of its lines contains one
//! of the cleaner's patterns. Any other line is its own group.

/// Patterns elided by default: standard library, event-loop plumbing of this
/// crate, and dependency-manager frames.
pub const DEFAULT_IGNORE: &[&str] = &[
    ": std::",
    ": core::",
    ": alloc::",
    "<std::",
    "<core::",
    "<alloc::",
    "/rustc/",
    ".cargo/registry",
    "__rust_begin_short_backtrace",
    "__rust_end_short_backtrace",
    "must_assert::runtime::",
    "must_assert::zone::",
    "must_assert::wrapper::",
    "must_assert::cx::",
];

/// Removes uninteresting frames from rendered backtraces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackCleaner {
    patterns: Vec<String>,
}

impl StackCleaner {
    /// Creates a cleaner with the default patterns plus `extra`.
    #[must_use]
    pub fn new<I, S>(extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut patterns: Vec<String> = DEFAULT_IGNORE.iter().map(|p| (*p).to_string()).collect();
        patterns.extend(extra.into_iter().map(Into::into).filter(|p| !p.is_empty()));
        Self { patterns }
    }

    /// Creates a cleaner using only `patterns`.
    #[must_use]
    pub fn with_patterns<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            patterns: patterns.into_iter().map(Into::into).collect(),
        }
    }

    /// Returns the active patterns.
    #[must_use]
    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    /// Cleans a rendered backtrace.
    #[must_use]
    pub fn clean(&self, stack: &str) -> String {
        let mut kept: Vec<&str> = Vec::new();
        let mut frame: Vec<&str> = Vec::new();
        for line in stack.lines() {
            let trimmed = line.trim_start();
            if trimmed.is_empty() || trimmed == "stack backtrace:" {
                continue;
            }
            if starts_frame(trimmed) {
                self.flush(&mut frame, &mut kept);
                frame.push(trimmed);
            } else if trimmed.starts_with("at ") && !frame.is_empty() {
                frame.push(trimmed);
            } else {
                self.flush(&mut frame, &mut kept);
                frame.push(trimmed);
                self.flush(&mut frame, &mut kept);
            }
        }
        self.flush(&mut frame, &mut kept);
        kept.join("\n")
    }

    fn flush<'a>(&self, frame: &mut Vec<&'a str>, kept: &mut Vec<&'a str>) {
        if frame.is_empty() {
            return;
        }
        let ignored = frame
            .iter()
            .any(|line| self.patterns.iter().any(|p| line.contains(p.as_str())));
        if !ignored {
            kept.append(frame);
        }
        frame.clear();
    }
}

impl Default for StackCleaner {
    fn default() -> Self {
        Self::new(Vec::<String>::new())
    }
}

fn starts_frame(line: &str) -> bool {
    line.split_once(':')
        .is_some_and(|(index, _)| !index.is_empty() && index.bytes().all(|b| b.is_ascii_digit()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "stack backtrace:
   0: std::backtrace::Backtrace::force_capture
             at /rustc/abc/library/std/src/backtrace.rs:312:9
   1: must_assert::runtime::event_loop::LoopInner::schedule
             at ./src/runtime/event_loop.rs:10:5
   2: my_tests::adds_numbers::{{closure}}
             at ./tests/my_tests.rs:42:13
   3: tokio::runtime::task
             at /home/u/.cargo/registry/src/tokio/task.rs:1:1
";

    #[test]
    fn default_patterns_keep_user_frames() {
        let cleaned = StackCleaner::default().clean(SAMPLE);
        assert_eq!(
            cleaned,
            "2: my_tests::adds_numbers::{{closure}}\nat ./tests/my_tests.rs:42:13"
        );
    }

    #[test]
    fn extra_patterns_are_appended() {
        let cleaner = StackCleaner::new(["my_tests::"]);
        assert!(cleaner.patterns().iter().any(|p| p == ": std::"));
        assert_eq!(cleaner.clean(SAMPLE), "");
    }

    #[test]
    fn empty_patterns_keep_everything() {
        let cleaner = StackCleaner::with_patterns(Vec::<String>::new());
        assert_eq!(cleaner.clean(SAMPLE).lines().count(), 8);
    }

    #[test]
    fn headers_survive_dropped_frames() {
        let stack = "1: must_assert::zone::x\nat ./src/zone/x.rs:1:1\n----- async chain -----\n2: user::f";
        let cleaned = StackCleaner::default().clean(stack);
        assert_eq!(cleaned, "----- async chain -----\n2: user::f");
    }

    #[test]
    fn unnumbered_text_passes_through() {
        let cleaner = StackCleaner::default();
        assert_eq!(cleaner.clean("plain message"), "plain message");
    }
}
