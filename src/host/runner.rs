//! Sequential test runner.
//!
//! Runs the tests of a [`Suite`] one at a time on a single [`EventLoop`].
//! Each test gets:
//!
//! - a fresh assertion state,
//! - the loop run until the test settles, a task raises an uncaught error,
//!   or the timeout passes in virtual time,
//! - post-test verification of its assertion-count declarations.
//!
//! Errors raised by tasks while a test is running are attributed to that
//! test. Tasks left over from earlier tests keep running on the same loop,
//! which is exactly where late-task interception applies.

use std::cell::RefCell;
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;

use super::report::{RunReport, TestResult, TestStatus};
use super::suite::{Suite, TestEntry, TestMode};
use crate::error::{Error, Result};
use crate::runtime::{EventLoop, LoopConfig, RunStatus};
use crate::types::Time;
use crate::wrapper::{Done, TestFn};

/// Runner configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunnerConfig {
    /// Configuration of the loop created per run.
    pub loop_config: LoopConfig,
    /// Verify assertion-count declarations after each test.
    pub verify_assertions: bool,
}

impl RunnerConfig {
    /// Creates the default configuration.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            loop_config: LoopConfig::new(),
            verify_assertions: true,
        }
    }

    /// Sets the default per-test timeout.
    #[must_use]
    pub const fn timeout_ms(mut self, millis: u64) -> Self {
        self.loop_config = self.loop_config.default_timeout_ms(millis);
        self
    }

    /// Sets the loop configuration.
    #[must_use]
    pub const fn loop_config(mut self, config: LoopConfig) -> Self {
        self.loop_config = config;
        self
    }

    /// Enables or disables post-test verification.
    #[must_use]
    pub const fn verify_assertions(mut self, enabled: bool) -> Self {
        self.verify_assertions = enabled;
        self
    }
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Runs suites.
#[derive(Debug, Clone, Default)]
pub struct Runner {
    config: RunnerConfig,
}

impl Runner {
    /// Creates a runner.
    #[must_use]
    pub const fn new(config: RunnerConfig) -> Self {
        Self { config }
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> RunnerConfig {
        self.config
    }

    /// Runs `suite` on a fresh event loop.
    #[must_use]
    pub fn run(&self, suite: Suite) -> RunReport {
        let event_loop = EventLoop::with_config(self.config.loop_config);
        self.run_on(&event_loop, suite)
    }

    /// Runs `suite` on `event_loop`, then drains whatever work is left.
    pub fn run_on(&self, event_loop: &EventLoop, suite: Suite) -> RunReport {
        let mut report = RunReport::new(suite.name());
        let focus = suite.has_focus();
        tracing::info!(
            target: "must_assert",
            suite = suite.name(),
            tests = suite.len(),
            focus,
            "running suite"
        );
        for entry in suite.into_entries() {
            let result = self.run_entry(event_loop, entry, focus);
            tracing::debug!(
                target: "must_assert",
                test = %result.full_name,
                status = %result.status,
                "test finished"
            );
            report.push(result);
        }
        let status = event_loop.run_until_idle();
        if status == RunStatus::StepLimit {
            tracing::warn!(target: "must_assert", "step limit reached while draining after suite");
        }
        for err in event_loop.take_uncaught() {
            tracing::warn!(target: "must_assert", error = %err, "uncaught error after last test");
        }
        tracing::info!(
            target: "must_assert",
            passed = report.num_passed_tests,
            failed = report.num_failed_tests,
            pending = report.num_pending_tests,
            todo = report.num_todo_tests,
            "suite finished"
        );
        report
    }

    fn run_entry(&self, event_loop: &EventLoop, entry: TestEntry, focus: bool) -> TestResult {
        let TestEntry {
            full_name,
            mode,
            body,
            timeout_ms,
        } = entry;
        let status = match (mode, &body) {
            (TestMode::Todo, _) | (_, None) => Some(TestStatus::Todo),
            (TestMode::Skip, _) => Some(TestStatus::Pending),
            (TestMode::Run, _) if focus => Some(TestStatus::Pending),
            _ => None,
        };
        let (Some(body), None) = (body, status) else {
            return TestResult {
                full_name,
                status: status.unwrap_or(TestStatus::Pending),
                failure_messages: Vec::new(),
                duration_ms: 0,
            };
        };

        let started = event_loop.now();
        let timeout = timeout_ms.unwrap_or(self.config.loop_config.default_timeout_ms);
        let errors = self.run_test(event_loop, &full_name, body, timeout);
        let duration_ms = event_loop.now().duration_since(started);
        let status = if errors.is_empty() {
            TestStatus::Passed
        } else {
            TestStatus::Failed
        };
        TestResult {
            full_name,
            status,
            failure_messages: errors.iter().map(render_failure).collect(),
            duration_ms,
        }
    }

    fn run_test(&self, event_loop: &EventLoop, name: &str, body: TestFn, timeout_ms: u64) -> Vec<Error> {
        event_loop.expect().reset();
        for stale in event_loop.take_uncaught() {
            tracing::warn!(target: "must_assert", error = %stale, "uncaught error between tests");
        }
        tracing::debug!(target: "must_assert", test = name, style = ?body.style(), "test started");

        let deadline = event_loop.now().saturating_add_millis(timeout_ms);
        let outcome = run_body(event_loop, body, deadline, timeout_ms);
        let abandoned = event_loop.settle_open_tests();
        if abandoned > 0 {
            tracing::debug!(target: "must_assert", test = name, abandoned, "abandoned test zones settled");
        }

        let mut errors: Vec<Error> = Vec::new();
        if let Err(err) = outcome {
            errors.push(err);
        }
        errors.extend(event_loop.take_uncaught());
        if errors.is_empty() && self.config.verify_assertions {
            if let Err(err) = event_loop.expect().verify() {
                errors.push(err);
            }
        }
        for err in &mut errors {
            let ctx = err.context_mut();
            if ctx.test_name.is_none() {
                ctx.test_name = Some(name.to_string());
            }
        }
        errors
    }
}

fn catch<T>(f: impl FnOnce() -> Result<T>) -> Result<T> {
    panic::catch_unwind(AssertUnwindSafe(f))
        .unwrap_or_else(|payload| Err(Error::panicked(payload.as_ref())))
}

fn run_body(event_loop: &EventLoop, body: TestFn, deadline: Time, timeout_ms: u64) -> Result<()> {
    let cx = event_loop.cx();
    match body {
        TestFn::Sync(f) => {
            let result = catch(|| f(&cx));
            event_loop.run_microtasks();
            result
        }
        TestFn::Async(f) => {
            let future = match panic::catch_unwind(AssertUnwindSafe(|| f(cx.clone()))) {
                Ok(future) => future,
                Err(payload) => return Err(Error::panicked(payload.as_ref())),
            };
            let promise = event_loop.spawn_root(future);
            promise.mark_handled();
            let status = event_loop.run_until(deadline, || {
                promise.is_settled() || event_loop.has_uncaught()
            });
            match promise.try_take() {
                Some(result) => result,
                None => unsettled(event_loop, status, timeout_ms),
            }
        }
        TestFn::Callback(f) => {
            let slot: Rc<RefCell<Option<Result<()>>>> = Rc::new(RefCell::new(None));
            let sink = Rc::clone(&slot);
            let done = Done::new(move |result| *sink.borrow_mut() = Some(result));
            catch(|| f(&cx, done))?;
            let status = event_loop.run_until(deadline, || {
                slot.borrow().is_some() || event_loop.has_uncaught()
            });
            let settled = slot.borrow_mut().take();
            match settled {
                Some(result) => result,
                None => unsettled(event_loop, status, timeout_ms),
            }
        }
    }
}

/// Outcome of a test whose future or `done` never settled.
fn unsettled(event_loop: &EventLoop, status: RunStatus, timeout_ms: u64) -> Result<()> {
    if event_loop.has_uncaught() {
        // The uncaught error is reported as the failure.
        return Ok(());
    }
    match status {
        RunStatus::StepLimit => Err(Error::internal("step limit reached while running test")),
        RunStatus::TimedOut | RunStatus::Settled => Err(Error::timeout(timeout_ms)),
    }
}

fn render_failure(err: &Error) -> String {
    match err.stack() {
        Some(stack) if !stack.is_empty() => format!("{err}\n{stack}"),
        _ => err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::host::TestApi;
    use std::time::Duration;

    fn runner() -> Runner {
        Runner::new(RunnerConfig::new().timeout_ms(100))
    }

    #[test]
    fn statuses_and_counts() {
        let mut suite = Suite::new("mixed");
        suite.test("passes", TestFn::sync(|cx| cx.expect(1).to_be(1)), None);
        suite.test("fails", TestFn::sync(|cx| cx.expect(1).to_be(2)), None);
        suite.skip("skipped", TestFn::sync(|_| panic!("never runs")), None);
        suite.todo("later");
        let report = runner().run(suite);
        assert_eq!(report.num_total_tests, 4);
        assert_eq!(report.num_passed_tests, 1);
        assert_eq!(report.num_failed_tests, 1);
        assert_eq!(report.num_pending_tests, 1);
        assert_eq!(report.num_todo_tests, 1);
        assert!(!report.success);
    }

    #[test]
    fn focus_skips_the_rest() {
        let mut suite = Suite::new("focus");
        suite.test("unfocused", TestFn::sync(|_| panic!("never runs")), None);
        suite.only("focused", TestFn::sync(|cx| cx.expect(true).to_be_truthy()), None);
        let report = runner().run(suite);
        assert_eq!(report.num_passed_tests, 1);
        assert_eq!(report.num_pending_tests, 1);
    }

    #[test]
    fn async_test_times_out_in_virtual_time() {
        let mut suite = Suite::new("timeout");
        suite.test(
            "slow",
            TestFn::future(|cx| async move {
                cx.sleep(Duration::from_millis(1_000)).await;
                Ok(())
            }),
            None,
        );
        let event_loop = EventLoop::new();
        let report = runner().run_on(&event_loop, suite);
        let result = &report.test_results[0];
        assert_eq!(result.status, TestStatus::Failed);
        assert!(result.failure_messages[0].contains("Exceeded timeout of 100 ms"));
        assert_eq!(result.duration_ms, 100);
    }

    fn zoned_suite(test: TestFn) -> (crate::test_utils::Fixture, Suite) {
        let fixture = crate::test_utils::Fixture::new();
        let mut api = fixture.suite("abandoned");
        api.test("hangs", test, None);
        api.test(
            "follows",
            TestFn::sync(|cx| {
                let zone = cx.current_zone().map(|z| z.name().to_string());
                cx.expect(zone).to_equal(Some("follows".to_string()))
            }),
            None,
        );
        (fixture, api.into_inner())
    }

    #[test]
    fn timed_out_async_test_releases_its_zone() {
        let (fixture, suite) = zoned_suite(TestFn::future(|cx| async move {
            cx.set_timeout(Duration::from_millis(500), |cx| cx.expect(1).to_be(1));
            cx.sleep(Duration::from_millis(1_000)).await;
            cx.expect(1).to_be(1)
        }));
        let event_loop = EventLoop::new();
        let report = runner().run_on(&event_loop, suite);
        assert_eq!(report.test_results[0].status, TestStatus::Failed);
        assert_eq!(report.test_results[1].status, TestStatus::Passed);
        assert_eq!(fixture.registry.current(), None);
        assert_eq!(event_loop.rejections().listener_count(), 0);
        assert!(event_loop.zones().iter().all(|z| z.is_finished()));
    }

    #[test]
    fn timed_out_callback_test_releases_its_zone() {
        let (fixture, suite) = zoned_suite(TestFn::callback(|cx, done| {
            cx.set_timeout(Duration::from_millis(1_000), move |_| {
                done.call();
                Ok(())
            });
            Ok(())
        }));
        let event_loop = EventLoop::new();
        let report = runner().run_on(&event_loop, suite);
        assert!(report.test_results[0].failure_messages[0].contains("Exceeded timeout"));
        assert_eq!(report.test_results[1].status, TestStatus::Passed);
        assert_eq!(fixture.registry.current(), None);
        assert_eq!(event_loop.rejections().listener_count(), 0);
    }

    #[test]
    fn uncaught_task_errors_fail_the_test() {
        let mut suite = Suite::new("uncaught");
        suite.test(
            "never calls done",
            TestFn::callback(|cx, _done| {
                cx.set_timeout(Duration::ZERO, |cx| cx.expect(true).to_be(false));
                Ok(())
            }),
            None,
        );
        let report = runner().run(suite);
        let result = &report.test_results[0];
        assert_eq!(result.status, TestStatus::Failed);
        assert_eq!(result.failure_messages.len(), 1);
        assert!(result.failure_messages[0].starts_with("AssertionFailed"));
    }

    #[test]
    fn panics_become_failures() {
        let mut suite = Suite::new("panics");
        suite.test("boom", TestFn::sync(|_| panic!("boom")), None);
        let report = runner().run(suite);
        assert!(report.test_results[0].failure_messages[0].contains("boom"));
    }

    #[test]
    fn verification_can_be_disabled() {
        let mut suite = Suite::new("lenient");
        suite.test(
            "declares but skips",
            TestFn::sync(|cx| {
                cx.has_assertions();
                Ok(())
            }),
            None,
        );
        let lenient = Runner::new(RunnerConfig::new().verify_assertions(false)).run(suite);
        assert_eq!(lenient.num_passed_tests, 1);
    }

    #[test]
    fn verification_reports_missing_assertions() {
        let mut suite = Suite::new("strict");
        suite.test(
            "declares but skips",
            TestFn::sync(|cx| {
                cx.has_assertions();
                Ok(())
            }),
            None,
        );
        let event_loop = EventLoop::new();
        let report = runner().run_on(&event_loop, suite);
        assert_eq!(report.num_failed_tests, 1);
        let kind = event_loop.expect().verify().map_err(|e| e.kind());
        assert_eq!(kind, Err(ErrorKind::MissingAssertions));
    }
}
