//! Task interception.
//!
//! Before the event loop runs a task that was created inside a zone, it asks
//! that zone's [`OnInvokeTask`] hook whether the task may run. The hook sees
//! the task's originating zone and the registry's active zone:
//!
//! - `Ok(true)`: run the task
//! - `Ok(false)`: drop the task silently
//! - `Err(e)`: drop the task; the event loop tags `e` as exposed and hands it
//!   to the zone's error handler, which logs it instead of failing whichever
//!   test is running now
//!
//! The hook never schedules, defers or reorders tasks.

use core::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::error::{Error, ErrorContext, ErrorKind, Result};
use crate::observability::Logger;
use crate::record::{FinishMarker, TaskKind, TaskRecord, Zone};
use crate::types::{TaskId, Time, ZoneId};

use super::stack::StackCleaner;

/// Everything a policy needs to decide on one task invocation.
pub struct InvokeTaskContext<'a> {
    /// The zone the task was created in.
    pub origin_zone_id: ZoneId,
    /// The registry's active zone at invocation time.
    pub current_zone_id: Option<ZoneId>,
    /// Name of the test that owns the origin zone.
    pub test_name: &'a str,
    /// The task about to run.
    pub task: &'a TaskRecord,
    /// The zone's diagnostics logger.
    pub logger: &'a dyn Logger,
    /// Virtual time of the invocation.
    pub now: Time,
    zone: &'a Zone,
    cleaner: &'a StackCleaner,
}

impl<'a> InvokeTaskContext<'a> {
    pub(crate) fn new(zone: &'a Zone, task: &'a TaskRecord, now: Time) -> Self {
        let spec = zone.spec();
        Self {
            origin_zone_id: zone.id(),
            current_zone_id: spec.registry().current(),
            test_name: zone.name(),
            task,
            logger: spec.logger().as_ref(),
            now,
            zone,
            cleaner: spec.stack(),
        }
    }

    /// Returns true if the task's zone is the active zone.
    #[must_use]
    pub fn is_current(&self) -> bool {
        self.current_zone_id == Some(self.origin_zone_id)
    }

    /// Returns the completion marker of the task's test, if it has settled.
    #[must_use]
    pub fn finished(&self) -> Option<FinishMarker> {
        self.zone.finished()
    }

    /// Renders the task's async history: the task itself, its scheduling
    /// backtrace (if captured), the chain of tasks that scheduled it, and the
    /// completion marker of its test.
    ///
    /// Built on demand; policies that never call it pay nothing.
    #[must_use]
    pub fn stack_trace(&self) -> String {
        let task = self.task;
        let mut lines = vec![format!(
            "{task} scheduled at {}, invoked at {}",
            task.scheduled_at, self.now
        )];
        if let Some(bt) = task.backtrace_text() {
            lines.extend(bt.lines().map(str::to_string));
        }
        let chain = task.trace.render();
        if !chain.is_empty() {
            lines.push("----- async chain -----".to_string());
            lines.extend(chain);
        }
        if let Some(marker) = self.zone.finished() {
            lines.push(format!("----- test \"{}\" {marker} -----", self.test_name));
            if let Some(bt) = marker.backtrace {
                lines.extend(bt.lines().map(str::to_string));
            }
        }
        lines.join("\n")
    }

    /// Returns [`Self::stack_trace`] with ignored frames removed.
    #[must_use]
    pub fn cleaned_stack_trace(&self) -> String {
        self.cleaner.clean(&self.stack_trace())
    }

    /// Describes this invocation as a late-task violation.
    #[must_use]
    pub fn violation(&self) -> LateTaskViolation {
        LateTaskViolation {
            test_name: self.test_name.to_string(),
            zone_id: self.origin_zone_id,
            current_zone_id: self.current_zone_id,
            task_id: self.task.id,
            kind: self.task.kind,
            source: self.task.source,
            scheduled_at: self.task.scheduled_at,
            invoked_at: self.now,
            finished_at: self.zone.finished().map(|m| m.at),
        }
    }
}

impl fmt::Debug for InvokeTaskContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InvokeTaskContext")
            .field("origin_zone_id", &self.origin_zone_id)
            .field("current_zone_id", &self.current_zone_id)
            .field("test_name", &self.test_name)
            .field("task", &self.task.id)
            .field("now", &self.now)
            .finish_non_exhaustive()
    }
}

/// A task that tried to run after its test settled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LateTaskViolation {
    /// Test that scheduled the task.
    pub test_name: String,
    /// That test's zone.
    pub zone_id: ZoneId,
    /// The zone active when the task fired.
    pub current_zone_id: Option<ZoneId>,
    /// The offending task.
    pub task_id: TaskId,
    /// Its kind.
    pub kind: TaskKind,
    /// Its source label.
    pub source: &'static str,
    /// When it was scheduled.
    pub scheduled_at: Time,
    /// When it tried to run.
    pub invoked_at: Time,
    /// When its test settled, if known.
    pub finished_at: Option<Time>,
}

impl LateTaskViolation {
    /// Converts the violation into a [`ErrorKind::LateTask`] error.
    #[must_use]
    pub fn into_error(self, stack: String) -> Error {
        let context = ErrorContext {
            zone_id: Some(self.zone_id),
            task_id: Some(self.task_id),
            task_kind: Some(self.kind),
            test_name: Some(self.test_name.clone()),
        };
        Error::new(ErrorKind::LateTask)
            .with_message(self.to_string())
            .with_stack(stack)
            .with_context(context)
    }
}

impl fmt::Display for LateTaskViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Test \"{}\" is attempting to invoke a {}({}) after test completion. See stack-trace for details.",
            self.test_name, self.kind, self.source
        )
    }
}

/// Hook consulted before every invocation of a zoned task.
pub trait OnInvokeTask: Send + Sync {
    /// Decides whether the task may run.
    fn on_invoke_task(&self, ctx: &InvokeTaskContext<'_>) -> Result<bool>;
}

impl<F> OnInvokeTask for F
where
    F: Fn(&InvokeTaskContext<'_>) -> Result<bool> + Send + Sync,
{
    fn on_invoke_task(&self, ctx: &InvokeTaskContext<'_>) -> Result<bool> {
        self(ctx)
    }
}

/// Default policy: tasks outside their zone are rejected with a
/// [`ErrorKind::LateTask`] error carrying the task's history.
#[derive(Debug, Clone, Copy, Default)]
pub struct RejectLateTasks;

impl OnInvokeTask for RejectLateTasks {
    fn on_invoke_task(&self, ctx: &InvokeTaskContext<'_>) -> Result<bool> {
        if ctx.is_current() {
            return Ok(true);
        }
        tracing::debug!(
            target: "must_assert",
            zone = ctx.origin_zone_id.as_u64(),
            task = ctx.task.id.as_u64(),
            "rejecting late task"
        );
        Err(ctx.violation().into_error(ctx.stack_trace()))
    }
}

/// Permissive policy: tasks outside their zone are logged and dropped.
#[derive(Debug, Clone, Copy, Default)]
pub struct WarnLateTasks;

impl OnInvokeTask for WarnLateTasks {
    fn on_invoke_task(&self, ctx: &InvokeTaskContext<'_>) -> Result<bool> {
        if ctx.is_current() {
            return Ok(true);
        }
        ctx.logger
            .warn(&format!("{}\n\n{}", ctx.violation(), ctx.cleaned_stack_trace()));
        Ok(false)
    }
}

/// Named built-in policies, selectable from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LateTaskPolicy {
    /// [`RejectLateTasks`].
    #[default]
    Error,
    /// [`WarnLateTasks`].
    Warn,
}

impl LateTaskPolicy {
    /// Returns the hook implementing this policy.
    #[must_use]
    pub fn hook(self) -> Arc<dyn OnInvokeTask> {
        match self {
            Self::Error => Arc::new(RejectLateTasks),
            Self::Warn => Arc::new(WarnLateTasks),
        }
    }
}

impl FromStr for LateTaskPolicy {
    type Err = String;

    fn from_str(s: &str) -> core::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "error" | "reject" => Ok(Self::Error),
            "warn" | "drop" => Ok(Self::Warn),
            other => Err(format!("unknown late task policy: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MustAssertConfig;
    use crate::observability::MemoryLogger;
    use crate::record::ZoneStamp;
    use crate::trace::CausalTrace;
    use crate::zone::{ZoneRegistry, ZoneSpec};
    use std::rc::Rc;

    struct Fixture {
        registry: Arc<ZoneRegistry>,
        logger: Arc<MemoryLogger>,
        zone: Rc<Zone>,
        task: TaskRecord,
    }

    fn fixture() -> Fixture {
        let registry = Arc::new(ZoneRegistry::new());
        let logger = Arc::new(MemoryLogger::new());
        let spec: ZoneSpec = MustAssertConfig::default()
            .registry(registry.clone())
            .logger(logger.clone())
            .into();
        let id = registry.allocate();
        let zone = Rc::new(Zone::new(id, "adds numbers", Arc::new(spec), Time::ZERO));
        let task = TaskRecord {
            id: TaskId::new_for_test(3),
            kind: TaskKind::Timer,
            source: "setTimeout",
            origin: Some(ZoneStamp::new(&zone)),
            scheduled_at: Time::ZERO,
            backtrace: None,
            trace: CausalTrace::new(4),
        };
        Fixture {
            registry,
            logger,
            zone,
            task,
        }
    }

    #[test]
    fn same_zone_is_allowed() {
        let f = fixture();
        f.registry.activate(f.zone.id());
        let ctx = InvokeTaskContext::new(&f.zone, &f.task, Time::from_millis(1));
        assert!(ctx.is_current());
        assert!(RejectLateTasks.on_invoke_task(&ctx).expect("allowed"));
        assert!(WarnLateTasks.on_invoke_task(&ctx).expect("allowed"));
    }

    #[test]
    fn late_task_is_rejected_with_test_name() {
        let f = fixture();
        f.zone.mark_finished(FinishMarker {
            at: Time::from_millis(2),
            backtrace: None,
        });
        let ctx = InvokeTaskContext::new(&f.zone, &f.task, Time::from_millis(100));
        let err = RejectLateTasks.on_invoke_task(&ctx).expect_err("late");
        assert_eq!(err.kind(), ErrorKind::LateTask);
        assert_eq!(err.context().test_name.as_deref(), Some("adds numbers"));
        assert_eq!(err.context().task_kind, Some(TaskKind::Timer));
        assert!(err
            .message()
            .unwrap_or_default()
            .starts_with("Test \"adds numbers\" is attempting to invoke a timer(setTimeout)"));
        let stack = err.stack().unwrap_or_default();
        assert!(stack.contains("T3 timer(setTimeout) scheduled at 0ms, invoked at 100ms"));
        assert!(stack.contains("test completed at 2ms"));
    }

    #[test]
    fn warn_policy_logs_and_drops() {
        let f = fixture();
        let ctx = InvokeTaskContext::new(&f.zone, &f.task, Time::from_millis(5));
        assert!(!WarnLateTasks.on_invoke_task(&ctx).expect("no error"));
        let warnings = f.logger.warnings();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("after test completion"));
    }

    #[test]
    fn closures_are_policies() {
        let f = fixture();
        let allow_all = |_: &InvokeTaskContext<'_>| -> Result<bool> { Ok(true) };
        let ctx = InvokeTaskContext::new(&f.zone, &f.task, Time::ZERO);
        assert!(allow_all.on_invoke_task(&ctx).expect("allowed"));
    }

    #[test]
    fn another_active_zone_is_not_current() {
        let f = fixture();
        let other = f.registry.allocate();
        f.registry.activate(other);
        let ctx = InvokeTaskContext::new(&f.zone, &f.task, Time::ZERO);
        assert_eq!(ctx.current_zone_id, Some(other));
        assert!(!ctx.is_current());
        assert_eq!(ctx.violation().current_zone_id, Some(other));
    }

    #[test]
    fn policy_parsing() {
        assert_eq!("warn".parse::<LateTaskPolicy>(), Ok(LateTaskPolicy::Warn));
        assert_eq!(" ERROR ".parse::<LateTaskPolicy>(), Ok(LateTaskPolicy::Error));
        assert!("maybe".parse::<LateTaskPolicy>().is_err());
    }
}
