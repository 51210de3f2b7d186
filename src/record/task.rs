//! Task record for the event loop.
//!
//! A task is one unit of deferred work: a timer callback, a promise
//! continuation (one poll of a spawned future), or a queued microtask. The
//! record is created when the task is scheduled and is immutable afterwards;
//! in particular its origin stamp never changes.

use core::fmt;
use std::backtrace::Backtrace;
use std::rc::Rc;

use super::zone::{Zone, ZoneStamp};
use crate::trace::{CausalTrace, TraceEntry};
use crate::types::{TaskId, Time, ZoneId};

/// The kind of deferred work a task represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskKind {
    /// A macrotask fired by the timer queue.
    Timer,
    /// A promise continuation: one poll of a spawned future.
    Promise,
    /// A callback queued on the microtask queue.
    Microtask,
}

impl TaskKind {
    /// Returns the lowercase name of the kind.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Timer => "timer",
            Self::Promise => "promise",
            Self::Microtask => "microtask",
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Internal record for a scheduled task.
#[derive(Debug)]
pub struct TaskRecord {
    /// Unique identifier within the owning event loop.
    pub id: TaskId,
    /// What kind of work this is.
    pub kind: TaskKind,
    /// The API that scheduled it (`setTimeout`, `spawn`, ...).
    pub source: &'static str,
    /// The zone that was executing when the task was created.
    ///
    /// `None` for tasks created outside any zone; those are never intercepted.
    pub origin: Option<ZoneStamp>,
    /// Virtual time at which the task was scheduled.
    pub scheduled_at: Time,
    /// Backtrace captured at scheduling time, when enabled.
    pub backtrace: Option<Backtrace>,
    /// The chain of invocations that led to this task.
    pub trace: CausalTrace,
}

impl TaskRecord {
    /// Returns the id of the originating zone, if any.
    #[must_use]
    pub fn origin_zone_id(&self) -> Option<ZoneId> {
        self.origin.as_ref().map(ZoneStamp::id)
    }

    /// Returns the originating zone if the event loop still holds it.
    #[must_use]
    pub fn origin_zone(&self) -> Option<Rc<Zone>> {
        self.origin.as_ref().and_then(ZoneStamp::upgrade)
    }

    /// Builds the trace link recorded in children of this task.
    #[must_use]
    pub fn trace_entry(&self, ran_at: Time) -> TraceEntry {
        TraceEntry {
            task_id: self.id,
            kind: self.kind,
            source: self.source,
            zone_id: self.origin_zone_id(),
            scheduled_at: self.scheduled_at,
            ran_at,
        }
    }

    /// Renders the scheduling backtrace, if one was captured.
    #[must_use]
    pub fn backtrace_text(&self) -> Option<String> {
        self.backtrace.as_ref().map(ToString::to_string)
    }
}

impl fmt::Display for TaskRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}({})", self.id, self.kind, self.source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(origin: Option<ZoneStamp>) -> TaskRecord {
        TaskRecord {
            id: TaskId::new_for_test(4),
            kind: TaskKind::Timer,
            source: "setTimeout",
            origin,
            scheduled_at: Time::from_millis(3),
            backtrace: None,
            trace: CausalTrace::new(4),
        }
    }

    #[test]
    fn root_task_has_no_origin() {
        let task = record(None);
        assert_eq!(task.origin_zone_id(), None);
        assert!(task.origin_zone().is_none());
        assert_eq!(task.to_string(), "T4 timer(setTimeout)");
    }

    #[test]
    fn stamp_outlives_zone() {
        let stamp = ZoneStamp::detached(ZoneId::new_for_test(9));
        let task = record(Some(stamp));
        assert_eq!(task.origin_zone_id(), Some(ZoneId::new_for_test(9)));
        assert!(task.origin_zone().is_none());
    }

    #[test]
    fn trace_entry_copies_identity() {
        let task = record(None);
        let entry = task.trace_entry(Time::from_millis(10));
        assert_eq!(entry.task_id, task.id);
        assert_eq!(entry.kind, TaskKind::Timer);
        assert_eq!(entry.ran_at, Time::from_millis(10));
        assert_eq!(entry.zone_id, None);
    }
}
