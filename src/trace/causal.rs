//! Bounded causal trace of task invocations.
//!
//! A trace is an ordered sequence (oldest to newest) of the task invocations
//! that scheduled the current task. When the trace is full, the oldest entry
//! is dropped, so chains of deferred work cannot grow memory without bound.

use crate::record::TaskKind;
use crate::types::{TaskId, Time, ZoneId};
use core::fmt;
use std::collections::VecDeque;

/// Default number of entries kept per trace.
pub const DEFAULT_TRACE_LIMIT: usize = 10;

/// One invocation in a causal chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceEntry {
    /// The task that was running.
    pub task_id: TaskId,
    /// Its kind.
    pub kind: TaskKind,
    /// Its source label.
    pub source: &'static str,
    /// The zone the task belonged to, if any.
    pub zone_id: Option<ZoneId>,
    /// When the task was scheduled.
    pub scheduled_at: Time,
    /// When the task ran and scheduled the next link.
    pub ran_at: Time,
}

impl fmt::Display for TraceEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.task_id, self.kind, self.source)?;
        match self.zone_id {
            Some(zone) => write!(f, " ({zone}")?,
            None => write!(f, " (root")?,
        }
        write!(f, ", scheduled {}, ran {})", self.scheduled_at, self.ran_at)
    }
}

/// Bounded, ordered chain of [`TraceEntry`] values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CausalTrace {
    entries: VecDeque<TraceEntry>,
    limit: usize,
}

impl CausalTrace {
    /// Creates an empty trace holding at most `limit` entries.
    ///
    /// A limit of zero disables tracing.
    #[must_use]
    pub fn new(limit: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            limit,
        }
    }

    /// Returns the maximum number of entries.
    #[must_use]
    pub const fn limit(&self) -> usize {
        self.limit
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the trace is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Appends an entry, dropping the oldest one when full.
    pub fn push(&mut self, entry: TraceEntry) {
        if self.limit == 0 {
            return;
        }
        while self.entries.len() >= self.limit {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    /// Returns a copy of this trace extended by one entry, re-bounded to `limit`.
    #[must_use]
    pub fn extended(&self, entry: TraceEntry, limit: usize) -> Self {
        let mut next = Self {
            entries: self.entries.clone(),
            limit,
        };
        while next.entries.len() > limit {
            next.entries.pop_front();
        }
        next.push(entry);
        next
    }

    /// Iterates entries oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &TraceEntry> {
        self.entries.iter()
    }

    /// Renders the chain newest-first, one line per entry.
    #[must_use]
    pub fn render(&self) -> Vec<String> {
        self.entries
            .iter()
            .rev()
            .map(|entry| format!("scheduled by {entry}"))
            .collect()
    }
}

impl Default for CausalTrace {
    fn default() -> Self {
        Self::new(DEFAULT_TRACE_LIMIT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: u64) -> TraceEntry {
        TraceEntry {
            task_id: TaskId::new_for_test(id),
            kind: TaskKind::Timer,
            source: "setTimeout",
            zone_id: Some(ZoneId::new_for_test(1)),
            scheduled_at: Time::from_millis(id),
            ran_at: Time::from_millis(id + 1),
        }
    }

    #[test]
    fn push_keeps_order() {
        let mut trace = CausalTrace::new(4);
        trace.push(entry(1));
        trace.push(entry(2));
        let ids: Vec<_> = trace.iter().map(|e| e.task_id.as_u64()).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn overflow_drops_oldest() {
        let mut trace = CausalTrace::new(2);
        trace.push(entry(1));
        trace.push(entry(2));
        trace.push(entry(3));
        let ids: Vec<_> = trace.iter().map(|e| e.task_id.as_u64()).collect();
        assert_eq!(ids, vec![2, 3]);
    }

    #[test]
    fn extended_leaves_parent_untouched() {
        let mut parent = CausalTrace::new(3);
        parent.push(entry(1));
        let child = parent.extended(entry(2), 3);
        assert_eq!(parent.len(), 1);
        assert_eq!(child.len(), 2);
    }

    #[test]
    fn extended_rebounds_to_new_limit() {
        let mut parent = CausalTrace::new(5);
        for id in 1..=5 {
            parent.push(entry(id));
        }
        let child = parent.extended(entry(6), 2);
        let ids: Vec<_> = child.iter().map(|e| e.task_id.as_u64()).collect();
        assert_eq!(ids, vec![5, 6]);
    }

    #[test]
    fn zero_limit_disables() {
        let mut trace = CausalTrace::new(0);
        trace.push(entry(1));
        assert!(trace.is_empty());
    }

    #[test]
    fn render_is_newest_first() {
        let mut trace = CausalTrace::new(3);
        trace.push(entry(1));
        trace.push(entry(2));
        let lines = trace.render();
        assert!(lines[0].starts_with("scheduled by T2 timer setTimeout (Z1"));
        assert!(lines[1].starts_with("scheduled by T1"));
    }
}
