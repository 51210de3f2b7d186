//! Virtual-time timer queue.
//!
//! A min-heap ordered by deadline, then by insertion sequence, so timers with
//! equal deadlines fire in the order they were set. Cancellation is lazy:
//! cancelled entries stay in the heap and are skipped when popped.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashSet};

use crate::types::{TaskId, Time};

#[derive(Debug)]
struct TimerEntry {
    deadline: Time,
    seq: u64,
    task: TaskId,
}

impl Eq for TimerEntry {}

impl PartialEq for TimerEntry {
    fn eq(&self, other: &Self) -> bool {
        self.deadline == other.deadline && self.seq == other.seq
    }
}

impl Ord for TimerEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Min-heap: earliest deadline first, then lowest sequence.
        other
            .deadline
            .cmp(&self.deadline)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for TimerEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Pending timers of one event loop.
#[derive(Debug, Default)]
pub struct TimerQueue {
    heap: BinaryHeap<TimerEntry>,
    next_seq: u64,
    cancelled: HashSet<TaskId>,
}

impl TimerQueue {
    /// Creates an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedules `task` to fire at `deadline`.
    pub fn insert(&mut self, deadline: Time, task: TaskId) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(TimerEntry {
            deadline,
            seq,
            task,
        });
    }

    /// Cancels a pending timer. Returns false if it was not pending.
    pub fn cancel(&mut self, task: TaskId) -> bool {
        if self.heap.iter().any(|e| e.task == task) {
            self.cancelled.insert(task)
        } else {
            false
        }
    }

    /// Returns the earliest live deadline.
    pub fn next_deadline(&mut self) -> Option<Time> {
        self.discard_cancelled();
        self.heap.peek().map(|e| e.deadline)
    }

    /// Pops the earliest timer if it is due at `now`.
    pub fn pop_due(&mut self, now: Time) -> Option<(Time, TaskId)> {
        self.discard_cancelled();
        if self.heap.peek()?.deadline > now {
            return None;
        }
        self.heap.pop().map(|e| (e.deadline, e.task))
    }

    /// Returns the number of live timers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.heap
            .iter()
            .filter(|e| !self.cancelled.contains(&e.task))
            .count()
    }

    /// Returns true if no live timers remain.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn discard_cancelled(&mut self) {
        while let Some(top) = self.heap.peek() {
            if !self.cancelled.remove(&top.task) {
                break;
            }
            self.heap.pop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(n: u64) -> TaskId {
        TaskId::new_for_test(n)
    }

    #[test]
    fn earliest_deadline_first() {
        let mut q = TimerQueue::new();
        q.insert(Time::from_millis(100), t(1));
        q.insert(Time::from_millis(50), t(2));
        assert_eq!(q.next_deadline(), Some(Time::from_millis(50)));
        assert_eq!(q.pop_due(Time::from_millis(10)), None);
        assert_eq!(
            q.pop_due(Time::from_millis(50)),
            Some((Time::from_millis(50), t(2)))
        );
        assert_eq!(
            q.pop_due(Time::from_millis(200)),
            Some((Time::from_millis(100), t(1)))
        );
        assert!(q.is_empty());
    }

    #[test]
    fn equal_deadlines_fire_in_insertion_order() {
        let mut q = TimerQueue::new();
        for id in [5, 3, 9] {
            q.insert(Time::from_millis(10), t(id));
        }
        let order: Vec<_> = std::iter::from_fn(|| q.pop_due(Time::from_millis(10)))
            .map(|(_, id)| id.as_u64())
            .collect();
        assert_eq!(order, vec![5, 3, 9]);
    }

    #[test]
    fn cancel_skips_entry() {
        let mut q = TimerQueue::new();
        q.insert(Time::from_millis(1), t(1));
        q.insert(Time::from_millis(2), t(2));
        assert!(q.cancel(t(1)));
        assert!(!q.cancel(t(7)));
        assert_eq!(q.len(), 1);
        assert_eq!(q.next_deadline(), Some(Time::from_millis(2)));
    }
}
