//! Waker implementation with deduplication.
//!
//! Wakers must be `Send + Sync`, so woken task ids go through a mutex-guarded
//! list that the event loop drains into its microtask queue.

use std::sync::Arc;
use std::task::{Wake, Waker};

use parking_lot::Mutex;

use crate::types::TaskId;

/// Shared state for the waker system.
#[derive(Debug, Default)]
pub struct WakerState {
    woken: Mutex<Vec<TaskId>>,
}

impl WakerState {
    /// Creates a new waker state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a waker for a specific task.
    #[must_use]
    pub fn waker_for(self: &Arc<Self>, task: TaskId) -> Waker {
        Waker::from(Arc::new(TaskWaker {
            state: Arc::clone(self),
            task,
        }))
    }

    /// Drains all woken tasks in wake order.
    pub fn drain_woken(&self) -> Vec<TaskId> {
        std::mem::take(&mut *self.woken.lock())
    }

    /// Returns true if any tasks have been woken.
    #[must_use]
    pub fn has_woken(&self) -> bool {
        !self.woken.lock().is_empty()
    }

    fn wake(&self, task: TaskId) {
        let mut woken = self.woken.lock();
        if !woken.contains(&task) {
            woken.push(task);
        }
    }
}

struct TaskWaker {
    state: Arc<WakerState>,
    task: TaskId,
}

impl Wake for TaskWaker {
    fn wake(self: Arc<Self>) {
        self.state.wake(self.task);
    }

    fn wake_by_ref(self: &Arc<Self>) {
        self.state.wake(self.task);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wake_deduplicates() {
        let state = Arc::new(WakerState::new());
        let waker = state.waker_for(TaskId::new_for_test(1));
        waker.wake_by_ref();
        waker.wake_by_ref();
        state.waker_for(TaskId::new_for_test(2)).wake();
        assert!(state.has_woken());
        let woken = state.drain_woken();
        assert_eq!(
            woken,
            vec![TaskId::new_for_test(1), TaskId::new_for_test(2)]
        );
        assert!(!state.has_woken());
    }

    #[test]
    fn waker_is_send_across_threads() {
        let state = Arc::new(WakerState::new());
        let waker = state.waker_for(TaskId::new_for_test(3));
        std::thread::spawn(move || waker.wake())
            .join()
            .expect("wake thread panicked");
        assert_eq!(state.drain_woken(), vec![TaskId::new_for_test(3)]);
    }
}
