//! The unhandled-rejection channel.
//!
//! A promise that rejects while nobody observes it is emitted here. With no
//! listener subscribed the rejection is logged at warn level and dropped.

use core::fmt;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::error::Error;

/// Identifies a subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Listener = Rc<dyn Fn(&Error)>;

/// Process-level (loop-level) event channel for unhandled rejections.
#[derive(Default)]
pub struct RejectionChannel {
    listeners: RefCell<Vec<(ListenerId, Listener)>>,
    next_id: Cell<u64>,
}

impl RejectionChannel {
    /// Creates a channel with no listeners.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribes a listener.
    pub fn subscribe(&self, listener: impl Fn(&Error) + 'static) -> ListenerId {
        let id = ListenerId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        self.listeners.borrow_mut().push((id, Rc::new(listener)));
        id
    }

    /// Removes a listener. Returns false if it was not subscribed.
    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.borrow_mut();
        let before = listeners.len();
        listeners.retain(|(lid, _)| *lid != id);
        listeners.len() != before
    }

    /// Returns the number of listeners.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.listeners.borrow().len()
    }

    /// Delivers a rejection. Returns true if any listener received it.
    pub fn emit(&self, err: &Error) -> bool {
        let listeners: Vec<Listener> = self
            .listeners
            .borrow()
            .iter()
            .map(|(_, l)| Rc::clone(l))
            .collect();
        if listeners.is_empty() {
            tracing::warn!(target: "must_assert", error = %err, "unhandled promise rejection");
            return false;
        }
        for listener in listeners {
            listener(err);
        }
        true
    }
}

impl fmt::Debug for RejectionChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RejectionChannel")
            .field("listeners", &self.listener_count())
            .finish()
    }
}
