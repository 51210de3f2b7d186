//! Promise handles for spawned futures.
//!
//! A [`Promise`] is the handle to a future spawned on the event loop. Polling
//! it (awaiting it) marks it as *handled*. A promise that settles with an
//! error while unhandled is reported on the loop's
//! [`RejectionChannel`](super::RejectionChannel) once the current microtask
//! checkpoint has passed and it is still unhandled.
//!
//! Dropping a handle does not cancel the spawned future.

use core::fmt;
use std::cell::{Cell, RefCell};
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll, Waker};

use crate::error::{Error, Result};

pub(crate) struct PromiseState<T> {
    result: RefCell<Option<Result<T>>>,
    settled: Cell<bool>,
    waiter: RefCell<Option<Waker>>,
    handled: Rc<Cell<bool>>,
}

impl<T> PromiseState<T> {
    fn new() -> Self {
        Self {
            result: RefCell::new(None),
            settled: Cell::new(false),
            waiter: RefCell::new(None),
            handled: Rc::new(Cell::new(false)),
        }
    }

    /// Stores the outcome and wakes the waiter.
    ///
    /// Returns the error and the handled flag when the promise rejected, so the
    /// caller can schedule an unhandled-rejection check. Settling twice is a
    /// no-op.
    pub(crate) fn settle(&self, result: Result<T>) -> Option<(Error, Rc<Cell<bool>>)> {
        if self.settled.replace(true) {
            return None;
        }
        let rejection = result
            .as_ref()
            .err()
            .map(|err| (err.clone(), Rc::clone(&self.handled)));
        *self.result.borrow_mut() = Some(result);
        if let Some(waker) = self.waiter.borrow_mut().take() {
            waker.wake();
        }
        rejection
    }
}

/// Handle to the eventual result of a spawned future.
pub struct Promise<T> {
    state: Rc<PromiseState<T>>,
}

impl<T> Promise<T> {
    pub(crate) fn pending() -> (Self, Rc<PromiseState<T>>) {
        let state = Rc::new(PromiseState::new());
        (
            Self {
                state: Rc::clone(&state),
            },
            state,
        )
    }

    /// Returns true once the spawned future has finished.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        self.state.settled.get()
    }

    /// Returns true if the handle was awaited or explicitly marked handled.
    #[must_use]
    pub fn is_handled(&self) -> bool {
        self.state.handled.get()
    }

    /// Marks the promise as handled without awaiting it.
    pub fn mark_handled(&self) {
        self.state.handled.set(true);
    }

    /// Takes the result if the promise has settled. Marks it handled.
    pub fn try_take(&self) -> Option<Result<T>> {
        self.mark_handled();
        self.state.result.borrow_mut().take()
    }
}

impl<T> Future for Promise<T> {
    type Output = Result<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.state.handled.set(true);
        if let Some(result) = self.state.result.borrow_mut().take() {
            return Poll::Ready(result);
        }
        if self.state.settled.get() {
            return Poll::Ready(Err(Error::internal("promise result already taken")));
        }
        *self.state.waiter.borrow_mut() = Some(cx.waker().clone());
        Poll::Pending
    }
}

impl<T> fmt::Debug for Promise<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Promise")
            .field("settled", &self.is_settled())
            .field("handled", &self.is_handled())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::task::Wake;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingWaker(AtomicUsize);

    impl Wake for CountingWaker {
        fn wake(self: Arc<Self>) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn settle_wakes_waiter() {
        let (mut promise, state) = Promise::<u32>::pending();
        let counter = Arc::new(CountingWaker(AtomicUsize::new(0)));
        let waker = Waker::from(Arc::clone(&counter));
        let mut cx = Context::from_waker(&waker);
        assert!(Pin::new(&mut promise).poll(&mut cx).is_pending());
        assert!(promise.is_handled());
        assert!(state.settle(Ok(7)).is_none());
        assert_eq!(counter.0.load(Ordering::SeqCst), 1);
        match Pin::new(&mut promise).poll(&mut cx) {
            Poll::Ready(Ok(v)) => assert_eq!(v, 7),
            other => panic!("unexpected poll result: {other:?}"),
        }
    }

    #[test]
    fn rejection_reports_handled_flag() {
        let (promise, state) = Promise::<()>::pending();
        let (err, handled) = state.settle(Err(Error::rejected("no"))).expect("rejected");
        assert_eq!(err.message(), Some("no"));
        assert!(!handled.get());
        promise.mark_handled();
        assert!(handled.get());
    }

    #[test]
    fn second_settle_is_ignored() {
        let (promise, state) = Promise::<u8>::pending();
        assert!(state.settle(Ok(1)).is_none());
        assert!(state.settle(Err(Error::rejected("late"))).is_none());
        assert!(matches!(promise.try_take(), Some(Ok(1))));
        assert!(promise.try_take().is_none());
    }
}
