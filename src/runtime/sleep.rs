//! Timer-backed sleep future.

use std::cell::{Cell, RefCell};
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll, Waker};

#[derive(Default)]
pub(crate) struct SleepState {
    fired: Cell<bool>,
    waiter: RefCell<Option<Waker>>,
}

impl SleepState {
    pub(crate) fn fire(&self) {
        self.fired.set(true);
        if let Some(waker) = self.waiter.borrow_mut().take() {
            waker.wake();
        }
    }
}

/// Future returned by [`Cx::sleep`](crate::cx::Cx::sleep).
///
/// Completes when its timer fires. If the timer is denied (its test already
/// settled) the sleep never completes.
#[must_use = "futures do nothing unless awaited"]
pub struct Sleep {
    state: Rc<SleepState>,
}

impl Sleep {
    pub(crate) fn new() -> (Self, Rc<SleepState>) {
        let state = Rc::new(SleepState::default());
        (
            Self {
                state: Rc::clone(&state),
            },
            state,
        )
    }
}

impl Future for Sleep {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        if self.state.fired.get() {
            return Poll::Ready(());
        }
        *self.state.waiter.borrow_mut() = Some(cx.waker().clone());
        Poll::Pending
    }
}

impl std::fmt::Debug for Sleep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sleep")
            .field("fired", &self.state.fired.get())
            .finish()
    }
}
