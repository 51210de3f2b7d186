//! The capability context.

use core::fmt;
use std::future::Future;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::expect::{Expect, Expectation};
use crate::record::Zone;
use crate::runtime::{LoopInner, Origin, Promise, Sleep};
use crate::types::{TaskId, Time};
use crate::zone::ZoneSpec;

/// Handle returned by [`Cx::set_timeout`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerHandle(TaskId);

impl TimerHandle {
    /// Returns the id of the timer task.
    #[must_use]
    pub const fn task_id(&self) -> TaskId {
        self.0
    }
}

/// Capability handle bound to one event loop.
///
/// Cheap to clone; clones share the loop.
#[derive(Clone)]
pub struct Cx {
    inner: Rc<LoopInner>,
}

impl Cx {
    pub(crate) fn new(inner: Rc<LoopInner>) -> Self {
        Self { inner }
    }

    pub(crate) fn inner(&self) -> &Rc<LoopInner> {
        &self.inner
    }

    /// Returns the current virtual time.
    #[must_use]
    pub fn now(&self) -> Time {
        self.inner.now()
    }

    /// Runs `callback` once `delay` of virtual time has passed.
    pub fn set_timeout(
        &self,
        delay: Duration,
        callback: impl FnOnce(&Cx) -> Result<()> + 'static,
    ) -> TimerHandle {
        TimerHandle(
            self.inner
                .schedule_timer(delay, "setTimeout", Box::new(callback)),
        )
    }

    /// Cancels a pending timer. Returns false if it already fired or was
    /// cancelled.
    pub fn clear_timeout(&self, handle: TimerHandle) -> bool {
        self.inner.cancel_timer(handle.0)
    }

    /// Runs `callback` at the next microtask checkpoint.
    pub fn queue_microtask(&self, callback: impl FnOnce(&Cx) -> Result<()> + 'static) -> TaskId {
        self.inner
            .schedule_microtask("queueMicrotask", Origin::Inherit, Box::new(callback))
    }

    /// Spawns a future. It starts at the next microtask checkpoint.
    ///
    /// If the future fails and nothing awaits the returned promise by the
    /// following checkpoint, the failure is emitted as an unhandled rejection.
    pub fn spawn<T, F>(&self, future: F) -> Promise<T>
    where
        T: 'static,
        F: Future<Output = Result<T>> + 'static,
    {
        self.inner.spawn("spawn", Origin::Inherit, future)
    }

    /// Returns an already-resolved promise.
    pub fn resolve<T: 'static>(&self, value: T) -> Promise<T> {
        self.inner.settled(Ok(value))
    }

    /// Returns an already-rejected promise.
    pub fn reject<T: 'static>(&self, err: Error) -> Promise<T> {
        self.inner.settled(Err(err))
    }

    /// Returns a future that completes after `delay` of virtual time.
    pub fn sleep(&self, delay: Duration) -> Sleep {
        let (sleep, state) = Sleep::new();
        self.inner.schedule_timer(
            delay,
            "sleep",
            Box::new(move |_| {
                state.fire();
                Ok(())
            }),
        );
        sleep
    }

    /// Starts an assertion on `actual`.
    pub fn expect<T>(&self, actual: T) -> Expectation<T> {
        self.inner.expect().that(actual)
    }

    /// Declares that exactly `count` assertions must run in this test.
    pub fn assertions(&self, count: usize) {
        self.inner.expect().assertions(count);
    }

    /// Declares that at least one assertion must run in this test.
    pub fn has_assertions(&self) {
        self.inner.expect().has_assertions();
    }

    /// Returns the assertion library handle.
    #[must_use]
    pub fn expect_api(&self) -> &Expect {
        self.inner.expect()
    }

    /// Returns the zone currently executing, if any.
    #[must_use]
    pub fn current_zone(&self) -> Option<Rc<Zone>> {
        self.inner.executing_zone()
    }

    pub(crate) fn fork_zone(&self, name: &str, spec: &Arc<ZoneSpec>) -> Rc<Zone> {
        self.inner.fork_zone(name, spec)
    }

    pub(crate) fn in_zone<R>(&self, zone: &Rc<Zone>, f: impl FnOnce() -> R) -> R {
        self.inner.in_zone(zone, f)
    }
}

impl fmt::Debug for Cx {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cx")
            .field("now", &self.now())
            .field("zone", &self.current_zone().map(|z| z.id()))
            .finish()
    }
}
