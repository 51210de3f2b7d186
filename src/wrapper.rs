//! The test wrapper.
//!
//! [`wrap_test`] turns a test body into one that runs in a fresh zone. Each
//! invocation of the wrapped body:
//!
//! 1. forks a zone on the loop and activates it in the registry,
//! 2. runs the body with that zone executing, so every task it schedules is
//!    stamped with the zone,
//! 3. right after the body's synchronous portion, adds the "at least one
//!    assertion" requirement unless the test declared its own,
//! 4. deactivates the zone when the test settles (body returned, future
//!    resolved, or `done` called), after which the zone's tasks are denied.
//!
//! Promise-returning and callback tests also listen for unhandled rejections
//! while they are outstanding and turn a recorded rejection into the test's
//! failure.
//!
//! The per-invocation bookkeeping lives in an explicit [`Invocation`] record
//! shared by the completion and rejection handlers.

use core::fmt;
use std::cell::{Cell, RefCell};
use std::future::Future;
use std::pin::Pin;
use std::rc::{Rc, Weak};
use std::sync::Arc;
use std::task::{Context, Poll};

use crate::cx::Cx;
use crate::error::{Error, Result};
use crate::expect::{needs_assertion_check, AssertionIntrospection};
use crate::record::{FinishMarker, Zone};
use crate::runtime::ListenerId;
use crate::zone::ZoneSpec;

/// Boxed future returned by promise-style test bodies.
pub type TestFuture = Pin<Box<dyn Future<Output = Result<()>>>>;

/// Body of a synchronous test.
pub type SyncBody = Box<dyn FnOnce(&Cx) -> Result<()>>;
/// Body of a promise-returning test.
pub type AsyncBody = Box<dyn FnOnce(Cx) -> TestFuture>;
/// Body of a callback-style test.
pub type CallbackBody = Box<dyn FnOnce(&Cx, Done) -> Result<()>>;

/// A test body in one of the three supported styles.
pub enum TestFn {
    /// Runs to completion synchronously.
    Sync(SyncBody),
    /// Returns a future; the test settles when it resolves.
    Async(AsyncBody),
    /// Receives a [`Done`] callback; the test settles when it is called.
    Callback(CallbackBody),
}

/// The style of a [`TestFn`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestStyle {
    /// [`TestFn::Sync`].
    Sync,
    /// [`TestFn::Async`].
    Async,
    /// [`TestFn::Callback`].
    Callback,
}

impl TestFn {
    /// Creates a synchronous test body.
    pub fn sync(body: impl FnOnce(&Cx) -> Result<()> + 'static) -> Self {
        Self::Sync(Box::new(body))
    }

    /// Creates a promise-returning test body.
    pub fn future<F, Fut>(body: F) -> Self
    where
        F: FnOnce(Cx) -> Fut + 'static,
        Fut: Future<Output = Result<()>> + 'static,
    {
        Self::Async(Box::new(move |cx| Box::pin(body(cx))))
    }

    /// Creates a callback-style test body.
    pub fn callback(body: impl FnOnce(&Cx, Done) -> Result<()> + 'static) -> Self {
        Self::Callback(Box::new(body))
    }

    /// Returns the style of this body.
    #[must_use]
    pub const fn style(&self) -> TestStyle {
        match self {
            Self::Sync(_) => TestStyle::Sync,
            Self::Async(_) => TestStyle::Async,
            Self::Callback(_) => TestStyle::Callback,
        }
    }
}

impl fmt::Debug for TestFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TestFn").field(&self.style()).finish()
    }
}

type DoneHandler = Box<dyn FnOnce(Result<()>)>;

/// Completion callback for callback-style tests.
///
/// Only the first call has an effect. Clones share the callback.
#[derive(Clone)]
pub struct Done {
    called: Rc<Cell<bool>>,
    handler: Rc<RefCell<Option<DoneHandler>>>,
}

impl Done {
    /// Creates a callback that forwards the test outcome to `handler`.
    pub fn new(handler: impl FnOnce(Result<()>) + 'static) -> Self {
        Self {
            called: Rc::new(Cell::new(false)),
            handler: Rc::new(RefCell::new(Some(Box::new(handler)))),
        }
    }

    /// Reports success.
    pub fn call(&self) {
        self.finish(Ok(()));
    }

    /// Reports failure.
    pub fn fail(&self, err: Error) {
        self.finish(Err(err));
    }

    /// Reports `result`.
    pub fn finish(&self, result: Result<()>) {
        if self.called.replace(true) {
            return;
        }
        let handler = self.handler.borrow_mut().take();
        if let Some(handler) = handler {
            handler(result);
        }
    }

    /// Returns true once the callback has been called.
    #[must_use]
    pub fn is_called(&self) -> bool {
        self.called.get()
    }
}

impl fmt::Debug for Done {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Done")
            .field("called", &self.is_called())
            .finish()
    }
}

/// Lifecycle of one wrapped-test invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Created; the zone is not active yet.
    Pending,
    /// The zone is active and the body is running.
    Running,
    /// The "must assert" requirement is in force.
    Asserted,
    /// The assertion library cannot be inspected; no requirement was added.
    Unasserted,
    /// The zone has been deactivated.
    Settled,
}

/// Per-invocation state shared by the completion and rejection handlers.
pub struct Invocation {
    zone: Rc<Zone>,
    spec: Arc<ZoneSpec>,
    phase: Cell<Phase>,
    checked: Cell<bool>,
    rejection: RefCell<Option<Error>>,
    listener: Cell<Option<ListenerId>>,
}

impl Invocation {
    /// Forks the zone for this invocation.
    #[must_use]
    pub fn new(cx: &Cx, spec: &Arc<ZoneSpec>, name: &str) -> Self {
        Self {
            zone: cx.fork_zone(name, spec),
            spec: Arc::clone(spec),
            phase: Cell::new(Phase::Pending),
            checked: Cell::new(false),
            rejection: RefCell::new(None),
            listener: Cell::new(None),
        }
    }

    /// Returns the zone.
    #[must_use]
    pub fn zone(&self) -> &Rc<Zone> {
        &self.zone
    }

    /// Returns the current phase.
    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase.get()
    }

    /// Activates the zone.
    pub fn begin(&self) {
        if self.phase.get() != Phase::Pending {
            return;
        }
        self.spec.registry().activate(self.zone.id());
        self.phase.set(Phase::Running);
        tracing::debug!(
            target: "must_assert",
            zone = self.zone.id().as_u64(),
            test = self.zone.name(),
            "test zone entered"
        );
    }

    /// Runs `f` with the zone executing.
    pub fn run<R>(&self, cx: &Cx, f: impl FnOnce() -> R) -> R {
        cx.in_zone(&self.zone, f)
    }

    /// Adds the "must assert" requirement if the test declared none.
    ///
    /// Runs at most once per invocation.
    pub fn check_assertions(&self, api: &dyn AssertionIntrospection) {
        if self.checked.replace(true) {
            return;
        }
        let supported = api.snapshot().is_some();
        if needs_assertion_check(api) {
            api.require_assertions();
        }
        if self.phase.get() == Phase::Running {
            self.phase.set(if supported {
                Phase::Asserted
            } else {
                Phase::Unasserted
            });
        }
    }

    /// Starts recording unhandled rejections.
    pub fn listen(self: &Rc<Self>, cx: &Cx) {
        if self.listener.get().is_some() || self.phase.get() == Phase::Settled {
            return;
        }
        let weak: Weak<Self> = Rc::downgrade(self);
        let id = cx.inner().rejections().subscribe(move |err| {
            if let Some(invocation) = weak.upgrade() {
                tracing::debug!(
                    target: "must_assert",
                    zone = invocation.zone.id().as_u64(),
                    error = %err,
                    "unhandled rejection recorded"
                );
                *invocation.rejection.borrow_mut() = Some(err.clone());
            }
        });
        self.listener.set(Some(id));
    }

    /// Deactivates the zone, records the finish marker and stops listening.
    ///
    /// Returns false if the invocation had already settled.
    pub fn settle(&self, cx: &Cx) -> bool {
        if self.phase.replace(Phase::Settled) == Phase::Settled {
            return false;
        }
        self.spec.registry().deactivate(self.zone.id());
        self.zone.mark_finished(FinishMarker {
            at: cx.now(),
            backtrace: self.spec.cleaned_backtrace(),
        });
        if let Some(id) = self.listener.take() {
            cx.inner().rejections().unsubscribe(id);
        }
        tracing::debug!(
            target: "must_assert",
            zone = self.zone.id().as_u64(),
            at = cx.now().as_millis(),
            "test zone exited"
        );
        true
    }

    /// Lets the loop settle this invocation if its runner abandons it.
    pub fn settle_on_abandon(self: &Rc<Self>, cx: &Cx) {
        let weak: Weak<Self> = Rc::downgrade(self);
        cx.inner().on_abandon(Box::new(move |cx| {
            weak.upgrade().is_some_and(|invocation| invocation.settle(cx))
        }));
    }

    /// Takes the recorded unhandled rejection, if any.
    pub fn take_rejection(&self) -> Option<Error> {
        self.rejection.borrow_mut().take()
    }

    /// Combines the test's own outcome with a recorded rejection.
    ///
    /// A test that failed on its own keeps its error.
    fn outcome(&self, result: Result<()>) -> Result<()> {
        match (result, self.take_rejection()) {
            (Err(err), _) => Err(err),
            (Ok(()), Some(rejection)) => Err(Error::unhandled_rejection(&rejection)),
            (Ok(()), None) => Ok(()),
        }
    }
}

impl fmt::Debug for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Invocation")
            .field("zone", &self.zone.id())
            .field("phase", &self.phase.get())
            .field("listening", &self.listener.get().is_some())
            .finish_non_exhaustive()
    }
}

/// Settles an invocation when dropped.
///
/// With `unwind_only` set it settles only while a panic unwinds through it,
/// for bodies whose normal return leaves the test open.
struct SettleGuard<'a> {
    invocation: &'a Invocation,
    cx: &'a Cx,
    unwind_only: bool,
}

impl<'a> SettleGuard<'a> {
    fn always(invocation: &'a Invocation, cx: &'a Cx) -> Self {
        Self {
            invocation,
            cx,
            unwind_only: false,
        }
    }

    fn on_unwind(invocation: &'a Invocation, cx: &'a Cx) -> Self {
        Self {
            invocation,
            cx,
            unwind_only: true,
        }
    }
}

impl Drop for SettleGuard<'_> {
    fn drop(&mut self) {
        if !self.unwind_only || std::thread::panicking() {
            self.invocation.settle(self.cx);
        }
    }
}

/// Future of a wrapped promise-style test.
struct ZonedTest {
    cx: Cx,
    invocation: Rc<Invocation>,
    inner: TestFuture,
    started: bool,
}

impl Future for ZonedTest {
    type Output = Result<()>;

    fn poll(mut self: Pin<&mut Self>, task_cx: &mut Context<'_>) -> Poll<Result<()>> {
        let this = &mut *self;
        let inner = &mut this.inner;
        let poll = this.invocation.run(&this.cx, || inner.as_mut().poll(task_cx));
        if !this.started {
            this.started = true;
            this.invocation.check_assertions(this.cx.expect_api());
            if poll.is_pending() {
                this.invocation.listen(&this.cx);
            }
        }
        match poll {
            Poll::Pending => Poll::Pending,
            Poll::Ready(result) => {
                this.invocation.settle(&this.cx);
                Poll::Ready(this.invocation.outcome(result))
            }
        }
    }
}

impl Drop for ZonedTest {
    fn drop(&mut self) {
        self.invocation.settle(&self.cx);
    }
}

/// Wraps `test` so every invocation runs in its own zone named `name`.
pub fn wrap_test(spec: &Arc<ZoneSpec>, name: &str, test: TestFn) -> TestFn {
    let spec = Arc::clone(spec);
    let name = name.to_string();
    match test {
        TestFn::Sync(body) => TestFn::Sync(Box::new(move |cx| {
            let invocation = Invocation::new(cx, &spec, &name);
            invocation.begin();
            let _settle = SettleGuard::always(&invocation, cx);
            let result = invocation.run(cx, || body(cx));
            invocation.check_assertions(cx.expect_api());
            result
        })),
        TestFn::Async(body) => TestFn::Async(Box::new(move |cx| {
            let invocation = Rc::new(Invocation::new(&cx, &spec, &name));
            invocation.begin();
            invocation.settle_on_abandon(&cx);
            let inner = {
                let _settle = SettleGuard::on_unwind(&invocation, &cx);
                invocation.run(&cx, || body(cx.clone()))
            };
            Box::pin(ZonedTest {
                cx,
                invocation,
                inner,
                started: false,
            })
        })),
        TestFn::Callback(body) => TestFn::Callback(Box::new(move |cx, original| {
            let invocation = Rc::new(Invocation::new(cx, &spec, &name));
            invocation.begin();
            invocation.settle_on_abandon(cx);
            invocation.listen(cx);
            let done = {
                let invocation = Rc::clone(&invocation);
                let cx = cx.clone();
                Done::new(move |result| {
                    invocation.settle(&cx);
                    original.finish(invocation.outcome(result));
                })
            };
            let result = {
                let _settle = SettleGuard::on_unwind(&invocation, cx);
                invocation.run(cx, || body(cx, done))
            };
            invocation.check_assertions(cx.expect_api());
            if result.is_err() {
                invocation.settle(cx);
            }
            result
        })),
    }
}
