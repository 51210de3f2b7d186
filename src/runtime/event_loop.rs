//! The single-threaded event loop.
//!
//! The loop owns three kinds of deferred work, all recorded as tasks:
//!
//! - timers, fired in virtual time by deadline (insertion order on ties)
//! - microtasks, run FIFO until the queue is empty
//! - futures ("promises"), polled as microtasks whenever their waker fires
//!
//! Every task remembers the zone that was executing when it was created.
//! Before a zoned task runs, the zone's interception hook decides whether it
//! may. Tasks created outside any zone are never intercepted.
//!
//! Virtual time only moves when the loop advances to the next timer deadline
//! or to a run deadline; nothing here reads the wall clock.

use core::fmt;
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet, VecDeque};
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::pin::Pin;
use std::rc::Rc;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use super::config::LoopConfig;
use super::promise::Promise;
use super::rejection::RejectionChannel;
use super::timer::TimerQueue;
use super::waker::WakerState;
use crate::cx::Cx;
use crate::error::{Error, Result};
use crate::expect::Expect;
use crate::record::{TaskKind, TaskRecord, Zone, ZoneStamp};
use crate::trace::{CausalTrace, DEFAULT_TRACE_LIMIT};
use crate::types::{TaskId, Time};
use crate::zone::{InvokeTaskContext, ZoneSpec};

pub(crate) type Callback = Box<dyn FnOnce(&Cx) -> Result<()>>;
pub(crate) type LocalFuture = Pin<Box<dyn Future<Output = ()>>>;

/// How a run call ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// The predicate held, or (for idle runs) no work was left.
    Settled,
    /// The deadline passed with no further work due before it.
    TimedOut,
    /// The step guard tripped.
    StepLimit,
}

/// Whether a new task inherits the executing zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Origin {
    /// Stamp with the executing zone, if any.
    Inherit,
    /// Never stamp; the task is never intercepted.
    Root,
}

enum TaskBody {
    Callback(Callback),
    Future(LocalFuture),
}

struct TaskSlot {
    record: Rc<TaskRecord>,
    // `None` while a future is being polled.
    body: Option<TaskBody>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Dispatch {
    Ran,
    Denied,
    Missing,
}

struct StepBudget {
    remaining: Option<u64>,
}

impl StepBudget {
    fn new(max: Option<u64>) -> Self {
        Self { remaining: max }
    }

    fn take(&mut self) -> bool {
        match &mut self.remaining {
            None => true,
            Some(0) => false,
            Some(n) => {
                *n -= 1;
                true
            }
        }
    }
}

pub(crate) struct LoopInner {
    config: LoopConfig,
    now: Cell<Time>,
    next_task: Cell<u64>,
    microtasks: RefCell<VecDeque<TaskId>>,
    queued_polls: RefCell<HashSet<TaskId>>,
    timers: RefCell<TimerQueue>,
    tasks: RefCell<HashMap<TaskId, TaskSlot>>,
    wakers: Arc<WakerState>,
    executing_zone: RefCell<Option<Rc<Zone>>>,
    executing_task: RefCell<Option<Rc<TaskRecord>>>,
    zones: RefCell<Vec<Rc<Zone>>>,
    rejections: RejectionChannel,
    uncaught: RefCell<Vec<Error>>,
    // Settle hooks of wrapped tests that may outlive their run call.
    open_tests: RefCell<Vec<Box<dyn FnOnce(&Cx) -> bool>>>,
    expect: Expect,
}

/// Restores the executing zone and task when dropped.
struct ExecutingGuard<'a> {
    inner: &'a LoopInner,
    zone: Option<Rc<Zone>>,
    task: Option<Option<Rc<TaskRecord>>>,
}

impl Drop for ExecutingGuard<'_> {
    fn drop(&mut self) {
        *self.inner.executing_zone.borrow_mut() = self.zone.take();
        if let Some(task) = self.task.take() {
            *self.inner.executing_task.borrow_mut() = task;
        }
    }
}

impl LoopInner {
    fn new(config: LoopConfig) -> Self {
        Self {
            config,
            now: Cell::new(Time::ZERO),
            next_task: Cell::new(1),
            microtasks: RefCell::new(VecDeque::new()),
            queued_polls: RefCell::new(HashSet::new()),
            timers: RefCell::new(TimerQueue::new()),
            tasks: RefCell::new(HashMap::new()),
            wakers: Arc::new(WakerState::new()),
            executing_zone: RefCell::new(None),
            executing_task: RefCell::new(None),
            zones: RefCell::new(Vec::new()),
            rejections: RejectionChannel::new(),
            uncaught: RefCell::new(Vec::new()),
            open_tests: RefCell::new(Vec::new()),
            expect: Expect::new(),
        }
    }

    pub(crate) fn now(&self) -> Time {
        self.now.get()
    }

    pub(crate) fn config(&self) -> LoopConfig {
        self.config
    }

    pub(crate) fn expect(&self) -> &Expect {
        &self.expect
    }

    pub(crate) fn rejections(&self) -> &RejectionChannel {
        &self.rejections
    }

    pub(crate) fn executing_zone(&self) -> Option<Rc<Zone>> {
        self.executing_zone.borrow().clone()
    }

    // === Zones ===

    /// Creates a zone, activates nothing, and keeps it in the zone table.
    pub(crate) fn fork_zone(&self, name: &str, spec: &Arc<ZoneSpec>) -> Rc<Zone> {
        let id = spec.registry().allocate();
        let zone = Rc::new(Zone::new(id, name, Arc::clone(spec), self.now()));
        self.zones.borrow_mut().push(Rc::clone(&zone));
        tracing::debug!(target: "must_assert", zone = id.as_u64(), name, "zone forked");
        zone
    }

    /// Registers `settle` to run if the test it belongs to is abandoned.
    ///
    /// The hook returns true if it settled anything.
    pub(crate) fn on_abandon(&self, settle: Box<dyn FnOnce(&Cx) -> bool>) {
        self.open_tests.borrow_mut().push(settle);
    }

    /// Runs `f` with `zone` as the executing zone.
    pub(crate) fn in_zone<R>(&self, zone: &Rc<Zone>, f: impl FnOnce() -> R) -> R {
        let previous = self.executing_zone.replace(Some(Rc::clone(zone)));
        let _guard = ExecutingGuard {
            inner: self,
            zone: previous,
            task: None,
        };
        f()
    }

    fn executing(&self, zone: Option<Rc<Zone>>, task: Rc<TaskRecord>) -> ExecutingGuard<'_> {
        let previous_zone = self.executing_zone.replace(zone);
        let previous_task = self.executing_task.replace(Some(task));
        ExecutingGuard {
            inner: self,
            zone: previous_zone,
            task: Some(previous_task),
        }
    }

    // === Scheduling ===

    fn new_record(&self, kind: TaskKind, source: &'static str, origin: Origin) -> Rc<TaskRecord> {
        let raw = self.next_task.get();
        self.next_task.set(raw + 1);
        let zone = match origin {
            Origin::Inherit => self.executing_zone(),
            Origin::Root => None,
        };
        let limit = zone
            .as_ref()
            .map_or(DEFAULT_TRACE_LIMIT, |z| z.spec().trace_limit());
        let backtrace = zone.as_ref().and_then(|z| z.spec().capture_backtrace());
        let now = self.now();
        let trace = match self.executing_task.borrow().as_ref() {
            Some(parent) => parent.trace.extended(parent.trace_entry(now), limit),
            None => CausalTrace::new(limit),
        };
        Rc::new(TaskRecord {
            id: TaskId::from_raw(raw),
            kind,
            source,
            origin: zone.as_ref().map(ZoneStamp::new),
            scheduled_at: now,
            backtrace,
            trace,
        })
    }

    fn insert(&self, record: Rc<TaskRecord>, body: TaskBody) -> TaskId {
        let id = record.id;
        self.tasks.borrow_mut().insert(
            id,
            TaskSlot {
                record,
                body: Some(body),
            },
        );
        id
    }

    pub(crate) fn schedule_timer(
        &self,
        delay: Duration,
        source: &'static str,
        callback: Callback,
    ) -> TaskId {
        let record = self.new_record(TaskKind::Timer, source, Origin::Inherit);
        let deadline = self.now() + delay;
        let id = self.insert(record, TaskBody::Callback(callback));
        self.timers.borrow_mut().insert(deadline, id);
        tracing::trace!(target: "must_assert", task = id.as_u64(), deadline = deadline.as_millis(), source, "timer scheduled");
        id
    }

    pub(crate) fn cancel_timer(&self, id: TaskId) -> bool {
        let cancelled = self.timers.borrow_mut().cancel(id);
        if cancelled {
            self.tasks.borrow_mut().remove(&id);
        }
        cancelled
    }

    pub(crate) fn schedule_microtask(
        &self,
        source: &'static str,
        origin: Origin,
        callback: Callback,
    ) -> TaskId {
        let record = self.new_record(TaskKind::Microtask, source, origin);
        let id = self.insert(record, TaskBody::Callback(callback));
        self.microtasks.borrow_mut().push_back(id);
        id
    }

    fn spawn_task(&self, source: &'static str, origin: Origin, future: LocalFuture) -> TaskId {
        let record = self.new_record(TaskKind::Promise, source, origin);
        let id = self.insert(record, TaskBody::Future(future));
        self.queue_poll(id);
        id
    }

    fn queue_poll(&self, id: TaskId) {
        if self.queued_polls.borrow_mut().insert(id) {
            self.microtasks.borrow_mut().push_back(id);
        }
    }

    /// Spawns a future whose outcome settles the returned promise.
    pub(crate) fn spawn<T, F>(self: &Rc<Self>, source: &'static str, origin: Origin, future: F) -> Promise<T>
    where
        T: 'static,
        F: Future<Output = Result<T>> + 'static,
    {
        let (promise, state) = Promise::pending();
        let weak = Rc::downgrade(self);
        let task = async move {
            let result = future.await;
            if let Some((err, handled)) = state.settle(result) {
                if let Some(inner) = weak.upgrade() {
                    inner.watch_rejection(err, handled);
                }
            }
        };
        self.spawn_task(source, origin, Box::pin(task));
        promise
    }

    /// Creates an already-settled promise.
    pub(crate) fn settled<T: 'static>(&self, result: Result<T>) -> Promise<T> {
        let (promise, state) = Promise::pending();
        if let Some((err, handled)) = state.settle(result) {
            self.watch_rejection(err, handled);
        }
        promise
    }

    /// Emits `err` on the rejection channel after the current microtasks,
    /// unless the promise got handled by then.
    fn watch_rejection(&self, err: Error, handled: Rc<Cell<bool>>) {
        self.schedule_microtask(
            "unhandledRejection",
            Origin::Root,
            Box::new(move |cx| {
                if !handled.get() {
                    cx.inner().rejections.emit(&err);
                }
                Ok(())
            }),
        );
    }

    // === Dispatch ===

    fn dispatch(self: &Rc<Self>, id: TaskId) -> Dispatch {
        let (record, body) = {
            let mut tasks = self.tasks.borrow_mut();
            let Some(slot) = tasks.get_mut(&id) else {
                return Dispatch::Missing;
            };
            let record = Rc::clone(&slot.record);
            match slot.body.take() {
                Some(TaskBody::Callback(callback)) => {
                    tasks.remove(&id);
                    (record, TaskBody::Callback(callback))
                }
                Some(TaskBody::Future(future)) => (record, TaskBody::Future(future)),
                None => return Dispatch::Missing,
            }
        };

        let zone = record.origin_zone();
        if let Some(zone) = &zone {
            let verdict = {
                let ctx = InvokeTaskContext::new(zone, &record, self.now());
                zone.spec().on_invoke_task().on_invoke_task(&ctx)
            };
            match verdict {
                Ok(true) => {}
                Ok(false) => {
                    self.tasks.borrow_mut().remove(&id);
                    tracing::debug!(target: "must_assert", task = id.as_u64(), "task dropped by policy");
                    return Dispatch::Denied;
                }
                Err(err) => {
                    self.tasks.borrow_mut().remove(&id);
                    self.report(Some(zone), &record, err.exposed());
                    return Dispatch::Denied;
                }
            }
        }

        let cx = Cx::new(Rc::clone(self));
        let outcome = {
            let _guard = self.executing(zone.clone(), Rc::clone(&record));
            match body {
                TaskBody::Callback(callback) => {
                    panic::catch_unwind(AssertUnwindSafe(|| callback(&cx)))
                        .unwrap_or_else(|payload| Err(Error::panicked(payload.as_ref())))
                }
                TaskBody::Future(mut future) => {
                    let waker = self.wakers.waker_for(id);
                    let mut task_cx = Context::from_waker(&waker);
                    match panic::catch_unwind(AssertUnwindSafe(|| future.as_mut().poll(&mut task_cx))) {
                        Ok(Poll::Pending) => {
                            if let Some(slot) = self.tasks.borrow_mut().get_mut(&id) {
                                slot.body = Some(TaskBody::Future(future));
                            }
                            Ok(())
                        }
                        Ok(Poll::Ready(())) => {
                            self.tasks.borrow_mut().remove(&id);
                            Ok(())
                        }
                        Err(payload) => {
                            self.tasks.borrow_mut().remove(&id);
                            Err(Error::panicked(payload.as_ref()))
                        }
                    }
                }
            }
        };
        if let Err(err) = outcome {
            self.report(zone.as_ref(), &record, err);
        }
        Dispatch::Ran
    }

    /// Routes a task error through its zone's handler; whatever is re-raised
    /// lands in the uncaught sink.
    fn report(&self, zone: Option<&Rc<Zone>>, record: &TaskRecord, mut err: Error) {
        let ctx = err.context_mut();
        ctx.task_id.get_or_insert(record.id);
        ctx.task_kind.get_or_insert(record.kind);
        if let Some(zone) = zone {
            ctx.zone_id.get_or_insert(zone.id());
            if ctx.test_name.is_none() {
                ctx.test_name = Some(zone.name().to_string());
            }
        }
        let raised = match zone {
            Some(zone) => zone.spec().handle_error(err),
            None => Some(err),
        };
        if let Some(err) = raised {
            tracing::debug!(target: "must_assert", task = record.id.as_u64(), error = %err, "uncaught task error");
            self.uncaught.borrow_mut().push(err);
        }
    }

    // === Running ===

    fn pump_wakes(&self) {
        for id in self.wakers.drain_woken() {
            if self.tasks.borrow().contains_key(&id) {
                self.queue_poll(id);
            }
        }
    }

    fn drain_microtasks(self: &Rc<Self>, budget: &mut StepBudget) -> bool {
        loop {
            self.pump_wakes();
            if self.microtasks.borrow().is_empty() {
                return true;
            }
            if !budget.take() {
                return false;
            }
            let next = self.microtasks.borrow_mut().pop_front();
            if let Some(id) = next {
                self.queued_polls.borrow_mut().remove(&id);
                self.dispatch(id);
            }
        }
    }

    fn fire_next_timer(self: &Rc<Self>, deadline: Time, budget: &mut StepBudget) -> Option<RunStatus> {
        let next = self.timers.borrow_mut().next_deadline();
        match next {
            Some(at) if at <= deadline => {
                if !budget.take() {
                    return Some(RunStatus::StepLimit);
                }
                if at > self.now() {
                    self.now.set(at);
                }
                let due = self.timers.borrow_mut().pop_due(self.now());
                if let Some((_, id)) = due {
                    self.dispatch(id);
                }
                None
            }
            _ => Some(RunStatus::TimedOut),
        }
    }

    fn run_until(self: &Rc<Self>, deadline: Time, mut settled: impl FnMut() -> bool) -> RunStatus {
        let mut budget = StepBudget::new(self.config.max_steps);
        loop {
            if !self.drain_microtasks(&mut budget) {
                return RunStatus::StepLimit;
            }
            if settled() {
                return RunStatus::Settled;
            }
            if let Some(status) = self.fire_next_timer(deadline, &mut budget) {
                if status == RunStatus::TimedOut && deadline > self.now() && deadline != Time::MAX {
                    self.now.set(deadline);
                }
                return status;
            }
        }
    }

    fn teardown(&self) {
        let tasks = std::mem::take(&mut *self.tasks.borrow_mut());
        self.microtasks.borrow_mut().clear();
        self.queued_polls.borrow_mut().clear();
        *self.timers.borrow_mut() = TimerQueue::new();
        self.open_tests.borrow_mut().clear();
        drop(tasks);
    }
}

/// A deterministic single-threaded event loop with virtual time.
///
/// # Example
///
/// ```
/// use must_assert::runtime::{EventLoop, RunStatus};
/// use std::time::Duration;
///
/// let event_loop = EventLoop::new();
/// let cx = event_loop.cx();
/// cx.set_timeout(Duration::from_millis(10), |cx| {
///     cx.expect(1 + 1).to_be(2)
/// });
/// assert_eq!(event_loop.run_until_idle(), RunStatus::Settled);
/// assert_eq!(event_loop.now().as_millis(), 10);
/// ```
pub struct EventLoop {
    inner: Rc<LoopInner>,
}

impl EventLoop {
    /// Creates a loop with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(LoopConfig::default())
    }

    /// Creates a loop with `config`.
    #[must_use]
    pub fn with_config(config: LoopConfig) -> Self {
        Self {
            inner: Rc::new(LoopInner::new(config)),
        }
    }

    /// Returns a capability handle bound to this loop.
    #[must_use]
    pub fn cx(&self) -> Cx {
        Cx::new(Rc::clone(&self.inner))
    }

    /// Returns the current virtual time.
    #[must_use]
    pub fn now(&self) -> Time {
        self.inner.now()
    }

    /// Returns the loop configuration.
    #[must_use]
    pub fn config(&self) -> LoopConfig {
        self.inner.config
    }

    /// Returns the assertion state shared by every test on this loop.
    #[must_use]
    pub fn expect(&self) -> &Expect {
        &self.inner.expect
    }

    /// Returns the unhandled-rejection channel.
    #[must_use]
    pub fn rejections(&self) -> &RejectionChannel {
        &self.inner.rejections
    }

    /// Spawns a future outside any zone. Its polls are never intercepted.
    pub fn spawn_root<T, F>(&self, future: F) -> Promise<T>
    where
        T: 'static,
        F: Future<Output = Result<T>> + 'static,
    {
        self.inner.spawn("spawn", Origin::Root, future)
    }

    /// Runs microtasks (and the futures they wake) until none are left.
    pub fn run_microtasks(&self) -> RunStatus {
        let mut budget = StepBudget::new(self.inner.config.max_steps);
        if self.inner.drain_microtasks(&mut budget) {
            RunStatus::Settled
        } else {
            RunStatus::StepLimit
        }
    }

    /// Runs until `settled` holds after a microtask checkpoint, or until no
    /// work is due before `deadline`.
    ///
    /// On [`RunStatus::TimedOut`] the clock is advanced to `deadline`.
    pub fn run_until(&self, deadline: Time, settled: impl FnMut() -> bool) -> RunStatus {
        self.inner.run_until(deadline, settled)
    }

    /// Runs every pending microtask and timer.
    pub fn run_until_idle(&self) -> RunStatus {
        match self.inner.run_until(Time::MAX, || false) {
            RunStatus::TimedOut => RunStatus::Settled,
            other => other,
        }
    }

    /// Returns true if a task raised an error nobody handled.
    #[must_use]
    pub fn has_uncaught(&self) -> bool {
        !self.inner.uncaught.borrow().is_empty()
    }

    /// Takes the errors raised by tasks since the last call.
    pub fn take_uncaught(&self) -> Vec<Error> {
        std::mem::take(&mut *self.inner.uncaught.borrow_mut())
    }

    /// Settles every wrapped test registered on this loop that is still open.
    ///
    /// A test abandoned by its runner (timed out, or its body panicked before
    /// it could settle) gets its finish marker, its zone is deactivated and
    /// its rejection listener removed. Returns the number of tests settled.
    pub fn settle_open_tests(&self) -> usize {
        let hooks = std::mem::take(&mut *self.inner.open_tests.borrow_mut());
        if hooks.is_empty() {
            return 0;
        }
        let cx = self.cx();
        hooks.into_iter().map(|settle| settle(&cx)).filter(|&settled| settled).count()
    }

    /// Returns every zone forked on this loop, oldest first.
    #[must_use]
    pub fn zones(&self) -> Vec<Rc<Zone>> {
        self.inner.zones.borrow().clone()
    }

    /// Returns the number of tasks that have not run yet.
    #[must_use]
    pub fn pending_tasks(&self) -> usize {
        self.inner.tasks.borrow().len()
    }

    /// Returns the number of live timers.
    #[must_use]
    pub fn pending_timers(&self) -> usize {
        self.inner.timers.borrow().len()
    }
}

impl Default for EventLoop {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for EventLoop {
    fn drop(&mut self) {
        // Pending futures hold `Cx` handles back into the loop.
        self.inner.teardown();
    }
}

impl fmt::Debug for EventLoop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventLoop")
            .field("now", &self.now())
            .field("pending_tasks", &self.pending_tasks())
            .field("zones", &self.inner.zones.borrow().len())
            .finish_non_exhaustive()
    }
}
