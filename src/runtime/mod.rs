//! The host event loop.
//!
//! A deterministic, single-threaded loop with virtual time that runs timer
//! callbacks, microtasks and spawned futures, and that consults a zone's
//! interception hook before every zoned task invocation.
//!
//! # Submodules
//!
//! - [`event_loop`]: [`EventLoop`] and the dispatch machinery
//! - [`config`]: [`LoopConfig`]
//! - [`timer`]: the virtual-time timer queue
//! - [`promise`]: [`Promise`] handles for spawned futures
//! - [`rejection`]: the unhandled-rejection channel
//! - [`sleep`]: the [`Sleep`] future
//! - [`waker`]: thread-safe wakers feeding the microtask queue

pub mod config;
pub mod event_loop;
pub mod promise;
pub mod rejection;
pub mod sleep;
pub mod timer;
pub mod waker;

pub use config::LoopConfig;
pub use event_loop::{EventLoop, RunStatus};
pub use promise::Promise;
pub use rejection::{ListenerId, RejectionChannel};
pub use sleep::Sleep;
pub use timer::TimerQueue;

pub(crate) use event_loop::{Callback, LoopInner, Origin};
