//! The capability context handed to test bodies and task bodies.
//!
//! Every effect a test can have on the event loop flows through [`Cx`]:
//! scheduling timers and microtasks, spawning futures, sleeping, and making
//! assertions. Work scheduled through a `Cx` while a zone is executing is
//! stamped with that zone.

pub mod cx;

pub use cx::{Cx, TimerHandle};
