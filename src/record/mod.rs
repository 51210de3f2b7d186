//! Internal records for event-loop entities.
//!
//! This module contains the record types the event loop uses to track
//! zones (one per wrapped test invocation) and the tasks scheduled under them.

pub mod task;
pub mod zone;

pub use task::{TaskKind, TaskRecord};
pub use zone::{FinishMarker, Zone, ZoneStamp};
