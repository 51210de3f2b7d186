//! Zone record.
//!
//! A zone is the execution context created for one invocation of a wrapped
//! test. The event loop's zone table owns every zone for the loop's lifetime;
//! tasks only hold a [`ZoneStamp`], a weak back-reference used for identity
//! comparison and diagnostics.

use core::fmt;
use std::cell::RefCell;
use std::rc::{Rc, Weak};
use std::sync::Arc;

use crate::types::{Time, ZoneId};
use crate::zone::ZoneSpec;

/// Records when (and from where) a zone's test settled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinishMarker {
    /// Virtual time at which the zone was deactivated.
    pub at: Time,
    /// Cleaned backtrace of the settle point, when backtraces are enabled.
    pub backtrace: Option<String>,
}

impl fmt::Display for FinishMarker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "test completed at {}", self.at)
    }
}

/// An execution context for one test invocation.
pub struct Zone {
    id: ZoneId,
    name: String,
    spec: Arc<ZoneSpec>,
    created_at: Time,
    finished: RefCell<Option<FinishMarker>>,
}

impl Zone {
    /// Creates a zone record.
    #[must_use]
    pub fn new(id: ZoneId, name: impl Into<String>, spec: Arc<ZoneSpec>, created_at: Time) -> Self {
        Self {
            id,
            name: name.into(),
            spec,
            created_at,
            finished: RefCell::new(None),
        }
    }

    /// Returns the zone id.
    #[must_use]
    pub const fn id(&self) -> ZoneId {
        self.id
    }

    /// Returns the test name. Not unique; never used as a key.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the behavior attached to this zone.
    #[must_use]
    pub fn spec(&self) -> &Arc<ZoneSpec> {
        &self.spec
    }

    /// Returns the creation time.
    #[must_use]
    pub const fn created_at(&self) -> Time {
        self.created_at
    }

    /// Returns the finish marker, if the test has settled.
    #[must_use]
    pub fn finished(&self) -> Option<FinishMarker> {
        self.finished.borrow().clone()
    }

    /// Returns true once the test has settled.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.finished.borrow().is_some()
    }

    /// Records the finish marker. The first marker wins.
    pub fn mark_finished(&self, marker: FinishMarker) {
        let mut slot = self.finished.borrow_mut();
        if slot.is_none() {
            *slot = Some(marker);
        }
    }
}

impl fmt::Debug for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Zone")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("created_at", &self.created_at)
            .field("finished", &self.finished.borrow())
            .finish_non_exhaustive()
    }
}

/// A task's weak reference to the zone it was born under.
#[derive(Debug, Clone)]
pub struct ZoneStamp {
    id: ZoneId,
    zone: Weak<Zone>,
}

impl ZoneStamp {
    /// Stamps a task with `zone`.
    #[must_use]
    pub fn new(zone: &Rc<Zone>) -> Self {
        Self {
            id: zone.id,
            zone: Rc::downgrade(zone),
        }
    }

    /// Creates a stamp whose zone is not held anywhere.
    #[must_use]
    pub fn detached(id: ZoneId) -> Self {
        Self {
            id,
            zone: Weak::new(),
        }
    }

    /// Returns the stamped zone id.
    #[must_use]
    pub fn id(&self) -> ZoneId {
        self.id
    }

    /// Returns the zone if it is still alive.
    #[must_use]
    pub fn upgrade(&self) -> Option<Rc<Zone>> {
        self.zone.upgrade()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zone(id: u64) -> Rc<Zone> {
        let spec = Arc::new(ZoneSpec::default());
        Rc::new(Zone::new(
            ZoneId::new_for_test(id),
            "adds numbers",
            spec,
            Time::ZERO,
        ))
    }

    #[test]
    fn first_finish_marker_wins() {
        let z = zone(1);
        assert!(!z.is_finished());
        z.mark_finished(FinishMarker {
            at: Time::from_millis(5),
            backtrace: None,
        });
        z.mark_finished(FinishMarker {
            at: Time::from_millis(9),
            backtrace: None,
        });
        assert_eq!(z.finished().map(|m| m.at), Some(Time::from_millis(5)));
    }

    #[test]
    fn stamp_tracks_liveness() {
        let z = zone(2);
        let stamp = ZoneStamp::new(&z);
        assert_eq!(stamp.id(), ZoneId::new_for_test(2));
        assert!(stamp.upgrade().is_some());
        drop(z);
        assert!(stamp.upgrade().is_none());
        assert_eq!(stamp.id(), ZoneId::new_for_test(2));
    }

    #[test]
    fn finish_marker_display() {
        let marker = FinishMarker {
            at: Time::from_millis(12),
            backtrace: None,
        };
        assert_eq!(marker.to_string(), "test completed at 12ms");
    }
}
