//! The zone registry: allocation of zone ids and the active-zone pointer.
//!
//! At most one zone is active per registry. Activation overwrites the pointer;
//! deactivation only clears it if it still names the caller's zone, so a
//! straggling settle of an old test can never clear a newer test's zone.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, LazyLock};

use crate::types::ZoneId;

static GLOBAL: LazyLock<Arc<ZoneRegistry>> = LazyLock::new(|| Arc::new(ZoneRegistry::new()));

const NONE: u64 = 0;

/// Tracks the currently active zone.
#[derive(Debug, Default)]
pub struct ZoneRegistry {
    current: AtomicU64,
}

impl ZoneRegistry {
    /// Creates an isolated registry with no active zone.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            current: AtomicU64::new(NONE),
        }
    }

    /// Returns the process-wide shared registry.
    #[must_use]
    pub fn global() -> Arc<Self> {
        Arc::clone(&GLOBAL)
    }

    /// Allocates a fresh zone id. Ids are unique across all registries.
    #[must_use]
    pub fn allocate(&self) -> ZoneId {
        ZoneId::next()
    }

    /// Marks `id` as the active zone.
    pub fn activate(&self, id: ZoneId) {
        let previous = self.current.swap(id.as_u64(), Ordering::AcqRel);
        if previous != NONE && previous != id.as_u64() {
            tracing::debug!(
                target: "must_assert",
                previous,
                next = id.as_u64(),
                "zone activated while another zone was active"
            );
        }
    }

    /// Clears the active zone if it is still `id`.
    ///
    /// Returns true if the pointer was cleared.
    pub fn deactivate(&self, id: ZoneId) -> bool {
        self.current
            .compare_exchange(id.as_u64(), NONE, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Returns the active zone, if any.
    #[must_use]
    pub fn current(&self) -> Option<ZoneId> {
        ZoneId::from_raw(self.current.load(Ordering::Acquire))
    }

    /// Returns true if `id` is the active zone.
    #[must_use]
    pub fn is_current(&self, id: ZoneId) -> bool {
        self.current() == Some(id)
    }
}
