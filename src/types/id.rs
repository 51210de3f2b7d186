//! Identifier types for zones and tasks, plus the virtual clock instant.
//!
//! Zone ids are drawn from a single process-wide counter so that they stay
//! unique across every [`ZoneRegistry`](crate::zone::ZoneRegistry) and every
//! event loop in the process. Task ids are unique per event loop.

use core::fmt;
use std::ops::Add;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

static ZONE_COUNTER: AtomicU64 = AtomicU64::new(1);

/// A unique identifier for an execution context ("zone").
///
/// Zero is never handed out; the registry uses it internally to mean
/// "no active zone".
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ZoneId(u64);

impl ZoneId {
    /// Allocates the next process-unique zone id.
    #[must_use]
    pub(crate) fn next() -> Self {
        Self(ZONE_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Rebuilds a zone id from its raw value, rejecting zero.
    #[must_use]
    pub(crate) const fn from_raw(raw: u64) -> Option<Self> {
        if raw == 0 {
            None
        } else {
            Some(Self(raw))
        }
    }

    /// Returns the raw numeric value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Creates a zone id for testing purposes.
    #[doc(hidden)]
    #[must_use]
    pub const fn new_for_test(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Debug for ZoneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ZoneId({})", self.0)
    }
}

impl fmt::Display for ZoneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Z{}", self.0)
    }
}

/// A unique identifier for a scheduled task within one event loop.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskId(u64);

impl TaskId {
    /// Creates a task id from a raw loop-local sequence number.
    #[must_use]
    pub(crate) const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw numeric value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Creates a task id for testing purposes.
    #[doc(hidden)]
    #[must_use]
    pub const fn new_for_test(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Debug for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TaskId({})", self.0)
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "T{}", self.0)
    }
}

/// A virtual instant on the event loop clock, in milliseconds.
///
/// The clock only moves when the event loop advances to a timer deadline or
/// a runner deadline; it never reads wall-clock time.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Time(u64);

impl Time {
    /// The loop's starting instant.
    pub const ZERO: Self = Self(0);

    /// The maximum representable instant.
    pub const MAX: Self = Self(u64::MAX);

    /// Creates a time from milliseconds since loop start.
    #[must_use]
    pub const fn from_millis(millis: u64) -> Self {
        Self(millis)
    }

    /// Returns the time as milliseconds since loop start.
    #[must_use]
    pub const fn as_millis(self) -> u64 {
        self.0
    }

    /// Adds milliseconds, saturating on overflow.
    #[must_use]
    pub const fn saturating_add_millis(self, millis: u64) -> Self {
        Self(self.0.saturating_add(millis))
    }

    /// Returns the elapsed milliseconds since `earlier` (0 if `earlier` is later).
    #[must_use]
    pub const fn duration_since(self, earlier: Self) -> u64 {
        self.0.saturating_sub(earlier.0)
    }
}

impl Add<Duration> for Time {
    type Output = Self;

    fn add(self, rhs: Duration) -> Self::Output {
        let millis = u64::try_from(rhs.as_millis()).unwrap_or(u64::MAX);
        self.saturating_add_millis(millis)
    }
}

impl fmt::Debug for Time {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Time({}ms)", self.0)
    }
}

impl fmt::Display for Time {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 >= 1_000 {
            write!(f, "{}.{:03}s", self.0 / 1_000, self.0 % 1_000)
        } else {
            write!(f, "{}ms", self.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zone_ids_are_unique_and_nonzero() {
        let a = ZoneId::next();
        let b = ZoneId::next();
        assert_ne!(a, b);
        assert!(a.as_u64() > 0);
        assert!(b > a);
    }

    #[test]
    fn zero_is_not_a_zone() {
        assert!(ZoneId::from_raw(0).is_none());
        assert_eq!(ZoneId::from_raw(7), Some(ZoneId::new_for_test(7)));
    }

    #[test]
    fn display_formats() {
        assert_eq!(ZoneId::new_for_test(3).to_string(), "Z3");
        assert_eq!(TaskId::new_for_test(12).to_string(), "T12");
        assert_eq!(Time::from_millis(42).to_string(), "42ms");
        assert_eq!(Time::from_millis(1_500).to_string(), "1.500s");
    }

    #[test]
    fn time_arithmetic() {
        let t = Time::from_millis(10) + Duration::from_millis(5);
        assert_eq!(t.as_millis(), 15);
        assert_eq!(t.duration_since(Time::from_millis(20)), 0);
        assert_eq!(Time::MAX.saturating_add_millis(1), Time::MAX);
    }
}
