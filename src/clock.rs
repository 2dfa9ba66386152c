//! Wall-clock time source.
//!
//! DESIGN
//! ======
//! Resynchronization compares a server-reported expiry against "now", so the
//! monitor reads wall-clock time through this trait instead of calling
//! `OffsetDateTime::now_utc()` directly. Tick spacing is measured separately
//! with the monotonic tokio clock.

#[cfg(test)]
#[path = "clock_test.rs"]
mod clock_test;

#[cfg(test)]
use std::sync::Mutex;
#[cfg(test)]
use std::time::Duration;

use time::OffsetDateTime;

/// Provider of the current UTC time.
pub trait Clock: Send + Sync {
    fn now_utc(&self) -> OffsetDateTime;
}

/// The system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_utc(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}

/// A clock that only moves when told to.
#[cfg(test)]
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<OffsetDateTime>,
}

#[cfg(test)]
impl ManualClock {
    #[must_use]
    pub fn new(start: OffsetDateTime) -> Self {
        Self { now: Mutex::new(start) }
    }

    /// Move the clock forward.
    pub fn advance(&self, by: Duration) {
        let mut now = self
            .now
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        *now += by;
    }

    /// Jump to an absolute instant (forwards or backwards).
    pub fn set(&self, to: OffsetDateTime) {
        *self
            .now
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = to;
    }
}

#[cfg(test)]
impl Clock for ManualClock {
    fn now_utc(&self) -> OffsetDateTime {
        *self
            .now
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

/// Whole seconds from `now` until `deadline`, rounded up and clamped at zero.
///
/// Any positive fraction counts as a full second so a session that still has
/// time left is never reported as expired.
#[must_use]
pub fn seconds_until(deadline: OffsetDateTime, now: OffsetDateTime) -> u32 {
    let delta = deadline - now;
    if delta.is_negative() || delta.is_zero() {
        return 0;
    }
    let mut secs = delta.whole_seconds();
    if delta.subsec_nanoseconds() > 0 {
        secs += 1;
    }
    u32::try_from(secs).unwrap_or(u32::MAX)
}
