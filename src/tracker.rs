//! Inactivity tracker: the pure countdown state machine.
//!
//! DESIGN
//! ======
//! The tracker never reads a clock and never performs I/O. Callers feed it
//! tick events, server snapshots, and confirmed renewals; it returns the new
//! `TrackerState`. That keeps every transition testable without a runtime.
//!
//! States: Active -> Warning when remaining time drops to the warning
//! threshold, Active|Warning -> Expired at zero. Warning -> Active only via
//! renewal or a resynchronization above the threshold. Expired is terminal
//! for resync and tick; only `renew` (after the server confirms) recovers.

#[cfg(test)]
#[path = "tracker_test.rs"]
mod tracker_test;

use std::time::Duration;

use serde::Serialize;
use time::OffsetDateTime;

use crate::clock::seconds_until;
use crate::error::SessionError;

/// Admin session lifetime: 30 minutes.
pub const DEFAULT_TOTAL_TIMEOUT_SECS: u32 = 30 * 60;
/// Warn with 5 minutes left.
pub const DEFAULT_WARNING_THRESHOLD_SECS: u32 = 5 * 60;

/// Countdown granularity. One tick never removes more than this.
pub const TICK_UNIT: Duration = Duration::from_secs(1);

// =============================================================================
// SESSION WINDOW
// =============================================================================

/// Immutable timeout policy: total lifetime and the warning threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionWindow {
    total_timeout_secs: u32,
    warning_threshold_secs: u32,
}

impl SessionWindow {
    /// Build a window, enforcing `0 < warning < total`.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidWindow`] when the pair is out of range.
    pub fn new(total_timeout_secs: u32, warning_threshold_secs: u32) -> Result<Self, SessionError> {
        if total_timeout_secs == 0 {
            return Err(SessionError::InvalidWindow("total timeout must be positive".into()));
        }
        if warning_threshold_secs == 0 || warning_threshold_secs >= total_timeout_secs {
            return Err(SessionError::InvalidWindow(format!(
                "warning threshold {warning_threshold_secs}s must be between 1s and {}s",
                total_timeout_secs - 1
            )));
        }
        Ok(Self { total_timeout_secs, warning_threshold_secs })
    }

    /// The fixed admin policy (30 minutes, warn at 5).
    #[must_use]
    pub const fn admin_default() -> Self {
        Self {
            total_timeout_secs: DEFAULT_TOTAL_TIMEOUT_SECS,
            warning_threshold_secs: DEFAULT_WARNING_THRESHOLD_SECS,
        }
    }

    #[must_use]
    pub fn total_timeout_secs(&self) -> u32 {
        self.total_timeout_secs
    }

    #[must_use]
    pub fn warning_threshold_secs(&self) -> u32 {
        self.warning_threshold_secs
    }

    fn state_for(self, remaining_secs: u32) -> TrackerState {
        TrackerState {
            remaining_secs,
            is_warning_active: remaining_secs > 0 && remaining_secs <= self.warning_threshold_secs,
            is_expired: remaining_secs == 0,
        }
    }
}

impl Default for SessionWindow {
    fn default() -> Self {
        Self::admin_default()
    }
}

// =============================================================================
// STATE
// =============================================================================

/// Snapshot of the countdown as seen by observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TrackerState {
    pub remaining_secs: u32,
    pub is_warning_active: bool,
    pub is_expired: bool,
}

impl TrackerState {
    #[must_use]
    pub fn phase(&self) -> SessionPhase {
        if self.is_expired {
            SessionPhase::Expired
        } else if self.is_warning_active {
            SessionPhase::Warning
        } else {
            SessionPhase::Active
        }
    }
}

/// Coarse lifecycle phase derived from [`TrackerState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    Active,
    Warning,
    Expired,
}

/// Authoritative expiry reported by the authentication service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerSessionSnapshot {
    pub expires_at: OffsetDateTime,
}

impl ServerSessionSnapshot {
    /// Remaining whole seconds relative to `now`, never negative.
    #[must_use]
    pub fn remaining_secs_at(&self, now: OffsetDateTime) -> u32 {
        seconds_until(self.expires_at, now)
    }
}

// =============================================================================
// TRACKER
// =============================================================================

/// Owns one session's countdown. Not `Clone`: there is exactly one writer.
#[derive(Debug)]
pub struct InactivityTracker {
    window: SessionWindow,
    state: TrackerState,
    /// Elapsed time not yet turned into a whole-second decrement.
    carry: Duration,
}

impl InactivityTracker {
    /// Start a fresh countdown at the window's full timeout.
    #[must_use]
    pub fn initialize(window: SessionWindow) -> Self {
        Self { window, state: window.state_for(window.total_timeout_secs), carry: Duration::ZERO }
    }

    #[must_use]
    pub fn state(&self) -> TrackerState {
        self.state
    }

    #[must_use]
    pub fn phase(&self) -> SessionPhase {
        self.state.phase()
    }

    #[must_use]
    pub fn window(&self) -> SessionWindow {
        self.window
    }

    /// Advance by exactly one tick unit.
    pub fn tick(&mut self) -> TrackerState {
        self.tick_after(TICK_UNIT)
    }

    /// Advance by the wall-clock time since the previous tick.
    ///
    /// Each call contributes at most one [`TICK_UNIT`], so a burst of late
    /// ticks after the host was suspended cannot drain the countdown; the
    /// next status poll corrects any real drift. Sub-second remainders carry
    /// over to the following tick.
    pub fn tick_after(&mut self, elapsed: Duration) -> TrackerState {
        self.advance(elapsed, TICK_UNIT)
    }

    /// Like [`tick_after`](Self::tick_after) for a timer firing every
    /// `period`: one call may remove up to `max(period, TICK_UNIT)`, in whole
    /// seconds, so a slower timer keeps wall-clock pace.
    pub fn advance(&mut self, elapsed: Duration, period: Duration) -> TrackerState {
        if self.state.is_expired {
            return self.state;
        }
        self.carry += elapsed.min(period.max(TICK_UNIT));
        let whole = self.carry.as_secs();
        if whole > 0 {
            self.carry -= Duration::from_secs(whole);
            let step = u32::try_from(whole).unwrap_or(u32::MAX);
            self.state = self.window.state_for(self.state.remaining_secs.saturating_sub(step));
        }
        self.state
    }

    /// Replace local remaining time with server truth.
    ///
    /// The server may report more or less time than the local countdown;
    /// either way it wins. Ignored once expired.
    pub fn resynchronize(&mut self, snapshot: &ServerSessionSnapshot, now: OffsetDateTime) -> TrackerState {
        if self.state.is_expired {
            return self.state;
        }
        self.carry = Duration::ZERO;
        self.state = self.window.state_for(snapshot.remaining_secs_at(now));
        self.state
    }

    /// Reset to a full window after the server confirmed an extension.
    pub fn renew(&mut self) -> TrackerState {
        self.carry = Duration::ZERO;
        self.state = self.window.state_for(self.window.total_timeout_secs);
        self.state
    }

    /// Jump straight to Expired (the server said we are unauthenticated).
    pub fn expire(&mut self) -> TrackerState {
        self.carry = Duration::ZERO;
        self.state = self.window.state_for(0);
        self.state
    }
}
