//! Countdown chip text and tone.
//!
//! Pure helpers for whatever renders the remaining session time.

#[cfg(test)]
#[path = "countdown_test.rs"]
mod countdown_test;

use crate::tracker::TrackerState;

/// Below this the chip switches to the critical tone.
pub const CRITICAL_THRESHOLD_SECS: u32 = 60;

/// Visual urgency of the countdown chip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountdownTone {
    Normal,
    Warning,
    Critical,
}

impl CountdownTone {
    #[must_use]
    pub fn for_state(state: &TrackerState) -> Self {
        if state.is_expired || (state.is_warning_active && state.remaining_secs < CRITICAL_THRESHOLD_SECS) {
            Self::Critical
        } else if state.is_warning_active {
            Self::Warning
        } else {
            Self::Normal
        }
    }
}

/// Render seconds as `MM:SS`. Minutes are not capped at 59.
#[must_use]
pub fn format_countdown(remaining_secs: u32) -> String {
    format!("{:02}:{:02}", remaining_secs / 60, remaining_secs % 60)
}
