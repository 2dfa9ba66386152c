use super::*;

fn window() -> SessionWindow {
    SessionWindow::new(1800, 300).expect("valid window")
}

fn epoch() -> OffsetDateTime {
    OffsetDateTime::from_unix_timestamp(1_700_000_000).expect("valid timestamp")
}

fn assert_invariants(state: TrackerState, window: SessionWindow) {
    assert_eq!(
        state.is_warning_active,
        state.remaining_secs > 0 && state.remaining_secs <= window.warning_threshold_secs(),
        "warning flag out of sync at {state:?}"
    );
    assert_eq!(state.is_expired, state.remaining_secs == 0, "expired flag out of sync at {state:?}");
}

// =========================================================================
// SessionWindow
// =========================================================================

#[test]
fn window_rejects_zero_total() {
    assert!(matches!(SessionWindow::new(0, 0), Err(SessionError::InvalidWindow(_))));
}

#[test]
fn window_rejects_threshold_outside_range() {
    assert!(SessionWindow::new(1800, 0).is_err());
    assert!(SessionWindow::new(1800, 1800).is_err());
    assert!(SessionWindow::new(1800, 2000).is_err());
    assert!(SessionWindow::new(2, 1).is_ok());
}

#[test]
fn window_default_is_admin_policy() {
    let w = SessionWindow::default();
    assert_eq!(w.total_timeout_secs(), DEFAULT_TOTAL_TIMEOUT_SECS);
    assert_eq!(w.warning_threshold_secs(), DEFAULT_WARNING_THRESHOLD_SECS);
}

// =========================================================================
// initialize / tick
// =========================================================================

#[test]
fn initialize_starts_full_and_active() {
    let tracker = InactivityTracker::initialize(window());
    assert_eq!(
        tracker.state(),
        TrackerState { remaining_secs: 1800, is_warning_active: false, is_expired: false }
    );
    assert_eq!(tracker.phase(), SessionPhase::Active);
}

#[test]
fn ticks_reach_warning_then_expiry() {
    let mut tracker = InactivityTracker::initialize(window());
    for _ in 0..1500 {
        tracker.tick();
    }
    assert_eq!(
        tracker.state(),
        TrackerState { remaining_secs: 300, is_warning_active: true, is_expired: false }
    );

    for _ in 0..300 {
        tracker.tick();
    }
    assert_eq!(
        tracker.state(),
        TrackerState { remaining_secs: 0, is_warning_active: false, is_expired: true }
    );
}

#[test]
fn ticks_are_monotonic_and_expire_exactly_at_zero() {
    let w = SessionWindow::new(20, 5).expect("valid window");
    let mut tracker = InactivityTracker::initialize(w);
    let mut previous = tracker.state().remaining_secs;
    for _ in 0..25 {
        let state = tracker.tick();
        assert!(state.remaining_secs <= previous);
        assert_eq!(state.is_expired, state.remaining_secs == 0);
        assert_invariants(state, w);
        previous = state.remaining_secs;
    }
    assert!(tracker.state().is_expired);
}

#[test]
fn tick_after_expiry_is_noop() {
    let w = SessionWindow::new(2, 1).expect("valid window");
    let mut tracker = InactivityTracker::initialize(w);
    tracker.tick();
    let expired = tracker.tick();
    assert!(expired.is_expired);
    assert_eq!(tracker.tick(), expired);
}

#[test]
fn long_gap_removes_at_most_one_second() {
    let mut tracker = InactivityTracker::initialize(window());
    let state = tracker.tick_after(Duration::from_secs(600));
    assert_eq!(state.remaining_secs, 1799);
}

#[test]
fn sub_second_ticks_accumulate() {
    let mut tracker = InactivityTracker::initialize(window());
    assert_eq!(tracker.tick_after(Duration::from_millis(400)).remaining_secs, 1800);
    assert_eq!(tracker.tick_after(Duration::from_millis(400)).remaining_secs, 1800);
    assert_eq!(tracker.tick_after(Duration::from_millis(400)).remaining_secs, 1799);
    // 200ms carried over; another 800ms completes the next second.
    assert_eq!(tracker.tick_after(Duration::from_millis(800)).remaining_secs, 1798);
}

#[test]
fn advance_keeps_pace_with_slower_timer() {
    let mut tracker = InactivityTracker::initialize(window());
    let period = Duration::from_secs(2);
    for _ in 0..30 {
        tracker.advance(period, period);
    }
    assert_eq!(tracker.state().remaining_secs, 1740);

    // A suspended host still only loses one period per call.
    assert_eq!(tracker.advance(Duration::from_secs(600), period).remaining_secs, 1738);
}

#[test]
fn advance_with_sub_second_period_caps_at_one_second() {
    let mut tracker = InactivityTracker::initialize(window());
    let period = Duration::from_millis(250);
    assert_eq!(tracker.advance(Duration::from_secs(5), period).remaining_secs, 1799);
}

// =========================================================================
// renew
// =========================================================================

#[test]
fn renew_from_warning_resets_window() {
    let mut tracker = InactivityTracker::initialize(window());
    for _ in 0..1600 {
        tracker.tick();
    }
    assert_eq!(tracker.state().remaining_secs, 200);
    assert!(tracker.state().is_warning_active);

    assert_eq!(
        tracker.renew(),
        TrackerState { remaining_secs: 1800, is_warning_active: false, is_expired: false }
    );
}

#[test]
fn renew_recovers_from_any_state() {
    let mut tracker = InactivityTracker::initialize(window());
    tracker.expire();
    assert_eq!(tracker.renew().remaining_secs, 1800);
    assert_eq!(tracker.phase(), SessionPhase::Active);

    // Idempotent.
    let once = tracker.renew();
    assert_eq!(tracker.renew(), once);
}

// =========================================================================
// resynchronize
// =========================================================================

#[test]
fn resync_with_past_expiry_expires_immediately() {
    let mut tracker = InactivityTracker::initialize(window());
    for _ in 0..1300 {
        tracker.tick();
    }
    assert_eq!(tracker.state().remaining_secs, 500);

    let now = epoch();
    let snapshot = ServerSessionSnapshot { expires_at: now - Duration::from_secs(10) };
    let state = tracker.resynchronize(&snapshot, now);
    assert_eq!(state.remaining_secs, 0);
    assert!(state.is_expired);
    assert!(!state.is_warning_active);
}

#[test]
fn resync_can_raise_remaining_out_of_warning() {
    let mut tracker = InactivityTracker::initialize(window());
    for _ in 0..1700 {
        tracker.tick();
    }
    assert_eq!(tracker.phase(), SessionPhase::Warning);

    let now = epoch();
    let snapshot = ServerSessionSnapshot { expires_at: now + Duration::from_secs(900) };
    let state = tracker.resynchronize(&snapshot, now);
    assert_eq!(state.remaining_secs, 900);
    assert_eq!(state.phase(), SessionPhase::Active);
}

#[test]
fn resync_can_lower_remaining_into_warning() {
    let mut tracker = InactivityTracker::initialize(window());
    let now = epoch();
    let snapshot = ServerSessionSnapshot { expires_at: now + Duration::from_secs(120) };
    let state = tracker.resynchronize(&snapshot, now);
    assert_eq!(state, TrackerState { remaining_secs: 120, is_warning_active: true, is_expired: false });
}

#[test]
fn resync_counts_a_partial_second_as_remaining() {
    let mut tracker = InactivityTracker::initialize(window());
    let now = epoch();
    let snapshot = ServerSessionSnapshot { expires_at: now + Duration::from_millis(400) };
    let state = tracker.resynchronize(&snapshot, now);
    assert_eq!(state.remaining_secs, 1);
    assert!(state.is_warning_active);
    assert!(!state.is_expired);
}

#[test]
fn resync_after_expiry_is_ignored() {
    let mut tracker = InactivityTracker::initialize(window());
    tracker.expire();
    let now = epoch();
    let snapshot = ServerSessionSnapshot { expires_at: now + Duration::from_secs(900) };
    assert!(tracker.resynchronize(&snapshot, now).is_expired);
}

#[test]
fn resync_discards_tick_carry() {
    let mut tracker = InactivityTracker::initialize(window());
    tracker.tick_after(Duration::from_millis(900));
    let now = epoch();
    tracker.resynchronize(&ServerSessionSnapshot { expires_at: now + Duration::from_secs(100) }, now);
    assert_eq!(tracker.tick_after(Duration::from_millis(200)).remaining_secs, 100);
}

// =========================================================================
// expire
// =========================================================================

#[test]
fn expire_sets_terminal_state() {
    let mut tracker = InactivityTracker::initialize(window());
    let state = tracker.expire();
    assert_eq!(state, TrackerState { remaining_secs: 0, is_warning_active: false, is_expired: true });
    assert_eq!(tracker.phase(), SessionPhase::Expired);
}
