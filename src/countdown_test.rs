use super::*;

fn state(remaining_secs: u32, is_warning_active: bool, is_expired: bool) -> TrackerState {
    TrackerState { remaining_secs, is_warning_active, is_expired }
}

#[test]
fn formats_minutes_and_seconds() {
    assert_eq!(format_countdown(0), "00:00");
    assert_eq!(format_countdown(59), "00:59");
    assert_eq!(format_countdown(299), "04:59");
    assert_eq!(format_countdown(1800), "30:00");
}

#[test]
fn formats_past_an_hour_without_wrapping() {
    assert_eq!(format_countdown(3725), "62:05");
}

#[test]
fn tone_tracks_warning_and_critical_ranges() {
    assert_eq!(CountdownTone::for_state(&state(1200, false, false)), CountdownTone::Normal);
    assert_eq!(CountdownTone::for_state(&state(240, true, false)), CountdownTone::Warning);
    assert_eq!(CountdownTone::for_state(&state(59, true, false)), CountdownTone::Critical);
    assert_eq!(CountdownTone::for_state(&state(0, false, true)), CountdownTone::Critical);
}
