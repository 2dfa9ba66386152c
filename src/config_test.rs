use super::*;
use std::collections::HashMap;

fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> + use<> {
    let vars: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect();
    move |key: &str| vars.get(key).cloned()
}

#[test]
fn from_lookup_uses_defaults() {
    let cfg = MonitorConfig::from_lookup(lookup_from(&[])).unwrap();
    assert_eq!(cfg, MonitorConfig::default());
    assert_eq!(cfg.base_url, DEFAULT_BASE_URL);
    assert_eq!(cfg.timing().status_poll_interval, Duration::from_secs(30));
    assert_eq!(cfg.timing().tick_interval, Duration::from_secs(1));
    assert!(cfg.timing().poll_on_start);
}

#[test]
fn from_lookup_parses_overrides() {
    let cfg = MonitorConfig::from_lookup(lookup_from(&[
        ("ADMIN_BASE_URL", "https://admin.example.test/"),
        ("ADMIN_SESSION_COOKIE", "laravel_session=abc"),
        ("ADMIN_CSRF_TOKEN", " tok "),
        ("ADMIN_STATUS_POLL_SECS", "15"),
        ("ADMIN_TICK_MILLIS", "250"),
        ("ADMIN_REQUEST_TIMEOUT_SECS", "42"),
        ("ADMIN_CONNECT_TIMEOUT_SECS", "7"),
    ]))
    .unwrap();

    assert_eq!(cfg.base_url, "https://admin.example.test");
    assert_eq!(cfg.session_cookie.as_deref(), Some("laravel_session=abc"));
    assert_eq!(cfg.csrf_token.as_deref(), Some("tok"));
    assert_eq!(cfg.status_poll_secs, 15);
    assert_eq!(cfg.tick_millis, 250);
    assert_eq!(cfg.timeouts, HttpTimeouts { request_secs: 42, connect_secs: 7 });
}

#[test]
fn from_lookup_ignores_unparseable_numbers() {
    let cfg = MonitorConfig::from_lookup(lookup_from(&[("ADMIN_STATUS_POLL_SECS", "soon")])).unwrap();
    assert_eq!(cfg.status_poll_secs, DEFAULT_STATUS_POLL_SECS);
}

#[test]
fn from_lookup_treats_blank_values_as_unset() {
    let cfg = MonitorConfig::from_lookup(lookup_from(&[("ADMIN_BASE_URL", "  "), ("ADMIN_SESSION_COOKIE", "")]))
        .unwrap();
    assert_eq!(cfg.base_url, DEFAULT_BASE_URL);
    assert!(cfg.session_cookie.is_none());
}

#[test]
fn from_lookup_rejects_zero_intervals() {
    let err = MonitorConfig::from_lookup(lookup_from(&[("ADMIN_STATUS_POLL_SECS", "0")])).unwrap_err();
    assert!(matches!(err, SessionError::Config(msg) if msg.contains("ADMIN_STATUS_POLL_SECS")));

    let err = MonitorConfig::from_lookup(lookup_from(&[("ADMIN_TICK_MILLIS", "0")])).unwrap_err();
    assert!(matches!(err, SessionError::Config(_)));
}

#[test]
fn from_lookup_rejects_tick_slower_than_one_second() {
    let err = MonitorConfig::from_lookup(lookup_from(&[("ADMIN_TICK_MILLIS", "2000")])).unwrap_err();
    assert!(matches!(err, SessionError::Config(msg) if msg.contains("ADMIN_TICK_MILLIS")));

    let cfg = MonitorConfig::from_lookup(lookup_from(&[("ADMIN_TICK_MILLIS", "1000")])).unwrap();
    assert_eq!(cfg.tick_millis, MAX_TICK_MILLIS);
}

#[test]
fn with_base_url_trims_trailing_slash() {
    let cfg = MonitorConfig::default().with_base_url("http://localhost:8000///");
    assert_eq!(cfg.base_url, "http://localhost:8000");
}
