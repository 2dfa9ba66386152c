//! Runtime configuration parsed from environment variables.
//!
//! The session window itself is a compile-time policy (see
//! [`crate::tracker::SessionWindow::admin_default`]); only transport and
//! scheduling knobs live here.

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;

use std::time::Duration;

use crate::error::SessionError;

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:3000";
pub const DEFAULT_STATUS_POLL_SECS: u64 = 30;
pub const DEFAULT_TICK_MILLIS: u64 = 1000;
/// The countdown is displayed per second; a slower tick would skip values.
pub const MAX_TICK_MILLIS: u64 = 1000;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpTimeouts {
    pub request_secs: u64,
    pub connect_secs: u64,
}

impl Default for HttpTimeouts {
    fn default() -> Self {
        Self { request_secs: DEFAULT_REQUEST_TIMEOUT_SECS, connect_secs: DEFAULT_CONNECT_TIMEOUT_SECS }
    }
}

/// Everything needed to talk to the admin backend and pace the monitor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorConfig {
    pub base_url: String,
    /// Raw `Cookie` header value carrying the admin session.
    pub session_cookie: Option<String>,
    /// Sent as `X-CSRF-TOKEN` on state-changing requests.
    pub csrf_token: Option<String>,
    pub timeouts: HttpTimeouts,
    pub status_poll_secs: u64,
    pub tick_millis: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            session_cookie: None,
            csrf_token: None,
            timeouts: HttpTimeouts::default(),
            status_poll_secs: DEFAULT_STATUS_POLL_SECS,
            tick_millis: DEFAULT_TICK_MILLIS,
        }
    }
}

impl MonitorConfig {
    /// Build config from environment variables.
    ///
    /// Optional:
    /// - `ADMIN_BASE_URL`: default `http://127.0.0.1:3000`
    /// - `ADMIN_SESSION_COOKIE`: raw cookie header value
    /// - `ADMIN_CSRF_TOKEN`: CSRF token for POST requests
    /// - `ADMIN_STATUS_POLL_SECS`: default 30
    /// - `ADMIN_TICK_MILLIS`: default 1000
    /// - `ADMIN_REQUEST_TIMEOUT_SECS`: default 10
    /// - `ADMIN_CONNECT_TIMEOUT_SECS`: default 5
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Config`] if a poll or tick interval is zero.
    pub fn from_env() -> Result<Self, SessionError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`MonitorConfig::from_env`] with an injectable variable source.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Config`] if a poll or tick interval is zero.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, SessionError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let base_url = lookup("ADMIN_BASE_URL")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let config = Self {
            base_url: normalize_base_url(&base_url),
            session_cookie: non_empty(lookup("ADMIN_SESSION_COOKIE")),
            csrf_token: non_empty(lookup("ADMIN_CSRF_TOKEN")),
            timeouts: HttpTimeouts {
                request_secs: parse_or(&lookup, "ADMIN_REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS),
                connect_secs: parse_or(&lookup, "ADMIN_CONNECT_TIMEOUT_SECS", DEFAULT_CONNECT_TIMEOUT_SECS),
            },
            status_poll_secs: parse_or(&lookup, "ADMIN_STATUS_POLL_SECS", DEFAULT_STATUS_POLL_SECS),
            tick_millis: parse_or(&lookup, "ADMIN_TICK_MILLIS", DEFAULT_TICK_MILLIS),
        };
        config.validate()?;
        Ok(config)
    }

    /// Replace the base URL, trimming any trailing slash.
    #[must_use]
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = normalize_base_url(base_url);
        self
    }

    /// Reject intervals the scheduler cannot run.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Config`] naming the offending setting.
    pub fn validate(&self) -> Result<(), SessionError> {
        if self.status_poll_secs == 0 {
            return Err(SessionError::Config("ADMIN_STATUS_POLL_SECS must be positive".into()));
        }
        if self.tick_millis == 0 || self.tick_millis > MAX_TICK_MILLIS {
            return Err(SessionError::Config(format!(
                "ADMIN_TICK_MILLIS must be between 1 and {MAX_TICK_MILLIS}"
            )));
        }
        Ok(())
    }

    #[must_use]
    pub fn timing(&self) -> MonitorTiming {
        MonitorTiming {
            tick_interval: Duration::from_millis(self.tick_millis),
            status_poll_interval: Duration::from_secs(self.status_poll_secs),
            poll_on_start: true,
        }
    }
}

/// Cadence of the two repeating timers driving a session monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorTiming {
    pub tick_interval: Duration,
    pub status_poll_interval: Duration,
    /// Resynchronize against the server as soon as the monitor starts.
    pub poll_on_start: bool,
}

impl Default for MonitorTiming {
    fn default() -> Self {
        MonitorConfig::default().timing()
    }
}

fn normalize_base_url(raw: &str) -> String {
    raw.trim().trim_end_matches('/').to_string()
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn parse_or<F>(lookup: &F, key: &str, default: u64) -> u64
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(default)
}
