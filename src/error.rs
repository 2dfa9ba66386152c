//! Session error taxonomy.
//!
//! ERROR HANDLING
//! ==============
//! Three outcomes matter to callers: transient network trouble (the next
//! scheduled poll retries), authoritative loss of the session (expire and
//! navigate immediately), and a rejected renewal (surface it, change nothing).
//! Everything else is a local setup problem reported once at startup.

#[cfg(test)]
#[path = "error_test.rs"]
mod error_test;

/// Errors produced by session tracking, polling, and renewal.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// The request never produced a usable HTTP response.
    #[error("network failure: {0}")]
    NetworkFailure(String),

    /// The authentication service answered 401.
    #[error("session is no longer authenticated")]
    AuthExpired,

    /// The extend-session endpoint answered with a non-success status.
    #[error("session renewal rejected: status {status}: {message}")]
    RenewalRejected { status: u16, message: String },

    /// An extend-session request is already pending.
    #[error("session renewal already in flight")]
    RenewalInFlight,

    /// A response body or timestamp could not be parsed.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// The warning threshold / total timeout pair is not usable.
    #[error("invalid session window: {0}")]
    InvalidWindow(String),

    /// A configuration value could not be parsed.
    #[error("config parse failed: {0}")]
    Config(String),

    /// The underlying HTTP client could not be constructed.
    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),

    /// The session monitor task has already exited.
    #[error("session monitor stopped")]
    MonitorStopped,
}

impl SessionError {
    /// Stable machine-readable code for logs and the CLI.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NetworkFailure(_) => "E_NETWORK",
            Self::AuthExpired => "E_AUTH_EXPIRED",
            Self::RenewalRejected { .. } => "E_RENEWAL_REJECTED",
            Self::RenewalInFlight => "E_RENEWAL_IN_FLIGHT",
            Self::InvalidResponse(_) => "E_INVALID_RESPONSE",
            Self::InvalidWindow(_) => "E_INVALID_WINDOW",
            Self::Config(_) => "E_CONFIG_PARSE",
            Self::HttpClientBuild(_) => "E_HTTP_CLIENT_BUILD",
            Self::MonitorStopped => "E_MONITOR_STOPPED",
        }
    }

    /// Whether the next scheduled poll may succeed where this one failed.
    #[must_use]
    pub fn retryable(&self) -> bool {
        matches!(self, Self::NetworkFailure(_) | Self::InvalidResponse(_))
    }
}
