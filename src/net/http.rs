//! reqwest-backed client for the admin auth and comment endpoints.
//!
//! ERROR HANDLING
//! ==============
//! A 401 from any endpoint maps to [`SessionError::AuthExpired`] so callers
//! can treat it as authoritative. Transport failures and other statuses stay
//! distinguishable: the status poller retries them on its next cycle, the
//! renewal path reports them to the user.

#[cfg(test)]
#[path = "http_test.rs"]
mod http_test;

use std::time::Duration;

use reqwest::StatusCode;
use reqwest::header::{ACCEPT, COOKIE, HeaderMap, HeaderValue};
use tracing::{debug, warn};

use super::SessionApi;
use super::types::{DeleteCommentResponse, parse_status_body};
use crate::config::MonitorConfig;
use crate::error::SessionError;
use crate::tracker::ServerSessionSnapshot;

pub const STATUS_PATH: &str = "/admin/auth/status";
pub const EXTEND_SESSION_PATH: &str = "/admin/auth/extend-session";

const CSRF_HEADER: &str = "x-csrf-token";
const REQUESTED_WITH_HEADER: &str = "x-requested-with";

fn comment_path(comment_id: u64) -> String {
    format!("/comments/{comment_id}")
}

/// HTTP client bound to one admin backend and one session cookie.
#[derive(Debug, Clone)]
pub struct AdminClient {
    http: reqwest::Client,
    base_url: String,
}

impl AdminClient {
    /// Build a client from config.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::HttpClientBuild`] if a header value is invalid
    /// or the TLS backend cannot be initialised.
    pub fn new(config: &MonitorConfig) -> Result<Self, SessionError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        // Makes the backend answer 401 instead of redirecting to the login page.
        headers.insert(REQUESTED_WITH_HEADER, HeaderValue::from_static("XMLHttpRequest"));
        if let Some(cookie) = &config.session_cookie {
            headers.insert(COOKIE, header_value(cookie)?);
        }
        if let Some(token) = &config.csrf_token {
            headers.insert(CSRF_HEADER, header_value(token)?);
        }

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeouts.request_secs))
            .connect_timeout(Duration::from_secs(config.timeouts.connect_secs))
            .build()
            .map_err(|e| SessionError::HttpClientBuild(e.to_string()))?;
        Ok(Self { http, base_url: config.base_url.trim_end_matches('/').to_string() })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// `GET /admin/auth/status`.
    ///
    /// # Errors
    ///
    /// [`SessionError::AuthExpired`] on 401, [`SessionError::NetworkFailure`]
    /// on transport errors or other non-2xx statuses,
    /// [`SessionError::InvalidResponse`] on an unreadable body.
    pub async fn fetch_status(&self) -> Result<ServerSessionSnapshot, SessionError> {
        let response = self
            .http
            .get(self.url(STATUS_PATH))
            .send()
            .await
            .map_err(|e| SessionError::NetworkFailure(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(SessionError::AuthExpired);
        }
        let text = response
            .text()
            .await
            .map_err(|e| SessionError::NetworkFailure(e.to_string()))?;
        if !status.is_success() {
            warn!(status = status.as_u16(), "session status request failed");
            return Err(SessionError::NetworkFailure(format!("status request failed: {}", status.as_u16())));
        }
        let snapshot = parse_status_body(&text)?;
        debug!(expires_at = %snapshot.expires_at, "session status fetched");
        Ok(snapshot)
    }

    /// `POST /admin/auth/extend-session`.
    ///
    /// # Errors
    ///
    /// [`SessionError::AuthExpired`] on 401, [`SessionError::RenewalRejected`]
    /// on any other non-2xx status, [`SessionError::NetworkFailure`] when no
    /// response arrived.
    pub async fn extend_session(&self) -> Result<(), SessionError> {
        let response = self
            .http
            .post(self.url(EXTEND_SESSION_PATH))
            .send()
            .await
            .map_err(|e| SessionError::NetworkFailure(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        if status == StatusCode::UNAUTHORIZED {
            return Err(SessionError::AuthExpired);
        }
        let body = response.text().await.unwrap_or_default();
        Err(SessionError::RenewalRejected { status: status.as_u16(), message: rejection_message(status, &body) })
    }

    /// `DELETE /comments/{id}`. A `success: false` body is returned as data.
    ///
    /// # Errors
    ///
    /// [`SessionError::AuthExpired`] on 401, [`SessionError::NetworkFailure`]
    /// on transport errors, [`SessionError::InvalidResponse`] when the body is
    /// not the expected JSON.
    pub async fn delete_comment(&self, comment_id: u64) -> Result<DeleteCommentResponse, SessionError> {
        let response = self
            .http
            .delete(self.url(&comment_path(comment_id)))
            .send()
            .await
            .map_err(|e| SessionError::NetworkFailure(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(SessionError::AuthExpired);
        }
        let text = response
            .text()
            .await
            .map_err(|e| SessionError::NetworkFailure(e.to_string()))?;
        serde_json::from_str::<DeleteCommentResponse>(&text).map_err(|e| {
            SessionError::InvalidResponse(format!("delete comment {comment_id} (status {}): {e}", status.as_u16()))
        })
    }
}

#[async_trait::async_trait]
impl SessionApi for AdminClient {
    async fn fetch_status(&self) -> Result<ServerSessionSnapshot, SessionError> {
        AdminClient::fetch_status(self).await
    }

    async fn extend_session(&self) -> Result<(), SessionError> {
        AdminClient::extend_session(self).await
    }
}

fn header_value(raw: &str) -> Result<HeaderValue, SessionError> {
    HeaderValue::from_str(raw).map_err(|e| SessionError::HttpClientBuild(format!("invalid header value: {e}")))
}

/// Prefer the backend's `message` field, then the raw body, then the reason phrase.
fn rejection_message(status: StatusCode, body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        if let Some(message) = value.get("message").and_then(serde_json::Value::as_str) {
            return message.to_string();
        }
    }
    let trimmed = body.trim();
    if !trimmed.is_empty() {
        return trimmed.to_string();
    }
    status.canonical_reason().unwrap_or("renewal failed").to_string()
}
