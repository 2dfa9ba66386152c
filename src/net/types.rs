//! Wire types for the admin auth and comment endpoints.

#[cfg(test)]
#[path = "types_test.rs"]
mod types_test;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use time::format_description::well_known::{Iso8601, Rfc3339};

use crate::error::SessionError;
use crate::tracker::ServerSessionSnapshot;

/// Body of `GET /admin/auth/status`.
#[derive(Debug, Clone, Deserialize)]
pub struct StatusResponse {
    pub session: SessionBody,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionBody {
    pub expires_at: String,
}

/// Body of `DELETE /comments/{id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteCommentResponse {
    pub success: bool,
    #[serde(default)]
    pub message: String,
}

/// Parse a status body into a snapshot.
///
/// # Errors
///
/// Returns [`SessionError::InvalidResponse`] if the JSON shape or the
/// timestamp is not understood.
pub fn parse_status_body(text: &str) -> Result<ServerSessionSnapshot, SessionError> {
    let body: StatusResponse =
        serde_json::from_str(text).map_err(|e| SessionError::InvalidResponse(format!("status body: {e}")))?;
    let expires_at = parse_timestamp(&body.session.expires_at)?;
    Ok(ServerSessionSnapshot { expires_at })
}

/// Parse an RFC 3339 timestamp, falling back to general ISO 8601.
///
/// # Errors
///
/// Returns [`SessionError::InvalidResponse`] if neither format matches.
pub fn parse_timestamp(raw: &str) -> Result<OffsetDateTime, SessionError> {
    let raw = raw.trim();
    OffsetDateTime::parse(raw, &Rfc3339)
        .or_else(|_| OffsetDateTime::parse(raw, &Iso8601::DEFAULT))
        .map_err(|e| SessionError::InvalidResponse(format!("expires_at {raw:?}: {e}")))
}
