//! Network access to the admin authentication boundary.
//!
//! DESIGN
//! ======
//! The monitor only depends on [`SessionApi`]; [`http::AdminClient`] is the
//! production implementation and tests substitute scripted mocks.

pub mod http;
pub mod types;

pub use http::AdminClient;
pub use types::DeleteCommentResponse;

use crate::error::SessionError;
use crate::tracker::ServerSessionSnapshot;

/// The two calls the session monitor makes against the auth service.
#[async_trait::async_trait]
pub trait SessionApi: Send + Sync {
    /// One round trip to read the current session expiry.
    ///
    /// # Errors
    ///
    /// [`SessionError::AuthExpired`] when the server says the session is
    /// gone; any other error is transient.
    async fn fetch_status(&self) -> Result<ServerSessionSnapshot, SessionError>;

    /// Ask the server to extend the session.
    ///
    /// # Errors
    ///
    /// Any error leaves the local countdown untouched.
    async fn extend_session(&self) -> Result<(), SessionError>;
}
