//! Admin session inactivity tracking and renewal.
//!
//! SYSTEM CONTEXT
//! ==============
//! The admin panel logs users out after a fixed period without renewal.
//! This crate keeps a local countdown for that session, warns before it
//! runs out, re-checks the real expiry with the auth service, and extends
//! the session on request. Rendering is left to whoever consumes the
//! [`session::SessionEvent`] stream.
//!
//! LAYOUT
//! ======
//! - [`tracker`]: pure countdown state machine
//! - [`clock`]: wall-clock source for resynchronization
//! - [`net`]: HTTP calls to the auth and comment endpoints
//! - [`scheduler`]: cancellable repeating tasks
//! - [`session`]: the monitor tying the above together
//! - [`countdown`]: chip text and tone helpers

pub mod clock;
pub mod config;
pub mod countdown;
pub mod error;
pub mod net;
pub mod scheduler;
pub mod session;
pub mod tracker;

pub use error::SessionError;
pub use session::{ExpiryReason, LOGIN_ROUTE, SessionEvent, SessionHandle, spawn_session_monitor};
pub use tracker::{InactivityTracker, ServerSessionSnapshot, SessionPhase, SessionWindow, TrackerState};
