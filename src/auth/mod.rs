//! Google OAuth authentication
//!
//! Handles:
//! - Google OAuth flow
//! - Session management
//! - Authentication middleware

mod middleware;
mod oauth;
pub mod session;

pub use middleware::{CurrentUser, require_auth};
pub use oauth::{SESSION_COOKIE, auth_router};
pub use session::SessionStore;
