//! Authenticated pages

use axum::{Router, routing::get};

use crate::AppState;
use crate::auth::CurrentUser;

/// GET /profile
///
/// Greets the signed-in user by the display name stored on first
/// sign-in. Requests without a session are rejected by the extractor.
async fn profile(CurrentUser(user): CurrentUser) -> String {
    match user.display_name {
        Some(name) => format!("Welcome to your profile, {name}!"),
        None => "Welcome to your profile!".to_string(),
    }
}

/// Create pages router
pub fn pages_router() -> Router<AppState> {
    Router::new().route("/profile", get(profile))
}
