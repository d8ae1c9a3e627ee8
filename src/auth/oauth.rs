//! Google OAuth flow
//!
//! Implements the OAuth 2.0 authorization code flow with Google.
//! The callback handler is the only place that translates exchange
//! failures into user-visible behavior (a redirect back to the
//! landing page); store failures keep their error responses.

use axum::{
    Router,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Deserialize;
use std::time::Instant;

use super::session::random_token;
use crate::AppState;
use crate::data::User;
use crate::error::AppError;

/// Cookie carrying the session token
pub const SESSION_COOKIE: &str = "session";

/// Cookie carrying the CSRF state between redirect and callback
const STATE_COOKIE: &str = "oauth_state";

/// CSRF state cookie lifetime; the consent screen round trip should
/// finish well within this.
const STATE_MAX_AGE_SECS: i64 = 600;

/// Create authentication router
///
/// Routes:
/// - GET /auth/google - Redirect to Google's consent screen
/// - GET /auth/google/callback - OAuth callback
/// - POST /logout - Logout
pub fn auth_router() -> Router<AppState> {
    Router::new()
        .route("/auth/google", get(google_redirect))
        .route("/auth/google/callback", get(google_callback))
        .route("/logout", post(logout))
}

// =============================================================================
// Consent redirect
// =============================================================================

/// GET /auth/google
///
/// Redirects user to Google's authorization page.
///
/// # Steps
/// 1. Generate CSRF state token
/// 2. Store state in cookie
/// 3. Redirect to Google with client_id, redirect_uri, scope, state
async fn google_redirect(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<impl IntoResponse, AppError> {
    let google = &state.config.auth.google;
    let csrf_state = random_token();

    let mut authorize_url = url::Url::parse(&google.authorize_url)
        .map_err(|e| AppError::Config(format!("invalid authorize_url: {e}")))?;
    authorize_url
        .query_pairs_mut()
        .append_pair("client_id", &google.client_id)
        .append_pair("redirect_uri", &state.config.oauth_redirect_uri())
        .append_pair("response_type", "code")
        .append_pair("scope", &google.scopes.join(" "))
        .append_pair("state", &csrf_state);

    let state_cookie = Cookie::build((STATE_COOKIE, csrf_state))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(state.config.should_use_secure_cookies())
        .max_age(time::Duration::seconds(STATE_MAX_AGE_SECS))
        .build();

    Ok((jar.add(state_cookie), Redirect::to(authorize_url.as_str())))
}

// =============================================================================
// Callback
// =============================================================================

/// Query parameters from the Google callback
#[derive(Debug, Deserialize)]
struct GoogleCallbackQuery {
    /// Authorization code (absent when the user denied consent)
    code: Option<String>,
    /// CSRF state token
    state: Option<String>,
    /// Provider error indicator (e.g., "access_denied")
    error: Option<String>,
}

/// Google token endpoint response
#[derive(Debug, Deserialize)]
struct GoogleTokenResponse {
    access_token: String,
}

/// Google userinfo payload
///
/// `sub` is the stable provider-assigned subject id; a payload
/// without one is malformed and fails the exchange.
#[derive(Debug, Deserialize)]
struct GoogleProfile {
    sub: String,
    name: Option<String>,
}

/// GET /auth/google/callback
///
/// Handles OAuth callback from Google.
///
/// # Steps
/// 1. Verify CSRF state
/// 2. Exchange code for access token
/// 3. Fetch user profile from Google
/// 4. Look up or create the user record
/// 5. Establish session and set cookie
/// 6. Redirect to /profile
///
/// Exchange failures redirect to the landing page instead; no record
/// is written and no session is established.
async fn google_callback(
    State(state): State<AppState>,
    Query(query): Query<GoogleCallbackQuery>,
    jar: CookieJar,
) -> Result<Response, AppError> {
    // 1. Verify CSRF state before touching anything else
    let cookie_state = jar
        .get(STATE_COOKIE)
        .map(|cookie| cookie.value().to_owned())
        .ok_or(AppError::Unauthorized)?;
    let jar = jar.remove(Cookie::build((STATE_COOKIE, "")).path("/").build());

    if query.state.as_deref() != Some(cookie_state.as_str()) {
        return Err(AppError::Unauthorized);
    }

    if let Some(provider_error) = &query.error {
        tracing::warn!(error = %provider_error, "Provider reported an authorization error");
        crate::metrics::SIGN_INS_TOTAL.with_label_values(&["failure"]).inc();
        return Ok((jar, Redirect::to("/")).into_response());
    }

    let Some(code) = query.code else {
        tracing::warn!("Callback arrived without an authorization code");
        crate::metrics::SIGN_INS_TOTAL.with_label_values(&["failure"]).inc();
        return Ok((jar, Redirect::to("/")).into_response());
    };

    // 2-4. Exchange the code and resolve the local user record. The
    // record write is acknowledged before any session exists, so a
    // partial completion surfaces as a failure, never a half-login.
    let user = match authenticate(&state, &code).await {
        Ok(user) => user,
        Err(AppError::AuthExchange(reason)) => {
            tracing::warn!(%reason, "Authorization exchange failed");
            crate::metrics::SIGN_INS_TOTAL.with_label_values(&["failure"]).inc();
            return Ok((jar, Redirect::to("/")).into_response());
        }
        Err(other) => return Err(other),
    };

    // 5. Establish session and deliver the token
    let token = state.sessions.establish(&user.provider_id).await;
    let session_cookie = Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(state.config.should_use_secure_cookies())
        .max_age(time::Duration::seconds(state.config.auth.session_max_age))
        .build();

    tracing::info!(provider_id = %user.provider_id, "Sign-in completed");
    crate::metrics::SIGN_INS_TOTAL.with_label_values(&["success"]).inc();

    // 6. Redirect to the profile page
    Ok((jar.add(session_cookie), Redirect::to("/profile")).into_response())
}

/// Exchange the authorization code and resolve the local user
///
/// Re-authentication of a known subject returns the stored record
/// untouched; the fresh profile's display name is intentionally
/// discarded. A lost duplicate-insert race resolves to the winner's
/// record, so concurrent first sign-ins both succeed.
async fn authenticate(state: &AppState, code: &str) -> Result<User, AppError> {
    let started = Instant::now();
    let access_token = exchange_code(state, code).await?;
    let profile = fetch_profile(state, &access_token).await?;
    crate::metrics::OAUTH_EXCHANGE_DURATION_SECONDS.observe(started.elapsed().as_secs_f64());

    if let Some(existing) = state.users.find_user_by_provider_id(&profile.sub).await? {
        return Ok(existing);
    }

    let user = User::from_profile(profile.sub.clone(), profile.name.clone());
    match state.users.create_user(&user).await {
        Ok(()) => {
            tracing::info!(provider_id = %user.provider_id, "User record created");
            Ok(user)
        }
        Err(AppError::DuplicateIdentity(_)) => state
            .users
            .find_user_by_provider_id(&profile.sub)
            .await?
            .ok_or_else(|| {
                AppError::Internal(anyhow::anyhow!(
                    "user record vanished after duplicate insert"
                ))
            }),
        Err(other) => Err(other),
    }
}

/// POST the token endpoint with the authorization code
async fn exchange_code(state: &AppState, code: &str) -> Result<String, AppError> {
    let google = &state.config.auth.google;
    let redirect_uri = state.config.oauth_redirect_uri();

    let response = state
        .http_client
        .post(&google.token_url)
        .form(&[
            ("grant_type", "authorization_code"),
            ("code", code),
            ("client_id", google.client_id.as_str()),
            ("client_secret", google.client_secret.as_str()),
            ("redirect_uri", redirect_uri.as_str()),
        ])
        .send()
        .await
        .map_err(|e| AppError::AuthExchange(format!("token request failed: {e}")))?;

    if !response.status().is_success() {
        return Err(AppError::AuthExchange(format!(
            "token endpoint returned {}",
            response.status()
        )));
    }

    let token: GoogleTokenResponse = response
        .json()
        .await
        .map_err(|e| AppError::AuthExchange(format!("malformed token response: {e}")))?;

    Ok(token.access_token)
}

/// GET the userinfo endpoint with the access token
async fn fetch_profile(state: &AppState, access_token: &str) -> Result<GoogleProfile, AppError> {
    let google = &state.config.auth.google;

    let response = state
        .http_client
        .get(&google.userinfo_url)
        .bearer_auth(access_token)
        .send()
        .await
        .map_err(|e| AppError::AuthExchange(format!("userinfo request failed: {e}")))?;

    if !response.status().is_success() {
        return Err(AppError::AuthExchange(format!(
            "userinfo endpoint returned {}",
            response.status()
        )));
    }

    response
        .json()
        .await
        .map_err(|e| AppError::AuthExchange(format!("malformed profile payload: {e}")))
}

// =============================================================================
// Logout
// =============================================================================

/// POST /logout
///
/// Invalidates the session and clears its cookie.
async fn logout(State(state): State<AppState>, jar: CookieJar) -> impl IntoResponse {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        state.sessions.invalidate(cookie.value()).await;
    }

    let jar = jar.remove(Cookie::build((SESSION_COOKIE, "")).path("/").build());
    (jar, Redirect::to("/"))
}
