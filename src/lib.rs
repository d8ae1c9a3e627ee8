//! Porchlight - a small Google sign-in web service
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      API Layer (Axum)                       │
//! │  - OAuth redirect and callback endpoints                    │
//! │  - Profile page, static client assets                       │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Auth Layer                              │
//! │  - Google code exchange (reqwest)                           │
//! │  - Server-side session store                                │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Data Layer                             │
//! │  - SQLite user store (sqlx)                                 │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - `api`: profile page and metrics endpoint
//! - `auth`: Google OAuth flow, sessions, auth middleware
//! - `data`: user store
//! - `config`: configuration management
//! - `error`: error types

pub mod api;
pub mod auth;
pub mod config;
pub mod data;
pub mod error;
pub mod metrics;

use std::sync::Arc;

/// Application state shared across all handlers
///
/// Constructed once at startup and cloned for each request; the
/// session store and identity verifier are owned here rather than
/// living as process-wide singletons.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<config::AppConfig>,

    /// User record store
    pub users: Arc<data::UserStore>,

    /// Server-side session store
    pub sessions: Arc<auth::SessionStore>,

    /// HTTP client for the provider exchange
    pub http_client: Arc<reqwest::Client>,
}

impl AppState {
    /// Initialize application state
    ///
    /// # Steps
    /// 1. Connect to SQLite database
    /// 2. Create the session store
    /// 3. Build the outbound HTTP client
    ///
    /// # Errors
    /// Returns error if any initialization step fails; the caller
    /// must not start accepting connections in that case.
    pub async fn new(config: config::AppConfig) -> Result<Self, error::AppError> {
        tracing::info!("Initializing application state...");

        // 1. Connect to SQLite database
        let users = data::UserStore::connect(&config.database.path).await?;
        tracing::info!("Database connected");

        // 2. Create session store
        let sessions = auth::SessionStore::new(config.auth.session_max_age);

        // 3. Build HTTP client. The timeout bounds the provider
        // exchange so a hung token endpoint cannot pin a request.
        let http_client = reqwest::Client::builder()
            .user_agent("Porchlight/0.1.0")
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| error::AppError::Internal(e.into()))?;

        tracing::info!("Application state initialized successfully");

        Ok(Self {
            config: Arc::new(config),
            users: Arc::new(users),
            sessions: Arc::new(sessions),
            http_client: Arc::new(http_client),
        })
    }
}

/// Build the Axum router with all routes.
///
/// This is shared by the binary and integration tests to keep route
/// composition consistent across environments.
pub fn build_router(state: AppState) -> axum::Router {
    use axum::Router;
    use tower_http::{compression::CompressionLayer, services::ServeDir, trace::TraceLayer};

    let cors_layer = build_cors_layer(&state.config.server);

    let metrics_routes = api::metrics_router().route_layer(
        axum::middleware::from_fn_with_state(state.clone(), auth::require_auth),
    );

    Router::new()
        .route("/health", axum::routing::get(health_check))
        .merge(auth::auth_router())
        .merge(api::pages_router())
        .merge(metrics_routes)
        .fallback_service(ServeDir::new(&state.config.server.static_dir))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer)
        .with_state(state)
}

fn build_cors_layer(server: &config::ServerConfig) -> tower_http::cors::CorsLayer {
    use axum::http::HeaderValue;
    use tower_http::cors::{Any, CorsLayer};

    if !server.protocol.eq_ignore_ascii_case("https") {
        return CorsLayer::permissive();
    }

    let allowed_origin = server.base_url();
    match HeaderValue::from_str(&allowed_origin) {
        Ok(origin) => CorsLayer::new()
            .allow_origin([origin])
            .allow_methods(Any)
            .allow_headers(Any),
        Err(error) => {
            tracing::error!(
                %error,
                origin = %allowed_origin,
                "Failed to parse CORS origin from server base URL; denying cross-origin requests"
            );
            CorsLayer::new().allow_methods(Any).allow_headers(Any)
        }
    }
}

async fn health_check() -> &'static str {
    "OK"
}
