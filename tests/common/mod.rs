//! Common test utilities for E2E tests

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use porchlight::{AppState, config, data};
use serde_json::json;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tokio::net::TcpListener;

// =============================================================================
// Mock provider
// =============================================================================

#[derive(Default)]
struct ProviderState {
    /// Profile returned from the userinfo endpoint: (sub, name)
    profile: Option<(String, Option<String>)>,
    /// When set, the token endpoint rejects every code
    reject_exchange: bool,
}

/// A stand-in for Google's token and userinfo endpoints
#[derive(Clone)]
pub struct MockGoogle {
    inner: Arc<Mutex<ProviderState>>,
    pub base_url: String,
}

impl MockGoogle {
    pub async fn spawn() -> Self {
        let inner = Arc::new(Mutex::new(ProviderState::default()));

        let app = Router::new()
            .route("/token", post(token_endpoint))
            .route("/userinfo", get(userinfo_endpoint))
            .with_state(Arc::clone(&inner));

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            inner,
            base_url: format!("http://{addr}"),
        }
    }

    /// Set the profile the provider reports after a successful exchange
    pub fn set_profile(&self, sub: &str, name: Option<&str>) {
        let mut state = self.inner.lock().unwrap();
        state.profile = Some((sub.to_string(), name.map(ToOwned::to_owned)));
        state.reject_exchange = false;
    }

    /// Make the token endpoint reject every authorization code
    pub fn reject_exchange(&self) {
        self.inner.lock().unwrap().reject_exchange = true;
    }
}

async fn token_endpoint(State(state): State<Arc<Mutex<ProviderState>>>) -> Response {
    if state.lock().unwrap().reject_exchange {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "invalid_grant"})),
        )
            .into_response();
    }

    Json(json!({
        "access_token": "mock-access-token",
        "token_type": "Bearer",
        "expires_in": 3600,
    }))
    .into_response()
}

async fn userinfo_endpoint(State(state): State<Arc<Mutex<ProviderState>>>) -> Response {
    let profile = state.lock().unwrap().profile.clone();
    match profile {
        Some((sub, name)) => Json(json!({"sub": sub, "name": name})).into_response(),
        None => StatusCode::UNAUTHORIZED.into_response(),
    }
}

// =============================================================================
// Test server
// =============================================================================

/// Test server instance
pub struct TestServer {
    pub addr: String,
    pub state: AppState,
    pub google: MockGoogle,
    pub client: reqwest::Client,
    pub _temp_dir: TempDir,
}

impl TestServer {
    /// Create a new test server instance
    pub async fn new() -> Self {
        // Create temporary directory for the database and static assets
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");

        let static_dir = temp_dir.path().join("client");
        std::fs::create_dir(&static_dir).unwrap();
        std::fs::write(
            static_dir.join("index.html"),
            "<h1>Porchlight</h1><a href=\"/auth/google\">Sign in with Google</a>",
        )
        .unwrap();

        // Spawn the mock provider and point the exchange at it
        let google = MockGoogle::spawn().await;

        // Create test configuration
        let config = config::AppConfig {
            server: config::ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0, // Let OS assign port
                domain: "localhost".to_string(),
                protocol: "http".to_string(),
                static_dir,
            },
            database: config::DatabaseConfig {
                path: db_path.clone(),
            },
            auth: config::AuthConfig {
                session_max_age: 604800,
                google: config::GoogleOAuthConfig {
                    client_id: "test-client-id".to_string(),
                    client_secret: "test-client-secret".to_string(),
                    authorize_url: "https://accounts.google.com/o/oauth2/v2/auth".to_string(),
                    token_url: format!("{}/token", google.base_url),
                    userinfo_url: format!("{}/userinfo", google.base_url),
                    scopes: vec![
                        "openid".to_string(),
                        "profile".to_string(),
                        "email".to_string(),
                    ],
                },
            },
            logging: config::LoggingConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
            },
        };

        // Initialize app state
        let state = AppState::new(config.clone()).await.unwrap();

        // Create HTTP client
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .unwrap();

        // Bind to random port
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let addr_str = format!("http://{}", addr);

        // Build router
        let app = porchlight::build_router(state.clone());

        // Spawn server in background
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        // Wait a bit for server to start
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

        Self {
            addr: addr_str,
            state,
            google,
            client,
            _temp_dir: temp_dir,
        }
    }

    /// Get base URL for requests
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.addr, path)
    }

    /// Seed a user record and return an established session token for it
    pub async fn create_test_token(&self) -> String {
        let user = data::User::from_profile("g-test".to_string(), Some("Test User".to_string()));
        // Ignore duplicates so this helper is reusable within one test
        let _ = self.state.users.create_user(&user).await;
        self.state.sessions.establish("g-test").await
    }

    /// Drive the full OAuth dance against the mock provider
    ///
    /// # Returns
    /// The session cookie value issued at the end of the flow
    pub async fn sign_in(&self) -> String {
        let client = no_redirect_client();

        let response = client
            .get(self.url("/auth/google"))
            .send()
            .await
            .expect("redirect request succeeds");
        assert!(response.status().is_redirection());

        let location = response
            .headers()
            .get("location")
            .and_then(|v| v.to_str().ok())
            .expect("location header")
            .to_string();
        let state_param = url::Url::parse(&location)
            .unwrap()
            .query_pairs()
            .find(|(key, _)| key == "state")
            .map(|(_, value)| value.to_string())
            .expect("state parameter");
        let state_cookie =
            extract_set_cookie(response.headers(), "oauth_state").expect("oauth_state cookie");

        let response = client
            .get(self.url(&format!(
                "/auth/google/callback?code=test-code&state={state_param}"
            )))
            .header("Cookie", format!("oauth_state={state_cookie}"))
            .send()
            .await
            .expect("callback request succeeds");
        assert!(response.status().is_redirection());
        assert_eq!(
            response
                .headers()
                .get("location")
                .and_then(|v| v.to_str().ok()),
            Some("/profile")
        );

        extract_set_cookie(response.headers(), "session").expect("session cookie set")
    }
}

/// Client that surfaces 302s instead of following them
pub fn no_redirect_client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .timeout(std::time::Duration::from_secs(10))
        .build()
        .expect("failed to build no-redirect client")
}

/// Pull a named cookie value out of Set-Cookie headers
///
/// Skips removal cookies (empty values).
pub fn extract_set_cookie(headers: &reqwest::header::HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all("set-cookie")
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find_map(|raw| {
            let (pair, _) = raw.split_once(';').unwrap_or((raw, ""));
            let (key, value) = pair.split_once('=')?;
            (key.trim() == name && !value.is_empty()).then(|| value.to_string())
        })
}
