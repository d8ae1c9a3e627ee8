//! Session management
//!
//! Server-side session store: opaque random tokens mapped to the
//! provider id of the signed-in identity. Only the key is stored;
//! handlers re-fetch the full user record on every request, so a
//! changed record is visible without re-authentication.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Token length in bytes before base64 encoding
const TOKEN_BYTES: usize = 32;

/// One established session
#[derive(Debug, Clone)]
struct SessionRecord {
    provider_id: String,
    expires_at: DateTime<Utc>,
}

impl SessionRecord {
    fn is_expired(&self) -> bool {
        self.expires_at <= Utc::now()
    }
}

/// In-memory session store
///
/// Volatile: all sessions are dropped on restart. A token moves from
/// established to expired or invalidated and never back; establishing
/// again always mints a fresh token.
pub struct SessionStore {
    sessions: RwLock<HashMap<String, SessionRecord>>,
    max_age: Duration,
}

impl SessionStore {
    /// Create a store whose sessions live for `max_age_seconds`
    pub fn new(max_age_seconds: i64) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            max_age: Duration::seconds(max_age_seconds),
        }
    }

    /// Mint a fresh token and associate it with `provider_id`
    pub async fn establish(&self, provider_id: &str) -> String {
        let token = random_token();
        let record = SessionRecord {
            provider_id: provider_id.to_string(),
            expires_at: Utc::now() + self.max_age,
        };

        let mut sessions = self.sessions.write().await;
        sessions.insert(token.clone(), record);

        crate::metrics::SESSIONS_ESTABLISHED_TOTAL.inc();
        crate::metrics::SESSIONS_ACTIVE.set(sessions.len() as i64);

        token
    }

    /// Resolve a token to the provider id it was established for
    ///
    /// # Returns
    /// None for unknown, invalidated, or expired tokens. Expired
    /// entries are removed on the way out.
    pub async fn resolve(&self, token: &str) -> Option<String> {
        {
            let sessions = self.sessions.read().await;
            match sessions.get(token) {
                Some(record) if !record.is_expired() => {
                    return Some(record.provider_id.clone());
                }
                Some(_) => {}
                None => return None,
            }
        }

        // Token exists but has expired; drop it.
        self.invalidate(token).await;
        None
    }

    /// Remove a session
    ///
    /// # Returns
    /// true if a session was removed
    pub async fn invalidate(&self, token: &str) -> bool {
        let mut sessions = self.sessions.write().await;
        let removed = sessions.remove(token).is_some();
        crate::metrics::SESSIONS_ACTIVE.set(sessions.len() as i64);
        removed
    }

    /// Number of live sessions, for diagnostics
    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

/// Generate an unguessable token
///
/// `thread_rng` is a CSPRNG; 32 random bytes, URL-safe base64 encoded.
pub(crate) fn random_token() -> String {
    use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
    use rand::RngCore;

    let mut bytes = [0u8; TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}
