//! Data models
//!
//! Rust structs representing database entities.
//! All models use ULID for IDs and chrono for timestamps.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Entity ID wrapper (ULID format, 26 characters)
///
/// Example: "01ARZ3NDEKTSV4RRFFQ69G5FAV"
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub String);

impl EntityId {
    /// Generate a new ULID
    pub fn new() -> Self {
        Self(ulid::Ulid::new().to_string())
    }

    /// Create from existing string
    pub fn from_string(s: String) -> Self {
        Self(s)
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

/// One authenticated identity
///
/// Created on the first successful sign-in for a provider subject and
/// never deleted. `provider_id` carries a UNIQUE index, which is the
/// only guard against concurrent first sign-ins creating duplicates.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: String,
    /// Stable subject identifier assigned by the provider
    pub provider_id: String,
    /// Human-readable name from the provider profile, if any
    pub display_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Build a new record from provider profile fields
    pub fn from_profile(provider_id: String, display_name: Option<String>) -> Self {
        Self {
            id: EntityId::new().0,
            provider_id,
            display_name,
            created_at: Utc::now(),
        }
    }
}
