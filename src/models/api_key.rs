//! API Key model for authentication.
//!
//! API keys authenticate businesses on the `/api/v1` surface. They are stored
//! as SHA-256 hashes; the plaintext is shown exactly once, at creation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

string_enum! {
    /// What a key may do. Read-only keys are rejected on mutating endpoints.
    pub enum ApiKeyRole {
        Admin => "admin",
        ReadOnly => "read_only",
    }
}

/// Represents an API key record from the database.
///
/// # Database Table
///
/// Maps to the `api_keys` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ApiKey {
    /// Unique identifier for this API key
    pub id: Uuid,

    /// Business the key belongs to
    pub business_id: Uuid,

    /// SHA-256 hash of the actual API key (64 hex characters)
    pub key_hash: String,

    /// Human-readable label ("dashboard", "zapier", ...)
    pub label: String,

    /// `admin` or `read_only`
    pub role: String,

    /// Inactive keys are rejected during authentication.
    pub is_active: bool,

    pub created_at: DateTime<Utc>,

    pub last_used_at: Option<DateTime<Utc>>,
}

/// Row produced by the authentication lookup (key joined to its business).
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AuthenticatedKey {
    pub api_key_id: Uuid,
    pub role: String,
    pub business_id: Uuid,
    pub business_name: String,
}

/// Request to create an additional API key.
///
/// ```json
/// { "label": "reporting", "role": "read_only" }
/// ```
#[derive(Debug, Deserialize)]
pub struct CreateApiKeyRequest {
    pub label: String,

    #[serde(default = "default_role")]
    pub role: ApiKeyRole,
}

fn default_role() -> ApiKeyRole {
    ApiKeyRole::Admin
}

/// API key as returned by list endpoints (never includes the hash).
#[derive(Debug, Serialize)]
pub struct ApiKeyResponse {
    pub id: Uuid,
    pub label: String,
    pub role: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub last_used_at: Option<DateTime<Utc>>,

    /// Plaintext key, only present in the creation response
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
}

impl From<ApiKey> for ApiKeyResponse {
    fn from(key: ApiKey) -> Self {
        Self {
            id: key.id,
            label: key.label,
            role: key.role,
            is_active: key.is_active,
            created_at: key.created_at,
            last_used_at: key.last_used_at,
            key: None,
        }
    }
}

impl ApiKeyResponse {
    /// Attach the plaintext key (only for creation).
    pub fn with_key(mut self, key: String) -> Self {
        self.key = Some(key);
        self
    }
}
