//! API key authentication middleware.
//!
//! This middleware intercepts every business request to:
//! 1. Extract the API key from the Authorization header
//! 2. Hash it and verify it exists in the database
//! 3. Inject authentication context (business + role) into the request
//! 4. Reject unauthorized requests with HTTP 401

use crate::{
    db::DbPool,
    error::AppError,
    models::api_key::{ApiKeyRole, AuthenticatedKey},
};
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Authentication context attached to authenticated requests.
///
/// Handlers extract it with `Extension<AuthContext>`; every tenant-scoped
/// query filters on `business_id`.
#[derive(Debug, Clone)]
pub struct AuthContext {
    /// ID of the authenticated API key
    pub api_key_id: Uuid,

    /// Business (tenant) the key belongs to
    pub business_id: Uuid,

    /// Name of the business making the request
    pub business_name: String,

    /// What the key is allowed to do
    pub role: ApiKeyRole,
}

impl AuthContext {
    /// Reject read-only keys on mutating endpoints.
    pub fn require_write(&self) -> Result<(), AppError> {
        match self.role {
            ApiKeyRole::Admin => Ok(()),
            ApiKeyRole::ReadOnly => Err(AppError::Forbidden(
                "This API key is read-only".to_string(),
            )),
        }
    }
}

/// SHA-256 hex digest of a raw API key, as stored in `api_keys.key_hash`.
pub fn hash_api_key(raw_key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(raw_key.as_bytes());
    hex::encode(hasher.finalize())
}

/// API key authentication middleware function.
///
/// # Flow
///
/// 1. Extract `Authorization: Bearer <key>` header from request
/// 2. Hash the `<key>` using SHA-256
/// 3. Look up an active key with that hash, joined to its business
/// 4. If found: record `last_used_at`, inject `AuthContext`, call next handler
/// 5. If not found: return 401 Unauthorized error
pub async fn auth_middleware(
    State(pool): State<DbPool>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let auth_header = request
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .ok_or(AppError::InvalidApiKey)?;

    // Expected format: "Bearer <api_key>"
    let api_key = auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|key| !key.is_empty())
        .ok_or(AppError::InvalidApiKey)?;

    let key_hash = hash_api_key(api_key);

    let key = sqlx::query_as::<_, AuthenticatedKey>(
        r#"
        SELECT k.id AS api_key_id, k.role, b.id AS business_id, b.name AS business_name
        FROM api_keys k
        JOIN businesses b ON b.id = k.business_id
        WHERE k.key_hash = $1 AND k.is_active = true
        "#,
    )
    .bind(&key_hash)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::InvalidApiKey)?;

    sqlx::query("UPDATE api_keys SET last_used_at = NOW() WHERE id = $1")
        .bind(key.api_key_id)
        .execute(&pool)
        .await?;

    let auth_context = AuthContext {
        api_key_id: key.api_key_id,
        business_id: key.business_id,
        business_name: key.business_name,
        role: key.role.parse()?,
    };

    tracing::debug!(
        business_id = %auth_context.business_id,
        api_key_id = %auth_context.api_key_id,
        "request authenticated"
    );

    request.extensions_mut().insert(auth_context);

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_hex_sha256() {
        let hash = hash_api_key("sk_test");
        assert_eq!(hash.len(), 64);
        assert_eq!(hash, hash_api_key("sk_test"));
        assert_ne!(hash, hash_api_key("sk_test2"));
    }

    #[test]
    fn read_only_keys_cannot_write() {
        let mut ctx = AuthContext {
            api_key_id: Uuid::new_v4(),
            business_id: Uuid::new_v4(),
            business_name: "Loft Co".to_string(),
            role: ApiKeyRole::ReadOnly,
        };
        assert!(matches!(ctx.require_write(), Err(AppError::Forbidden(_))));

        ctx.role = ApiKeyRole::Admin;
        assert!(ctx.require_write().is_ok());
    }
}
