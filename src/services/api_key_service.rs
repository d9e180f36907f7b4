//! API key management for a business.
//!
//! Keys have the form `sk_<64 hex chars>`. Only the SHA-256 hash is stored;
//! the plaintext is returned once, from [`create_api_key`].

use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{
    db::DbPool,
    error::AppError,
    middleware::auth::hash_api_key,
    models::api_key::{ApiKey, ApiKeyResponse, ApiKeyRole, CreateApiKeyRequest},
    models::require_text,
};

/// Prefix of every generated key.
pub const KEY_PREFIX: &str = "sk_";

/// 32 random bytes, hex encoded, behind [`KEY_PREFIX`].
pub fn generate_api_key() -> String {
    let bytes: [u8; 32] = rand::random();
    format!("{KEY_PREFIX}{}", hex::encode(bytes))
}

/// Create a key and return it with its plaintext.
///
/// Generic over the executor so the bootstrap binary can create the first key
/// in the same transaction as its business.
pub async fn create_api_key<'e, E>(
    executor: E,
    business_id: Uuid,
    request: CreateApiKeyRequest,
) -> Result<ApiKeyResponse, AppError>
where
    E: Executor<'e, Database = Postgres>,
{
    let label = require_text("label", &request.label)?;
    let raw_key = generate_api_key();

    let key = sqlx::query_as::<_, ApiKey>(
        r#"
        INSERT INTO api_keys (business_id, key_hash, label, role)
        VALUES ($1, $2, $3, $4)
        RETURNING *
        "#,
    )
    .bind(business_id)
    .bind(hash_api_key(&raw_key))
    .bind(&label)
    .bind(request.role.as_str())
    .fetch_one(executor)
    .await?;

    tracing::info!(business_id = %business_id, api_key_id = %key.id, role = %key.role, "api key created");

    Ok(ApiKeyResponse::from(key).with_key(raw_key))
}

pub async fn list_api_keys(pool: &DbPool, business_id: Uuid) -> Result<Vec<ApiKeyResponse>, AppError> {
    let keys = sqlx::query_as::<_, ApiKey>(
        "SELECT * FROM api_keys WHERE business_id = $1 ORDER BY created_at",
    )
    .bind(business_id)
    .fetch_all(pool)
    .await?;

    Ok(keys.into_iter().map(Into::into).collect())
}

/// Deactivate a key. A key cannot revoke itself.
pub async fn revoke_api_key(
    pool: &DbPool,
    business_id: Uuid,
    current_key_id: Uuid,
    key_id: Uuid,
) -> Result<(), AppError> {
    if key_id == current_key_id {
        return Err(AppError::conflict(
            "An API key cannot revoke itself; use another admin key",
        ));
    }

    let result = sqlx::query(
        "UPDATE api_keys SET is_active = false WHERE id = $1 AND business_id = $2 AND is_active = true",
    )
    .bind(key_id)
    .bind(business_id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("API key"));
    }

    tracing::info!(business_id = %business_id, api_key_id = %key_id, "api key revoked");

    Ok(())
}

/// Label and role for the first key of a new business.
pub fn bootstrap_key_request() -> CreateApiKeyRequest {
    CreateApiKeyRequest {
        label: "bootstrap".to_string(),
        role: ApiKeyRole::Admin,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_keys_have_prefix_and_entropy() {
        let key = generate_api_key();
        assert!(key.starts_with("sk_"));
        assert_eq!(key.len(), 3 + 64);
        assert!(key[3..].chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(key, generate_api_key());
    }

    #[test]
    fn stored_hash_differs_from_key() {
        let key = generate_api_key();
        let hash = hash_api_key(&key);
        assert_eq!(hash.len(), 64);
        assert!(!hash.contains(&key[3..]));
    }
}
