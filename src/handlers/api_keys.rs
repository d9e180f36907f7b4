//! API key management for the calling business.

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use crate::{
    db::DbPool,
    error::AppError,
    middleware::auth::AuthContext,
    models::api_key::{ApiKeyResponse, CreateApiKeyRequest},
    services::api_key_service,
};

/// Issue a new key.
///
/// # Request Body
///
/// ```json
/// { "label": "Reporting dashboard", "role": "read_only" }
/// ```
///
/// # Response
///
/// 201 Created. The plaintext `key` (`sk_` + 64 hex chars) appears only in
/// this response; only its SHA-256 hash is stored.
pub async fn create_api_key(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Json(request): Json<CreateApiKeyRequest>,
) -> Result<impl IntoResponse, AppError> {
    auth.require_write()?;
    let key = api_key_service::create_api_key(&pool, auth.business_id, request).await?;

    Ok((StatusCode::CREATED, Json(key)))
}

pub async fn list_api_keys(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<Vec<ApiKeyResponse>>, AppError> {
    let keys = api_key_service::list_api_keys(&pool, auth.business_id).await?;
    Ok(Json(keys))
}

/// Revoke a key. A key cannot revoke itself (409).
pub async fn revoke_api_key(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path(key_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    auth.require_write()?;
    api_key_service::revoke_api_key(&pool, auth.business_id, auth.api_key_id, key_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
