//! Publishing listings to connected event platforms.

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
    models::event_sync::{CreateEventSyncRequest, EventSync},
    services::event_sync_service,
    state::AppState,
};

pub async fn list_syncs(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path(listing_id): Path<Uuid>,
) -> Result<Json<Vec<EventSync>>, AppError> {
    let syncs = event_sync_service::list_syncs(&pool, auth.business_id, listing_id).await?;
    Ok(Json(syncs))
}

/// Publish a listing through one connected account.
///
/// # Request Body
///
/// ```json
/// { "social_account_id": "550e8400-e29b-41d4-a716-446655440000" }
/// ```
///
/// # Response
///
/// - **201 Created**: published, with `external_event_id` and `external_url`
/// - **409**: this listing already has a sync for the account
/// - **422**: listing not publishable or account token unusable
/// - **502**: the platform rejected the event
///
/// On 422 and 502 the sync record is kept as `failed` and can be retried.
pub async fn create_sync(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(listing_id): Path<Uuid>,
    Json(request): Json<CreateEventSyncRequest>,
) -> Result<impl IntoResponse, AppError> {
    auth.require_write()?;
    let sync =
        event_sync_service::create_sync(&state, auth.business_id, listing_id, request).await?;

    Ok((StatusCode::CREATED, Json(sync)))
}

pub async fn retry_sync(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(sync_id): Path<Uuid>,
) -> Result<Json<EventSync>, AppError> {
    auth.require_write()?;
    let sync = event_sync_service::retry_sync(&state, auth.business_id, sync_id).await?;
    Ok(Json(sync))
}

/// Forget a sync. The event already on the platform is not removed.
pub async fn delete_sync(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path(sync_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    auth.require_write()?;
    event_sync_service::delete_sync(&pool, auth.business_id, sync_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
