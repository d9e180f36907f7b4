//! Listing management handlers.
//!
//! - `GET|POST /api/v1/listings`
//! - `GET|PATCH|DELETE /api/v1/listings/{id}`

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
    models::listing::{CreateListingRequest, Listing, UpdateListingRequest},
    services::listing_service,
};

/// Create a listing.
///
/// # Request Body
///
/// ```json
/// {
///   "slug": "jazz-night",
///   "title": "Jazz Night",
///   "space_id": "550e8400-e29b-41d4-a716-446655440000",
///   "price_cents": 2500,
///   "currency": "USD",
///   "inventory": 80,
///   "starts_at": "2025-03-14T20:00:00Z",
///   "status": "published"
/// }
/// ```
///
/// `inventory` omitted means unlimited. `space_id` is optional but must
/// belong to the same business when given.
///
/// # Response
///
/// - **201 Created**: the stored listing
/// - **404**: `space_id` not found for this business
/// - **409**: slug already used
pub async fn create_listing(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Json(request): Json<CreateListingRequest>,
) -> Result<impl IntoResponse, AppError> {
    auth.require_write()?;
    let listing = listing_service::create_listing(&pool, auth.business_id, request).await?;

    Ok((StatusCode::CREATED, Json(listing)))
}

pub async fn list_listings(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<Vec<Listing>>, AppError> {
    let listings = listing_service::list_listings(&pool, auth.business_id).await?;
    Ok(Json(listings))
}

pub async fn get_listing(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path(listing_id): Path<Uuid>,
) -> Result<Json<Listing>, AppError> {
    let listing = listing_service::get_listing(&pool, auth.business_id, listing_id).await?;
    Ok(Json(listing))
}

/// Partially update a listing. Send `"clear_inventory": true` to make the
/// inventory unlimited again.
pub async fn update_listing(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path(listing_id): Path<Uuid>,
    Json(request): Json<UpdateListingRequest>,
) -> Result<Json<Listing>, AppError> {
    auth.require_write()?;
    let listing =
        listing_service::update_listing(&pool, auth.business_id, listing_id, request).await?;
    Ok(Json(listing))
}

pub async fn archive_listing(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path(listing_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    auth.require_write()?;
    listing_service::archive_listing(&pool, auth.business_id, listing_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
