//! Space management handlers.
//!
//! - `GET|POST /api/v1/spaces`
//! - `GET|PATCH|DELETE /api/v1/spaces/{id}`
//! - `GET|POST /api/v1/spaces/{id}/pricing-rules`, `DELETE .../{rule}`
//! - `GET|POST /api/v1/spaces/{id}/blackouts`, `DELETE .../{blackout}`
//! - `POST /api/v1/spaces/{id}/quote`
//! - `GET /api/v1/spaces/{id}/availability`
//!
//! Every route is scoped to the business of the calling API key; a space
//! owned by another business is reported as not found.

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use crate::{
    db::DbPool,
    error::AppError,
    middleware::auth::AuthContext,
    models::space::{
        AvailabilityQuery, AvailabilityResponse, Blackout, CreateBlackoutRequest,
        CreatePricingRuleRequest, CreateSpaceRequest, PricingRuleRecord, Space, UpdateSpaceRequest,
    },
    services::{pricing::{Quote, QuoteRequest}, space_service},
};

/// Create a space.
///
/// # Request Body
///
/// ```json
/// {
///   "slug": "rooftop",
///   "name": "Rooftop Terrace",
///   "capacity": 40,
///   "hourly_rate_cents": 12000,
///   "minimum_hours": 2,
///   "cleaning_fee_cents": 5000,
///   "tax_rate_bps": 825,
///   "buffer_minutes": 30,
///   "utc_offset_minutes": -300,
///   "instant_book": false,
///   "currency": "USD",
///   "status": "draft"
/// }
/// ```
///
/// # Response
///
/// - **201 Created**: the stored space
/// - **400**: validation failure
/// - **403**: read-only key
/// - **409**: slug already used by this business
pub async fn create_space(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Json(request): Json<CreateSpaceRequest>,
) -> Result<impl IntoResponse, AppError> {
    auth.require_write()?;
    let space = space_service::create_space(&pool, auth.business_id, request).await?;

    Ok((StatusCode::CREATED, Json(space)))
}

/// List the business's spaces, archived ones excluded.
pub async fn list_spaces(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<Vec<Space>>, AppError> {
    let spaces = space_service::list_spaces(&pool, auth.business_id).await?;
    Ok(Json(spaces))
}

pub async fn get_space(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path(space_id): Path<Uuid>,
) -> Result<Json<Space>, AppError> {
    let space = space_service::get_space(&pool, auth.business_id, space_id).await?;
    Ok(Json(space))
}

/// Partially update a space.
///
/// Only the fields present in the body change. A status change must follow
/// the publish lifecycle (`archived` is terminal).
pub async fn update_space(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path(space_id): Path<Uuid>,
    Json(request): Json<UpdateSpaceRequest>,
) -> Result<Json<Space>, AppError> {
    auth.require_write()?;
    let space = space_service::update_space(&pool, auth.business_id, space_id, request).await?;
    Ok(Json(space))
}

/// Archive a space (soft delete). Existing orders keep their reference.
pub async fn archive_space(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path(space_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    auth.require_write()?;
    space_service::archive_space(&pool, auth.business_id, space_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_pricing_rules(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path(space_id): Path<Uuid>,
) -> Result<Json<Vec<PricingRuleRecord>>, AppError> {
    let space = space_service::get_space(&pool, auth.business_id, space_id).await?;
    let rules = space_service::list_pricing_rules(&pool, space.id).await?;
    Ok(Json(rules))
}

/// Attach a pricing rule to a space.
///
/// # Request Body
///
/// ```json
/// {
///   "rule": {
///     "type": "time_window",
///     "days": ["Sat", "Sun"],
///     "start_hour": 18,
///     "end_hour": 24,
///     "adjustment_bps": 2500
///   },
///   "priority": 10
/// }
/// ```
pub async fn add_pricing_rule(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path(space_id): Path<Uuid>,
    Json(request): Json<CreatePricingRuleRequest>,
) -> Result<impl IntoResponse, AppError> {
    auth.require_write()?;
    let space = space_service::get_space(&pool, auth.business_id, space_id).await?;
    let rule = space_service::add_pricing_rule(&pool, space.id, request).await?;

    Ok((StatusCode::CREATED, Json(rule)))
}

pub async fn delete_pricing_rule(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path((space_id, rule_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, AppError> {
    auth.require_write()?;
    let space = space_service::get_space(&pool, auth.business_id, space_id).await?;
    space_service::delete_pricing_rule(&pool, space.id, rule_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_blackouts(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path(space_id): Path<Uuid>,
) -> Result<Json<Vec<Blackout>>, AppError> {
    let space = space_service::get_space(&pool, auth.business_id, space_id).await?;
    let blackouts = space_service::list_blackouts(&pool, space.id).await?;
    Ok(Json(blackouts))
}

/// Block a period on the calendar. Blackouts conflict with bookings but
/// ignore the space's buffer.
pub async fn add_blackout(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path(space_id): Path<Uuid>,
    Json(request): Json<CreateBlackoutRequest>,
) -> Result<impl IntoResponse, AppError> {
    auth.require_write()?;
    let space = space_service::get_space(&pool, auth.business_id, space_id).await?;
    let blackout = space_service::add_blackout(&pool, space.id, request).await?;

    Ok((StatusCode::CREATED, Json(blackout)))
}

pub async fn delete_blackout(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path((space_id, blackout_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, AppError> {
    auth.require_write()?;
    let space = space_service::get_space(&pool, auth.business_id, space_id).await?;
    space_service::delete_blackout(&pool, space.id, blackout_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Price a slot without booking it. Works for draft spaces too.
pub async fn quote_space(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path(space_id): Path<Uuid>,
    Json(request): Json<QuoteRequest>,
) -> Result<Json<Quote>, AppError> {
    let space = space_service::get_space(&pool, auth.business_id, space_id).await?;
    let quote = space_service::quote(&pool, &space, &request).await?;
    Ok(Json(quote))
}

/// Busy and free time between `from` and `to`.
pub async fn space_availability(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path(space_id): Path<Uuid>,
    Query(query): Query<AvailabilityQuery>,
) -> Result<Json<AvailabilityResponse>, AppError> {
    let space = space_service::get_space(&pool, auth.business_id, space_id).await?;
    let availability = space_service::availability(&pool, &space, &query).await?;
    Ok(Json(availability))
}
