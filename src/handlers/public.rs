//! Unauthenticated storefront routes, addressed by business slug.
//!
//! Only published spaces and listings are visible. Draft or archived ones
//! answer 404 exactly like unknown slugs.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};

use crate::{
    db::DbPool,
    error::AppError,
    models::{
        listing::Listing,
        order::{BookingRequest, PurchaseRequest},
        review::{PublicReviewList, SubmitReviewRequest},
        space::{AvailabilityQuery, AvailabilityResponse, Space},
        webhook::OutboundEvent,
    },
    services::{
        business_service, listing_service, order_service,
        pricing::{Quote, QuoteRequest},
        review_service, space_service, webhook_service,
    },
    state::AppState,
};

/// Resolve `{business}/spaces/{slug}` to a published space.
async fn published_space(pool: &DbPool, business_slug: &str, slug: &str) -> Result<Space, AppError> {
    let business = business_service::find_by_slug(pool, business_slug).await?;
    space_service::get_published_space(pool, business.id, slug).await
}

async fn published_listing(
    pool: &DbPool,
    business_slug: &str,
    slug: &str,
) -> Result<Listing, AppError> {
    let business = business_service::find_by_slug(pool, business_slug).await?;
    listing_service::get_published_listing(pool, business.id, slug).await
}

pub async fn list_spaces(
    State(pool): State<DbPool>,
    Path(business_slug): Path<String>,
) -> Result<Json<Vec<Space>>, AppError> {
    let business = business_service::find_by_slug(&pool, &business_slug).await?;
    let spaces = space_service::list_published_spaces(&pool, business.id).await?;
    Ok(Json(spaces))
}

pub async fn get_space(
    State(pool): State<DbPool>,
    Path((business_slug, slug)): Path<(String, String)>,
) -> Result<Json<Space>, AppError> {
    let space = published_space(&pool, &business_slug, &slug).await?;
    Ok(Json(space))
}

pub async fn space_availability(
    State(pool): State<DbPool>,
    Path((business_slug, slug)): Path<(String, String)>,
    Query(query): Query<AvailabilityQuery>,
) -> Result<Json<AvailabilityResponse>, AppError> {
    let space = published_space(&pool, &business_slug, &slug).await?;
    let availability = space_service::availability(&pool, &space, &query).await?;
    Ok(Json(availability))
}

/// Price a slot. Does not check availability.
pub async fn quote_space(
    State(pool): State<DbPool>,
    Path((business_slug, slug)): Path<(String, String)>,
    Json(request): Json<QuoteRequest>,
) -> Result<Json<Quote>, AppError> {
    let space = published_space(&pool, &business_slug, &slug).await?;
    let quote = space_service::quote(&pool, &space, &request).await?;
    Ok(Json(quote))
}

/// Request a booking.
///
/// # Request Body
///
/// ```json
/// {
///   "starts_at": "2025-03-14T18:00:00Z",
///   "ends_at": "2025-03-14T22:00:00Z",
///   "guests": 25,
///   "customer_name": "Ada Lovelace",
///   "customer_email": "ada@example.com",
///   "notes": "Birthday"
/// }
/// ```
///
/// # Response
///
/// - **201 Created**: the order, `confirmed` for instant-book spaces and
///   `pending` otherwise, with the quote it was priced at
/// - **400**: slot or guest count invalid
/// - **409**: slot overlaps a confirmed booking or blackout
pub async fn create_booking(
    State(state): State<AppState>,
    Path((business_slug, slug)): Path<(String, String)>,
    Json(request): Json<BookingRequest>,
) -> Result<impl IntoResponse, AppError> {
    let space = published_space(&state.pool, &business_slug, &slug).await?;
    let order = order_service::create_booking(&state.pool, &space, request).await?;

    webhook_service::dispatch(
        &state.pool,
        &state.http,
        OutboundEvent::new(order.business_id, "order.created", order.id, &order),
    );

    Ok((StatusCode::CREATED, Json(order)))
}

pub async fn space_reviews(
    State(pool): State<DbPool>,
    Path((business_slug, slug)): Path<(String, String)>,
) -> Result<Json<PublicReviewList>, AppError> {
    let space = published_space(&pool, &business_slug, &slug).await?;
    let reviews = review_service::public_space_reviews(&pool, space.id).await?;
    Ok(Json(reviews))
}

pub async fn list_listings(
    State(pool): State<DbPool>,
    Path(business_slug): Path<String>,
) -> Result<Json<Vec<Listing>>, AppError> {
    let business = business_service::find_by_slug(&pool, &business_slug).await?;
    let listings = listing_service::list_published_listings(&pool, business.id).await?;
    Ok(Json(listings))
}

pub async fn get_listing(
    State(pool): State<DbPool>,
    Path((business_slug, slug)): Path<(String, String)>,
) -> Result<Json<Listing>, AppError> {
    let listing = published_listing(&pool, &business_slug, &slug).await?;
    Ok(Json(listing))
}

/// Buy a listing.
///
/// # Request Body
///
/// ```json
/// {
///   "quantity": 2,
///   "customer_name": "Ada Lovelace",
///   "customer_email": "ada@example.com"
/// }
/// ```
///
/// # Response
///
/// - **201 Created**: the confirmed order
/// - **422**: not enough inventory left
pub async fn create_purchase(
    State(state): State<AppState>,
    Path((business_slug, slug)): Path<(String, String)>,
    Json(request): Json<PurchaseRequest>,
) -> Result<impl IntoResponse, AppError> {
    let listing = published_listing(&state.pool, &business_slug, &slug).await?;
    let order = order_service::create_purchase(&state.pool, &listing, request).await?;

    webhook_service::dispatch(
        &state.pool,
        &state.http,
        OutboundEvent::new(order.business_id, "order.created", order.id, &order),
    );

    Ok((StatusCode::CREATED, Json(order)))
}

/// Leave a review for a completed order.
///
/// # Request Body
///
/// ```json
/// {
///   "order_id": "550e8400-e29b-41d4-a716-446655440000",
///   "customer_email": "ada@example.com",
///   "rating": 5,
///   "body": "Perfect venue."
/// }
/// ```
///
/// The email must match the order. The review waits for moderation before
/// it shows up publicly.
pub async fn submit_review(
    State(state): State<AppState>,
    Path(business_slug): Path<String>,
    Json(request): Json<SubmitReviewRequest>,
) -> Result<impl IntoResponse, AppError> {
    let business = business_service::find_by_slug(&state.pool, &business_slug).await?;
    let review = review_service::submit_review(&state.pool, business.id, request).await?;

    webhook_service::dispatch(
        &state.pool,
        &state.http,
        OutboundEvent::new(business.id, "review.created", review.id, &review),
    );

    Ok((StatusCode::CREATED, Json(review)))
}
