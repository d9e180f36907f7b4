//! Review moderation handlers.
//!
//! Customers submit reviews through the public routes; they stay `pending`
//! until the business publishes or hides them here.

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
};
use uuid::Uuid;

use crate::{
    db::DbPool,
    error::AppError,
    middleware::auth::AuthContext,
    models::review::{ModerateReviewRequest, Review, ReviewListQuery},
    services::review_service,
};

/// List reviews, optionally filtered by `status` and `space_id`.
pub async fn list_reviews(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<ReviewListQuery>,
) -> Result<Json<Vec<Review>>, AppError> {
    let reviews = review_service::list_reviews(&pool, auth.business_id, &query).await?;
    Ok(Json(reviews))
}

/// Publish, hide, or reply to a review.
///
/// # Request Body
///
/// ```json
/// {
///   "status": "published",
///   "business_reply": "Thanks for coming!"
/// }
/// ```
///
/// Both fields are optional. An empty `business_reply` removes the reply.
pub async fn moderate_review(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path(review_id): Path<Uuid>,
    Json(request): Json<ModerateReviewRequest>,
) -> Result<Json<Review>, AppError> {
    auth.require_write()?;
    let review =
        review_service::moderate_review(&pool, auth.business_id, review_id, request).await?;
    Ok(Json(review))
}
