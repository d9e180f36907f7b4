//! Review service: public submission, moderation and public listing.

use uuid::Uuid;

use crate::{
    db::DbPool,
    error::AppError,
    models::{
        order::{Order, OrderStatus, validate_email},
        review::{
            ModerateReviewRequest, PublicReview, PublicReviewList, Review, ReviewListQuery,
            SubmitReviewRequest,
        },
    },
};

/// Submit a review for a completed order of the business.
///
/// Unknown orders and email mismatches both answer 404 so the endpoint cannot
/// be used to probe order ids.
pub async fn submit_review(
    pool: &DbPool,
    business_id: Uuid,
    request: SubmitReviewRequest,
) -> Result<Review, AppError> {
    request.validate()?;
    let email = validate_email(&request.customer_email)?;

    let order = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = $1 AND business_id = $2")
        .bind(request.order_id)
        .bind(business_id)
        .fetch_optional(pool)
        .await?
        .filter(|order| order.customer_email.eq_ignore_ascii_case(&email))
        .ok_or(AppError::NotFound("Order"))?;

    if order.order_status()? != OrderStatus::Completed {
        return Err(AppError::unprocessable(
            "Only completed orders can be reviewed",
        ));
    }

    let author_name = request
        .author_name
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .unwrap_or(&order.customer_name)
        .to_string();

    // UNIQUE(order_id) turns a second review into a 409.
    let review = sqlx::query_as::<_, Review>(
        r#"
        INSERT INTO reviews (business_id, order_id, space_id, listing_id, rating, author_name, body)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING *
        "#,
    )
    .bind(business_id)
    .bind(order.id)
    .bind(order.space_id)
    .bind(order.listing_id)
    .bind(request.rating)
    .bind(&author_name)
    .bind(request.body.trim())
    .fetch_one(pool)
    .await?;

    tracing::info!(review_id = %review.id, order_id = %order.id, rating = review.rating, "review submitted");

    Ok(review)
}

pub async fn list_reviews(
    pool: &DbPool,
    business_id: Uuid,
    query: &ReviewListQuery,
) -> Result<Vec<Review>, AppError> {
    let reviews = sqlx::query_as::<_, Review>(
        r#"
        SELECT * FROM reviews
        WHERE business_id = $1
          AND ($2::text IS NULL OR status = $2)
          AND ($3::uuid IS NULL OR space_id = $3)
        ORDER BY created_at DESC
        "#,
    )
    .bind(business_id)
    .bind(query.status.map(|s| s.as_str()))
    .bind(query.space_id)
    .fetch_all(pool)
    .await?;

    Ok(reviews)
}

/// Publish/hide a review and/or set the business reply. An empty reply clears it.
pub async fn moderate_review(
    pool: &DbPool,
    business_id: Uuid,
    review_id: Uuid,
    request: ModerateReviewRequest,
) -> Result<Review, AppError> {
    if request.status.is_none() && request.business_reply.is_none() {
        return Err(AppError::invalid("Nothing to update"));
    }

    let reply = request.business_reply.as_deref().map(str::trim);
    if reply.is_some_and(|r| r.len() > 5_000) {
        return Err(AppError::invalid("business_reply cannot exceed 5000 characters"));
    }

    sqlx::query_as::<_, Review>(
        r#"
        UPDATE reviews
        SET status = COALESCE($3, status),
            business_reply = CASE WHEN $4 THEN NULLIF($5, '') ELSE business_reply END,
            updated_at = NOW()
        WHERE id = $1 AND business_id = $2
        RETURNING *
        "#,
    )
    .bind(review_id)
    .bind(business_id)
    .bind(request.status.map(|s| s.as_str()))
    .bind(reply.is_some())
    .bind(reply.unwrap_or_default())
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::NotFound("Review"))
}

/// Published reviews of a space with count and average rating.
pub async fn public_space_reviews(pool: &DbPool, space_id: Uuid) -> Result<PublicReviewList, AppError> {
    let reviews = sqlx::query_as::<_, PublicReview>(
        r#"
        SELECT id, rating, author_name, body, business_reply, created_at
        FROM reviews
        WHERE space_id = $1 AND status = 'published'
        ORDER BY created_at DESC
        "#,
    )
    .bind(space_id)
    .fetch_all(pool)
    .await?;

    Ok(PublicReviewList::new(reviews))
}
