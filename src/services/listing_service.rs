//! Listing service: quantity-based offerings managed by a business.

use uuid::Uuid;

use crate::{
    db::DbPool,
    error::AppError,
    models::listing::{CreateListingRequest, Listing, UpdateListingRequest},
};

pub async fn create_listing(
    pool: &DbPool,
    business_id: Uuid,
    mut request: CreateListingRequest,
) -> Result<Listing, AppError> {
    request.validate()?;

    // A listing may only be attached to one of the business's own spaces.
    if let Some(space_id) = request.space_id {
        let owned: Option<(Uuid,)> =
            sqlx::query_as("SELECT id FROM spaces WHERE id = $1 AND business_id = $2")
                .bind(space_id)
                .bind(business_id)
                .fetch_optional(pool)
                .await?;
        if owned.is_none() {
            return Err(AppError::NotFound("Space"));
        }
    }

    let listing = sqlx::query_as::<_, Listing>(
        r#"
        INSERT INTO listings (
            business_id, space_id, slug, title, description, price_cents,
            currency, inventory, status, starts_at, ends_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        RETURNING *
        "#,
    )
    .bind(business_id)
    .bind(request.space_id)
    .bind(&request.slug)
    .bind(&request.title)
    .bind(&request.description)
    .bind(request.price_cents)
    .bind(&request.currency)
    .bind(request.inventory)
    .bind(request.status.as_str())
    .bind(request.starts_at)
    .bind(request.ends_at)
    .fetch_one(pool)
    .await?;

    tracing::info!(business_id = %business_id, listing_id = %listing.id, "listing created");

    Ok(listing)
}

pub async fn list_listings(pool: &DbPool, business_id: Uuid) -> Result<Vec<Listing>, AppError> {
    let listings = sqlx::query_as::<_, Listing>(
        "SELECT * FROM listings WHERE business_id = $1 AND status <> 'archived' ORDER BY created_at DESC",
    )
    .bind(business_id)
    .fetch_all(pool)
    .await?;

    Ok(listings)
}

pub async fn get_listing(
    pool: &DbPool,
    business_id: Uuid,
    listing_id: Uuid,
) -> Result<Listing, AppError> {
    sqlx::query_as::<_, Listing>("SELECT * FROM listings WHERE id = $1 AND business_id = $2")
        .bind(listing_id)
        .bind(business_id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound("Listing"))
}

pub async fn update_listing(
    pool: &DbPool,
    business_id: Uuid,
    listing_id: Uuid,
    request: UpdateListingRequest,
) -> Result<Listing, AppError> {
    let mut tx = pool.begin().await?;

    let mut listing = sqlx::query_as::<_, Listing>(
        "SELECT * FROM listings WHERE id = $1 AND business_id = $2 FOR UPDATE",
    )
    .bind(listing_id)
    .bind(business_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(AppError::NotFound("Listing"))?;

    request.apply(&mut listing)?;

    let listing = sqlx::query_as::<_, Listing>(
        r#"
        UPDATE listings
        SET title = $2, description = $3, price_cents = $4, inventory = $5,
            status = $6, starts_at = $7, ends_at = $8, updated_at = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(listing.id)
    .bind(&listing.title)
    .bind(&listing.description)
    .bind(listing.price_cents)
    .bind(listing.inventory)
    .bind(&listing.status)
    .bind(listing.starts_at)
    .bind(listing.ends_at)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;

    Ok(listing)
}

/// Soft delete: archived listings disappear from the public site and sitemap.
pub async fn archive_listing(
    pool: &DbPool,
    business_id: Uuid,
    listing_id: Uuid,
) -> Result<(), AppError> {
    let result = sqlx::query(
        "UPDATE listings SET status = 'archived', updated_at = NOW() WHERE id = $1 AND business_id = $2",
    )
    .bind(listing_id)
    .bind(business_id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Listing"));
    }

    Ok(())
}

pub async fn get_published_listing(
    pool: &DbPool,
    business_id: Uuid,
    slug: &str,
) -> Result<Listing, AppError> {
    sqlx::query_as::<_, Listing>(
        "SELECT * FROM listings WHERE business_id = $1 AND slug = $2 AND status = 'published'",
    )
    .bind(business_id)
    .bind(slug)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::NotFound("Listing"))
}

pub async fn list_published_listings(
    pool: &DbPool,
    business_id: Uuid,
) -> Result<Vec<Listing>, AppError> {
    let listings = sqlx::query_as::<_, Listing>(
        r#"
        SELECT * FROM listings
        WHERE business_id = $1 AND status = 'published'
        ORDER BY starts_at NULLS LAST, title
        "#,
    )
    .bind(business_id)
    .fetch_all(pool)
    .await?;

    Ok(listings)
}
