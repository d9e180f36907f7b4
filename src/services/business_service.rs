//! Business (tenant) lookup and bootstrap.

use crate::{
    db::DbPool,
    error::AppError,
    models::{api_key::ApiKeyResponse, business::Business, require_text, validate_slug},
    services::api_key_service,
};

/// Resolve the `{business}` segment of public URLs.
pub async fn find_by_slug(pool: &DbPool, slug: &str) -> Result<Business, AppError> {
    sqlx::query_as::<_, Business>("SELECT * FROM businesses WHERE slug = $1")
        .bind(slug)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound("Business"))
}

/// Create a business together with its first admin key, atomically.
pub async fn create_business(
    pool: &DbPool,
    name: &str,
    slug: &str,
) -> Result<(Business, ApiKeyResponse), AppError> {
    let name = require_text("name", name)?;
    validate_slug(slug)?;

    let mut tx = pool.begin().await?;

    let business = sqlx::query_as::<_, Business>(
        "INSERT INTO businesses (name, slug) VALUES ($1, $2) RETURNING *",
    )
    .bind(&name)
    .bind(slug)
    .fetch_one(&mut *tx)
    .await?;

    let key = api_key_service::create_api_key(
        &mut *tx,
        business.id,
        api_key_service::bootstrap_key_request(),
    )
    .await?;

    tx.commit().await?;

    tracing::info!(business_id = %business.id, slug = %business.slug, "business created");

    Ok((business, key))
}
