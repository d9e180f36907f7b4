//! Space service: venue management, pricing rules, blackouts, quotes and
//! availability.
//!
//! Every business-facing function takes the authenticated `business_id` and
//! filters on it, so a space owned by another business is reported as not
//! found rather than forbidden.

use chrono::Duration;
use sqlx::types::Json;
use uuid::Uuid;

use crate::{
    db::DbPool,
    error::AppError,
    models::space::{
        AvailabilityQuery, AvailabilityResponse, Blackout, CreateBlackoutRequest,
        CreatePricingRuleRequest, CreateSpaceRequest, PricingRuleRecord, Space,
        UpdateSpaceRequest,
    },
    services::{
        availability::{self, TimeRange},
        pricing::{self, Quote, QuoteRequest, RankedRule},
    },
};

pub async fn create_space(
    pool: &DbPool,
    business_id: Uuid,
    mut request: CreateSpaceRequest,
) -> Result<Space, AppError> {
    request.validate()?;

    let space = sqlx::query_as::<_, Space>(
        r#"
        INSERT INTO spaces (
            business_id, slug, name, description, address, capacity,
            hourly_rate_cents, minimum_hours, cleaning_fee_cents, tax_rate_bps,
            buffer_minutes, utc_offset_minutes, instant_book, currency, status
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
        RETURNING *
        "#,
    )
    .bind(business_id)
    .bind(&request.slug)
    .bind(&request.name)
    .bind(&request.description)
    .bind(&request.address)
    .bind(request.capacity)
    .bind(request.hourly_rate_cents)
    .bind(request.minimum_hours)
    .bind(request.cleaning_fee_cents)
    .bind(request.tax_rate_bps)
    .bind(request.buffer_minutes)
    .bind(request.utc_offset_minutes)
    .bind(request.instant_book)
    .bind(&request.currency)
    .bind(request.status.as_str())
    .fetch_one(pool)
    .await?;

    tracing::info!(business_id = %business_id, space_id = %space.id, slug = %space.slug, "space created");

    Ok(space)
}

/// All non-archived spaces of a business, newest first.
pub async fn list_spaces(pool: &DbPool, business_id: Uuid) -> Result<Vec<Space>, AppError> {
    let spaces = sqlx::query_as::<_, Space>(
        "SELECT * FROM spaces WHERE business_id = $1 AND status <> 'archived' ORDER BY created_at DESC",
    )
    .bind(business_id)
    .fetch_all(pool)
    .await?;

    Ok(spaces)
}

pub async fn get_space(pool: &DbPool, business_id: Uuid, space_id: Uuid) -> Result<Space, AppError> {
    sqlx::query_as::<_, Space>("SELECT * FROM spaces WHERE id = $1 AND business_id = $2")
        .bind(space_id)
        .bind(business_id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound("Space"))
}

/// Apply a partial update. The row is locked so concurrent edits serialize.
pub async fn update_space(
    pool: &DbPool,
    business_id: Uuid,
    space_id: Uuid,
    request: UpdateSpaceRequest,
) -> Result<Space, AppError> {
    let mut tx = pool.begin().await?;

    let mut space = sqlx::query_as::<_, Space>(
        "SELECT * FROM spaces WHERE id = $1 AND business_id = $2 FOR UPDATE",
    )
    .bind(space_id)
    .bind(business_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(AppError::NotFound("Space"))?;

    request.apply(&mut space)?;

    let space = sqlx::query_as::<_, Space>(
        r#"
        UPDATE spaces
        SET name = $2, description = $3, address = $4, capacity = $5,
            hourly_rate_cents = $6, minimum_hours = $7, cleaning_fee_cents = $8,
            tax_rate_bps = $9, buffer_minutes = $10, utc_offset_minutes = $11,
            instant_book = $12, status = $13, updated_at = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(space.id)
    .bind(&space.name)
    .bind(&space.description)
    .bind(&space.address)
    .bind(space.capacity)
    .bind(space.hourly_rate_cents)
    .bind(space.minimum_hours)
    .bind(space.cleaning_fee_cents)
    .bind(space.tax_rate_bps)
    .bind(space.buffer_minutes)
    .bind(space.utc_offset_minutes)
    .bind(space.instant_book)
    .bind(&space.status)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;

    Ok(space)
}

/// Soft delete. Existing orders keep pointing at the space.
pub async fn archive_space(pool: &DbPool, business_id: Uuid, space_id: Uuid) -> Result<(), AppError> {
    let result = sqlx::query(
        "UPDATE spaces SET status = 'archived', updated_at = NOW() WHERE id = $1 AND business_id = $2",
    )
    .bind(space_id)
    .bind(business_id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Space"));
    }

    tracing::info!(business_id = %business_id, space_id = %space_id, "space archived");

    Ok(())
}

pub async fn list_pricing_rules(pool: &DbPool, space_id: Uuid) -> Result<Vec<PricingRuleRecord>, AppError> {
    let rules = sqlx::query_as::<_, PricingRuleRecord>(
        "SELECT * FROM pricing_rules WHERE space_id = $1 ORDER BY priority DESC, created_at",
    )
    .bind(space_id)
    .fetch_all(pool)
    .await?;

    Ok(rules)
}

pub async fn add_pricing_rule(
    pool: &DbPool,
    space_id: Uuid,
    request: CreatePricingRuleRequest,
) -> Result<PricingRuleRecord, AppError> {
    pricing::validate_rule(&request.rule)?;

    let record = sqlx::query_as::<_, PricingRuleRecord>(
        "INSERT INTO pricing_rules (space_id, rule, priority) VALUES ($1, $2, $3) RETURNING *",
    )
    .bind(space_id)
    .bind(Json(&request.rule))
    .bind(request.priority)
    .fetch_one(pool)
    .await?;

    Ok(record)
}

pub async fn delete_pricing_rule(pool: &DbPool, space_id: Uuid, rule_id: Uuid) -> Result<(), AppError> {
    let result = sqlx::query("DELETE FROM pricing_rules WHERE id = $1 AND space_id = $2")
        .bind(rule_id)
        .bind(space_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Pricing rule"));
    }

    Ok(())
}

/// Blackouts ending after now, in start order.
pub async fn list_blackouts(pool: &DbPool, space_id: Uuid) -> Result<Vec<Blackout>, AppError> {
    let blackouts = sqlx::query_as::<_, Blackout>(
        "SELECT * FROM blackouts WHERE space_id = $1 AND ends_at > NOW() ORDER BY starts_at",
    )
    .bind(space_id)
    .fetch_all(pool)
    .await?;

    Ok(blackouts)
}

pub async fn add_blackout(
    pool: &DbPool,
    space_id: Uuid,
    request: CreateBlackoutRequest,
) -> Result<Blackout, AppError> {
    if request.ends_at <= request.starts_at {
        return Err(AppError::invalid("ends_at must be after starts_at"));
    }

    let blackout = sqlx::query_as::<_, Blackout>(
        "INSERT INTO blackouts (space_id, starts_at, ends_at, reason) VALUES ($1, $2, $3, $4) RETURNING *",
    )
    .bind(space_id)
    .bind(request.starts_at)
    .bind(request.ends_at)
    .bind(request.reason)
    .fetch_one(pool)
    .await?;

    Ok(blackout)
}

pub async fn delete_blackout(pool: &DbPool, space_id: Uuid, blackout_id: Uuid) -> Result<(), AppError> {
    let result = sqlx::query("DELETE FROM blackouts WHERE id = $1 AND space_id = $2")
        .bind(blackout_id)
        .bind(space_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Blackout"));
    }

    Ok(())
}

/// The space's rules in the form the pricing engine takes.
pub async fn ranked_rules(pool: &DbPool, space_id: Uuid) -> Result<Vec<RankedRule>, AppError> {
    let records = list_pricing_rules(pool, space_id).await?;
    Ok(records.iter().map(RankedRule::from).collect())
}

/// Price a slot without checking availability.
pub async fn quote(pool: &DbPool, space: &Space, request: &QuoteRequest) -> Result<Quote, AppError> {
    let rules = ranked_rules(pool, space.id).await?;
    Ok(pricing::quote(&space.pricing(), &rules, request)?)
}

pub async fn availability(
    pool: &DbPool,
    space: &Space,
    query: &AvailabilityQuery,
) -> Result<AvailabilityResponse, AppError> {
    query.validate()?;

    let buffer = space.buffer();
    let busy =
        availability::load_busy(pool, space.id, query.from, query.to, buffer, None).await?;

    let window = TimeRange {
        starts_at: query.from,
        ends_at: query.to,
    };
    let minimum = Duration::hours(i64::from(space.minimum_hours.max(0)))
        .max(Duration::minutes(pricing::SLOT_GRANULARITY_MINUTES));

    Ok(AvailabilityResponse {
        from: query.from,
        to: query.to,
        buffer_minutes: space.buffer_minutes,
        minimum_hours: space.minimum_hours,
        busy: busy.iter().map(|b| b.blocked(buffer)).collect(),
        free: availability::free_slots(window, &busy, buffer, minimum),
    })
}

/// A published space, looked up by business and space slug.
pub async fn get_published_space(
    pool: &DbPool,
    business_id: Uuid,
    slug: &str,
) -> Result<Space, AppError> {
    sqlx::query_as::<_, Space>(
        "SELECT * FROM spaces WHERE business_id = $1 AND slug = $2 AND status = 'published'",
    )
    .bind(business_id)
    .bind(slug)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::NotFound("Space"))
}

pub async fn list_published_spaces(pool: &DbPool, business_id: Uuid) -> Result<Vec<Space>, AppError> {
    let spaces = sqlx::query_as::<_, Space>(
        "SELECT * FROM spaces WHERE business_id = $1 AND status = 'published' ORDER BY name",
    )
    .bind(business_id)
    .fetch_all(pool)
    .await?;

    Ok(spaces)
}

