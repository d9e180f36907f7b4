//! Event syncs: publishing listings to connected event platforms.
//!
//! A sync is attempted immediately on creation and again on every retry.
//! Each attempt increments `attempts`; the outcome is stored on the record and
//! announced with an `event_sync.published` or `event_sync.failed` webhook.

use chrono::Utc;
use uuid::Uuid;

use crate::{
    db::DbPool,
    error::AppError,
    models::{
        event_sync::{CreateEventSyncRequest, EventDetails, EventSync, EventSyncStatus},
        listing::Listing,
        social_account::SocialAccount,
        space::PublishStatus,
        webhook::OutboundEvent,
    },
    services::{listing_service, seo, social_service, token_status::TokenStatus, webhook_service},
    state::AppState,
};

pub async fn list_syncs(
    pool: &DbPool,
    business_id: Uuid,
    listing_id: Uuid,
) -> Result<Vec<EventSync>, AppError> {
    listing_service::get_listing(pool, business_id, listing_id).await?;

    let syncs = sqlx::query_as::<_, EventSync>(
        "SELECT * FROM event_syncs WHERE listing_id = $1 AND business_id = $2 ORDER BY created_at",
    )
    .bind(listing_id)
    .bind(business_id)
    .fetch_all(pool)
    .await?;

    Ok(syncs)
}

/// Create the sync record for (listing, account) and make the first attempt.
///
/// # Errors
///
/// - `Conflict`: the listing already has a sync for this account
/// - `Unprocessable`: listing not publishable, or account token not usable
///   (the record is kept as `failed`)
/// - `Upstream`: the platform rejected the event (record kept as `failed`)
pub async fn create_sync(
    state: &AppState,
    business_id: Uuid,
    listing_id: Uuid,
    request: CreateEventSyncRequest,
) -> Result<EventSync, AppError> {
    let listing = listing_service::get_listing(&state.pool, business_id, listing_id).await?;
    ensure_publishable(&listing)?;
    let account =
        social_service::get_account(&state.pool, business_id, request.social_account_id).await?;

    let sync = sqlx::query_as::<_, EventSync>(
        r#"
        INSERT INTO event_syncs (business_id, listing_id, social_account_id)
        VALUES ($1, $2, $3)
        RETURNING *
        "#,
    )
    .bind(business_id)
    .bind(listing.id)
    .bind(account.id)
    .fetch_one(&state.pool)
    .await?;

    attempt(state, sync, &listing, &account).await
}

/// Attempt a failed or pending sync again.
pub async fn retry_sync(state: &AppState, business_id: Uuid, sync_id: Uuid) -> Result<EventSync, AppError> {
    let sync = get_sync(&state.pool, business_id, sync_id).await?;
    if sync.status == EventSyncStatus::Published.as_str() {
        return Err(AppError::conflict("Event is already published"));
    }

    let listing = listing_service::get_listing(&state.pool, business_id, sync.listing_id).await?;
    ensure_publishable(&listing)?;
    let account =
        social_service::get_account(&state.pool, business_id, sync.social_account_id).await?;

    attempt(state, sync, &listing, &account).await
}

/// Remove the sync record. The event on the platform is left untouched.
pub async fn delete_sync(pool: &DbPool, business_id: Uuid, sync_id: Uuid) -> Result<(), AppError> {
    let result = sqlx::query("DELETE FROM event_syncs WHERE id = $1 AND business_id = $2")
        .bind(sync_id)
        .bind(business_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Event sync"));
    }

    Ok(())
}

async fn get_sync(pool: &DbPool, business_id: Uuid, sync_id: Uuid) -> Result<EventSync, AppError> {
    sqlx::query_as::<_, EventSync>("SELECT * FROM event_syncs WHERE id = $1 AND business_id = $2")
        .bind(sync_id)
        .bind(business_id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound("Event sync"))
}

/// Only published listings with an event time can be pushed to a platform.
fn ensure_publishable(listing: &Listing) -> Result<(), AppError> {
    if listing.publish_status()? != PublishStatus::Published {
        return Err(AppError::unprocessable("Only published listings can be synced"));
    }
    if listing.starts_at.is_none() {
        return Err(AppError::unprocessable(
            "Listing needs a start time to be published as an event",
        ));
    }
    Ok(())
}

async fn attempt(
    state: &AppState,
    sync: EventSync,
    listing: &Listing,
    account: &SocialAccount,
) -> Result<EventSync, AppError> {
    let health = account.health(Utc::now(), state.config.token_warning_window());
    let access_token = match &account.access_token_enc {
        Some(sealed) if health.status.is_usable() => match state.cipher.decrypt(sealed) {
            Ok(token) => token,
            Err(e) => {
                let reason = "Stored access token is unreadable".to_string();
                let failed = finish(state, &sync, Err(reason)).await?;
                tracing::error!(sync_id = %failed.id, error = %e, "access token decrypt failed");
                return Err(e);
            }
        },
        _ => {
            let reason = format!("Account token is {}", status_label(health.status));
            let failed = finish(state, &sync, Err(reason.clone())).await?;
            tracing::warn!(sync_id = %failed.id, reason = %reason, "event sync blocked");
            return Err(AppError::unprocessable(reason));
        }
    };

    let platform = account.social_platform()?;
    let business_slug = seo::business_slug(&state.pool, listing.business_id).await?;
    let details = event_details(listing, state.config.base_url(), &business_slug);

    let outcome = state
        .platforms
        .publish_event(platform, &account.external_account_id, &access_token, &details)
        .await;

    match outcome {
        Ok(published) => {
            let sync = finish(
                state,
                &sync,
                Ok((published.external_event_id, published.external_url)),
            )
            .await?;
            tracing::info!(sync_id = %sync.id, platform = %platform, "event published");
            Ok(sync)
        }
        Err(e) => {
            finish(state, &sync, Err(e.to_string())).await?;
            tracing::warn!(sync_id = %sync.id, platform = %platform, error = %e, "event publish failed");
            Err(e.into())
        }
    }
}

/// Store the outcome of an attempt and announce it.
async fn finish(
    state: &AppState,
    sync: &EventSync,
    outcome: Result<(String, Option<String>), String>,
) -> Result<EventSync, AppError> {
    let (status, external_id, external_url, error) = match outcome {
        Ok((id, url)) => (EventSyncStatus::Published, Some(id), url, None),
        Err(reason) => (EventSyncStatus::Failed, None, None, Some(reason)),
    };

    let updated = sqlx::query_as::<_, EventSync>(
        r#"
        UPDATE event_syncs
        SET status = $2,
            external_event_id = COALESCE($3, external_event_id),
            external_url = COALESCE($4, external_url),
            last_error = $5,
            attempts = attempts + 1,
            last_attempt_at = NOW(),
            updated_at = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(sync.id)
    .bind(status.as_str())
    .bind(external_id)
    .bind(external_url)
    .bind(error)
    .fetch_one(&state.pool)
    .await?;

    if let Some(event_type) = status.event_type() {
        webhook_service::dispatch(
            &state.pool,
            &state.http,
            OutboundEvent::new(updated.business_id, event_type, updated.id, &updated),
        );
    }

    Ok(updated)
}

fn event_details(listing: &Listing, base_url: &str, business_slug: &str) -> EventDetails {
    EventDetails {
        title: listing.title.clone(),
        description: listing.description.clone(),
        starts_at: listing.starts_at.unwrap_or(listing.created_at),
        ends_at: listing.ends_at,
        price_cents: listing.price_cents,
        currency: listing.currency.clone(),
        url: seo::listing_url(base_url, business_slug, &listing.slug),
    }
}

fn status_label(status: TokenStatus) -> &'static str {
    match status {
        TokenStatus::Active => "active",
        TokenStatus::ExpiringSoon => "expiring soon",
        TokenStatus::Expired => "expired",
        TokenStatus::Error => "in an error state",
        TokenStatus::Disconnected => "disconnected",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn listing() -> Listing {
        let created = Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap();
        Listing {
            id: Uuid::new_v4(),
            business_id: Uuid::new_v4(),
            space_id: None,
            slug: "jazz-night".to_string(),
            title: "Jazz Night".to_string(),
            description: "Live trio".to_string(),
            price_cents: 2_500,
            currency: "USD".to_string(),
            inventory: Some(80),
            status: "published".to_string(),
            starts_at: Some(created + Duration::days(13)),
            ends_at: None,
            created_at: created,
            updated_at: created,
        }
    }

    #[test]
    fn only_published_scheduled_listings_sync() {
        let mut listing = listing();
        assert!(ensure_publishable(&listing).is_ok());

        listing.starts_at = None;
        assert!(matches!(
            ensure_publishable(&listing),
            Err(AppError::Unprocessable(_))
        ));

        let mut draft = self::listing();
        draft.status = "draft".to_string();
        assert!(ensure_publishable(&draft).is_err());
    }

    #[test]
    fn details_link_back_to_public_page() {
        let details = event_details(&listing(), "https://spaces.example.com", "loft-co");
        assert_eq!(
            details.url,
            "https://spaces.example.com/loft-co/listings/jazz-night"
        );
        assert_eq!(details.title, "Jazz Night");
    }
}
