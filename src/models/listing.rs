//! Listing data models: quantity-based offerings (packages, tickets, add-ons).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::AppError,
    models::{
        normalize_currency, require_text, space::PublishStatus, validate_amount, validate_slug,
    },
};

/// Represents a listing record from the database.
///
/// `inventory` is the number of units left; `None` means unlimited.
/// A listing may be tied to a space (e.g. a "Friday jazz night" held in it)
/// and may carry event times, which event syncs publish to external platforms.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct Listing {
    pub id: Uuid,
    #[serde(skip_serializing)]
    pub business_id: Uuid,
    pub space_id: Option<Uuid>,
    pub slug: String,
    pub title: String,
    pub description: String,
    pub price_cents: i64,
    pub currency: String,
    pub inventory: Option<i32>,
    pub status: String,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Listing {
    pub fn publish_status(&self) -> Result<PublishStatus, AppError> {
        self.status.parse()
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateListingRequest {
    pub slug: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub space_id: Option<Uuid>,
    pub price_cents: i64,
    #[serde(default = "default_currency")]
    pub currency: String,
    pub inventory: Option<i32>,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    #[serde(default = "default_status")]
    pub status: PublishStatus,
}

fn default_currency() -> String {
    "USD".to_string()
}

fn default_status() -> PublishStatus {
    PublishStatus::Draft
}

/// Partial update. `inventory: null` is distinguished from an absent field
/// by `clear_inventory`.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateListingRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub price_cents: Option<i64>,
    pub inventory: Option<i32>,
    #[serde(default)]
    pub clear_inventory: bool,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    pub status: Option<PublishStatus>,
}

fn validate_schedule(
    starts_at: Option<DateTime<Utc>>,
    ends_at: Option<DateTime<Utc>>,
) -> Result<(), AppError> {
    match (starts_at, ends_at) {
        (Some(start), Some(end)) if end <= start => {
            Err(AppError::invalid("ends_at must be after starts_at"))
        }
        (None, Some(_)) => Err(AppError::invalid("ends_at requires starts_at")),
        _ => Ok(()),
    }
}

impl CreateListingRequest {
    pub fn validate(&mut self) -> Result<(), AppError> {
        validate_slug(&self.slug)?;
        self.title = require_text("title", &self.title)?;
        self.currency = normalize_currency(&self.currency)?;
        validate_amount("price_cents", self.price_cents)?;
        if self.inventory.is_some_and(|n| n < 0) {
            return Err(AppError::invalid("inventory cannot be negative"));
        }
        if self.status == PublishStatus::Archived {
            return Err(AppError::invalid("A new listing cannot be archived"));
        }
        validate_schedule(self.starts_at, self.ends_at)
    }
}

impl UpdateListingRequest {
    pub fn apply(self, listing: &mut Listing) -> Result<(), AppError> {
        if let Some(status) = self.status {
            let current = listing.publish_status()?;
            if !current.can_transition_to(status) {
                return Err(AppError::conflict(format!(
                    "Cannot change status from {current} to {status}"
                )));
            }
            listing.status = status.to_string();
        }
        if let Some(title) = self.title {
            listing.title = require_text("title", &title)?;
        }
        if let Some(description) = self.description {
            listing.description = description;
        }
        if let Some(price) = self.price_cents {
            validate_amount("price_cents", price)?;
            listing.price_cents = price;
        }
        if self.clear_inventory {
            listing.inventory = None;
        } else if let Some(inventory) = self.inventory {
            if inventory < 0 {
                return Err(AppError::invalid("inventory cannot be negative"));
            }
            listing.inventory = Some(inventory);
        }
        if self.starts_at.is_some() {
            listing.starts_at = self.starts_at;
        }
        if self.ends_at.is_some() {
            listing.ends_at = self.ends_at;
        }
        validate_schedule(listing.starts_at, listing.ends_at)
    }
}
