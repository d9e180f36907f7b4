//! Space data models: bookable venues, their pricing rules and blackouts.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use uuid::Uuid;

use crate::{
    error::AppError,
    models::{normalize_currency, require_text, validate_amount, validate_slug},
    services::{
        availability::TimeRange,
        pricing::{PricingRule, RankedRule, SpacePricing},
    },
};

string_enum! {
    /// Publication state of a space or listing.
    pub enum PublishStatus {
        Draft => "draft",
        Published => "published",
        Archived => "archived",
    }
}

impl PublishStatus {
    /// Archived is terminal; everything else may move freely.
    pub fn can_transition_to(self, next: PublishStatus) -> bool {
        self == next || self != PublishStatus::Archived
    }
}

/// Represents a space record from the database.
///
/// # Database Table
///
/// Maps to the `spaces` table. Each space:
/// - Belongs to one business (via `business_id`)
/// - Is priced per hour in cents, with optional pricing rules
/// - Evaluates time-of-week rules in its own local time (`utc_offset_minutes`)
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct Space {
    pub id: Uuid,

    #[serde(skip_serializing)]
    pub business_id: Uuid,

    /// URL segment, unique per business
    pub slug: String,

    pub name: String,
    pub description: String,
    pub address: String,

    /// Maximum number of guests
    pub capacity: i32,

    pub hourly_rate_cents: i64,

    /// Shortest bookable duration, in hours
    pub minimum_hours: i32,

    pub cleaning_fee_cents: i64,

    /// Tax rate in basis points (825 = 8.25%)
    pub tax_rate_bps: i32,

    /// Turnover time kept free before and after every booking
    pub buffer_minutes: i32,

    /// Offset of the venue's local time from UTC, used by time-window pricing rules
    pub utc_offset_minutes: i32,

    /// Booking requests are confirmed immediately when set
    pub instant_book: bool,

    pub currency: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Space {
    pub fn pricing(&self) -> SpacePricing {
        SpacePricing {
            hourly_rate_cents: self.hourly_rate_cents,
            minimum_hours: self.minimum_hours,
            capacity: self.capacity,
            cleaning_fee_cents: self.cleaning_fee_cents,
            tax_rate_bps: self.tax_rate_bps,
            utc_offset_minutes: self.utc_offset_minutes,
            currency: self.currency.clone(),
        }
    }

    pub fn buffer(&self) -> Duration {
        Duration::minutes(i64::from(self.buffer_minutes))
    }

    pub fn publish_status(&self) -> Result<PublishStatus, AppError> {
        self.status.parse()
    }
}

/// Request body for creating a space.
///
/// ```json
/// {
///   "slug": "rooftop-loft",
///   "name": "Rooftop Loft",
///   "capacity": 60,
///   "hourly_rate_cents": 15000,
///   "minimum_hours": 2,
///   "cleaning_fee_cents": 7500,
///   "tax_rate_bps": 825,
///   "buffer_minutes": 30,
///   "utc_offset_minutes": -300
/// }
/// ```
#[derive(Debug, Deserialize)]
pub struct CreateSpaceRequest {
    pub slug: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub address: String,
    pub capacity: i32,
    pub hourly_rate_cents: i64,
    #[serde(default = "default_minimum_hours")]
    pub minimum_hours: i32,
    #[serde(default)]
    pub cleaning_fee_cents: i64,
    #[serde(default)]
    pub tax_rate_bps: i32,
    #[serde(default)]
    pub buffer_minutes: i32,
    #[serde(default)]
    pub utc_offset_minutes: i32,
    #[serde(default)]
    pub instant_book: bool,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default = "default_status")]
    pub status: PublishStatus,
}

fn default_minimum_hours() -> i32 {
    1
}

fn default_currency() -> String {
    "USD".to_string()
}

fn default_status() -> PublishStatus {
    PublishStatus::Draft
}

/// Partial update; absent fields are left unchanged.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateSpaceRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub address: Option<String>,
    pub capacity: Option<i32>,
    pub hourly_rate_cents: Option<i64>,
    pub minimum_hours: Option<i32>,
    pub cleaning_fee_cents: Option<i64>,
    pub tax_rate_bps: Option<i32>,
    pub buffer_minutes: Option<i32>,
    pub utc_offset_minutes: Option<i32>,
    pub instant_book: Option<bool>,
    pub status: Option<PublishStatus>,
}

/// Numeric fields shared by create and update validation.
pub struct SpaceNumbers {
    pub capacity: i32,
    pub hourly_rate_cents: i64,
    pub minimum_hours: i32,
    pub cleaning_fee_cents: i64,
    pub tax_rate_bps: i32,
    pub buffer_minutes: i32,
    pub utc_offset_minutes: i32,
}

impl SpaceNumbers {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.capacity < 1 {
            return Err(AppError::invalid("capacity must be at least 1"));
        }
        validate_amount("hourly_rate_cents", self.hourly_rate_cents)?;
        validate_amount("cleaning_fee_cents", self.cleaning_fee_cents)?;
        if !(0..=24 * 30).contains(&self.minimum_hours) {
            return Err(AppError::invalid("minimum_hours must be between 0 and 720"));
        }
        if !(0..=10_000).contains(&self.tax_rate_bps) {
            return Err(AppError::invalid("tax_rate_bps must be between 0 and 10000"));
        }
        if !(0..=24 * 60).contains(&self.buffer_minutes) {
            return Err(AppError::invalid("buffer_minutes must be between 0 and 1440"));
        }
        if !(-840..=840).contains(&self.utc_offset_minutes) {
            return Err(AppError::invalid(
                "utc_offset_minutes must be between -840 and 840",
            ));
        }
        Ok(())
    }
}

impl CreateSpaceRequest {
    /// Validate and normalise the request in place.
    pub fn validate(&mut self) -> Result<(), AppError> {
        validate_slug(&self.slug)?;
        self.name = require_text("name", &self.name)?;
        self.currency = normalize_currency(&self.currency)?;
        if self.status == PublishStatus::Archived {
            return Err(AppError::invalid("A new space cannot be archived"));
        }
        SpaceNumbers {
            capacity: self.capacity,
            hourly_rate_cents: self.hourly_rate_cents,
            minimum_hours: self.minimum_hours,
            cleaning_fee_cents: self.cleaning_fee_cents,
            tax_rate_bps: self.tax_rate_bps,
            buffer_minutes: self.buffer_minutes,
            utc_offset_minutes: self.utc_offset_minutes,
        }
        .validate()
    }
}

impl UpdateSpaceRequest {
    /// Merge the update over the current row and validate the result.
    pub fn apply(self, space: &mut Space) -> Result<(), AppError> {
        if let Some(status) = self.status {
            let current = space.publish_status()?;
            if !current.can_transition_to(status) {
                return Err(AppError::conflict(format!(
                    "Cannot change status from {current} to {status}"
                )));
            }
            space.status = status.to_string();
        }
        if let Some(name) = self.name {
            space.name = require_text("name", &name)?;
        }
        if let Some(description) = self.description {
            space.description = description;
        }
        if let Some(address) = self.address {
            space.address = address;
        }
        space.capacity = self.capacity.unwrap_or(space.capacity);
        space.hourly_rate_cents = self.hourly_rate_cents.unwrap_or(space.hourly_rate_cents);
        space.minimum_hours = self.minimum_hours.unwrap_or(space.minimum_hours);
        space.cleaning_fee_cents = self.cleaning_fee_cents.unwrap_or(space.cleaning_fee_cents);
        space.tax_rate_bps = self.tax_rate_bps.unwrap_or(space.tax_rate_bps);
        space.buffer_minutes = self.buffer_minutes.unwrap_or(space.buffer_minutes);
        space.utc_offset_minutes = self.utc_offset_minutes.unwrap_or(space.utc_offset_minutes);
        space.instant_book = self.instant_book.unwrap_or(space.instant_book);

        SpaceNumbers {
            capacity: space.capacity,
            hourly_rate_cents: space.hourly_rate_cents,
            minimum_hours: space.minimum_hours,
            cleaning_fee_cents: space.cleaning_fee_cents,
            tax_rate_bps: space.tax_rate_bps,
            buffer_minutes: space.buffer_minutes,
            utc_offset_minutes: space.utc_offset_minutes,
        }
        .validate()
    }
}

/// Pricing rule row (`pricing_rules` table). The rule itself is JSONB.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct PricingRuleRecord {
    pub id: Uuid,
    pub space_id: Uuid,
    pub rule: Json<PricingRule>,
    pub priority: i32,
    pub created_at: DateTime<Utc>,
}

impl From<&PricingRuleRecord> for RankedRule {
    fn from(record: &PricingRuleRecord) -> Self {
        RankedRule {
            priority: record.priority,
            rule: record.rule.0.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreatePricingRuleRequest {
    pub rule: PricingRule,
    #[serde(default)]
    pub priority: i32,
}

/// A period in which a space cannot be booked (maintenance, private use).
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct Blackout {
    pub id: Uuid,
    pub space_id: Uuid,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreateBlackoutRequest {
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub reason: Option<String>,
}

/// `?from=...&to=...` window for availability queries.
#[derive(Debug, Deserialize)]
pub struct AvailabilityQuery {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl AvailabilityQuery {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.to <= self.from {
            return Err(AppError::invalid("'to' must be after 'from'"));
        }
        if self.to - self.from > Duration::days(62) {
            return Err(AppError::invalid("Availability window cannot exceed 62 days"));
        }
        Ok(())
    }
}

/// Busy and free time of a space within a window.
#[derive(Debug, Serialize)]
pub struct AvailabilityResponse {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    pub buffer_minutes: i32,
    pub minimum_hours: i32,
    /// Blocked ranges, bookings widened by the turnover buffer
    pub busy: Vec<TimeRange>,
    /// Gaps long enough for a minimum-length booking
    pub free: Vec<TimeRange>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn space() -> Space {
        Space {
            id: Uuid::new_v4(),
            business_id: Uuid::new_v4(),
            slug: "loft".to_string(),
            name: "Loft".to_string(),
            description: String::new(),
            address: String::new(),
            capacity: 20,
            hourly_rate_cents: 5_000,
            minimum_hours: 1,
            cleaning_fee_cents: 0,
            tax_rate_bps: 0,
            buffer_minutes: 0,
            utc_offset_minutes: 0,
            instant_book: false,
            currency: "USD".to_string(),
            status: "draft".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn archived_is_terminal() {
        assert!(PublishStatus::Draft.can_transition_to(PublishStatus::Published));
        assert!(PublishStatus::Published.can_transition_to(PublishStatus::Draft));
        assert!(PublishStatus::Published.can_transition_to(PublishStatus::Archived));
        assert!(!PublishStatus::Archived.can_transition_to(PublishStatus::Published));
    }

    #[test]
    fn update_merges_and_validates() {
        let mut space = space();
        UpdateSpaceRequest {
            capacity: Some(80),
            status: Some(PublishStatus::Published),
            ..Default::default()
        }
        .apply(&mut space)
        .unwrap();
        assert_eq!(space.capacity, 80);
        assert_eq!(space.status, "published");
        assert_eq!(space.hourly_rate_cents, 5_000);

        let err = UpdateSpaceRequest {
            tax_rate_bps: Some(20_000),
            ..Default::default()
        }
        .apply(&mut space);
        assert!(matches!(err, Err(AppError::InvalidRequest(_))));
    }

    #[test]
    fn create_rejects_bad_input() {
        let mut request: CreateSpaceRequest = serde_json::from_value(serde_json::json!({
            "slug": "rooftop-loft",
            "name": "  Rooftop  ",
            "capacity": 60,
            "hourly_rate_cents": 15000,
            "currency": "usd"
        }))
        .unwrap();
        request.validate().unwrap();
        assert_eq!(request.name, "Rooftop");
        assert_eq!(request.currency, "USD");
        assert_eq!(request.status, PublishStatus::Draft);

        request.capacity = 0;
        assert!(request.validate().is_err());
    }

    #[test]
    fn prices_are_capped() {
        let mut space = space();
        let result = UpdateSpaceRequest {
            hourly_rate_cents: Some(i64::MAX / 4),
            ..Default::default()
        }
        .apply(&mut space);
        assert!(matches!(result, Err(AppError::InvalidRequest(_))));

        let result = UpdateSpaceRequest {
            hourly_rate_cents: Some(5_000),
            cleaning_fee_cents: Some(i64::MAX / 2),
            ..Default::default()
        }
        .apply(&mut space);
        assert!(matches!(result, Err(AppError::InvalidRequest(_))));

        // A rejected update leaves the merged values behind, so reset both fields.
        UpdateSpaceRequest {
            hourly_rate_cents: Some(crate::models::MAX_AMOUNT_CENTS),
            cleaning_fee_cents: Some(0),
            ..Default::default()
        }
        .apply(&mut space)
        .unwrap();
    }
}
