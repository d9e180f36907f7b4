//! Event sync records: publication of a listing to a connected platform.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

string_enum! {
    pub enum EventSyncStatus {
        Pending => "pending",
        Published => "published",
        Failed => "failed",
    }
}

impl EventSyncStatus {
    /// Webhook event emitted when a sync attempt ends in this status.
    pub fn event_type(self) -> Option<&'static str> {
        match self {
            EventSyncStatus::Published => Some("event_sync.published"),
            EventSyncStatus::Failed => Some("event_sync.failed"),
            EventSyncStatus::Pending => None,
        }
    }
}

/// Represents an event sync record from the database.
///
/// One record per (listing, account) pair; retries update it in place and
/// increment `attempts`.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct EventSync {
    pub id: Uuid,
    #[serde(skip_serializing)]
    pub business_id: Uuid,
    pub listing_id: Uuid,
    pub social_account_id: Uuid,
    pub status: String,
    pub external_event_id: Option<String>,
    pub external_url: Option<String>,
    pub last_error: Option<String>,
    pub attempts: i32,
    pub last_attempt_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// ```json
/// { "social_account_id": "550e8400-e29b-41d4-a716-446655440000" }
/// ```
#[derive(Debug, Deserialize)]
pub struct CreateEventSyncRequest {
    pub social_account_id: Uuid,
}

/// Event data handed to a platform client.
#[derive(Debug, Clone, Serialize)]
pub struct EventDetails {
    pub title: String,
    pub description: String,
    pub starts_at: DateTime<Utc>,
    pub ends_at: Option<DateTime<Utc>>,
    pub price_cents: i64,
    pub currency: String,
    /// Public page of the listing
    pub url: String,
}

/// What the platform returned for a published event.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PublishedEvent {
    pub external_event_id: String,
    pub external_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_finished_attempts_emit_events() {
        assert_eq!(
            EventSyncStatus::Published.event_type(),
            Some("event_sync.published")
        );
        assert_eq!(EventSyncStatus::Failed.event_type(), Some("event_sync.failed"));
        assert_eq!(EventSyncStatus::Pending.event_type(), None);
    }
}
