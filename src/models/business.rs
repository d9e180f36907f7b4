//! Business (tenant) model.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// A tenant of the marketplace. Every space, listing, order and integration
/// belongs to exactly one business.
///
/// The `slug` is the business's segment in public URLs: `/public/{slug}/...`.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct Business {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub created_at: DateTime<Utc>,
}
