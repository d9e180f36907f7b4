//! Customer review models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{error::AppError, models::require_text};

string_enum! {
    /// Moderation state. New reviews wait for the business to publish them.
    pub enum ReviewStatus {
        Pending => "pending",
        Published => "published",
        Hidden => "hidden",
    }
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct Review {
    pub id: Uuid,
    #[serde(skip_serializing)]
    pub business_id: Uuid,
    pub order_id: Uuid,
    pub space_id: Option<Uuid>,
    pub listing_id: Option<Uuid>,
    pub rating: i32,
    pub author_name: String,
    pub body: String,
    pub status: String,
    pub business_reply: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Review submitted from the public site. The email must match the order's.
#[derive(Debug, Deserialize)]
pub struct SubmitReviewRequest {
    pub order_id: Uuid,
    pub customer_email: String,
    pub rating: i32,
    pub author_name: Option<String>,
    #[serde(default)]
    pub body: String,
}

impl SubmitReviewRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        if !(1..=5).contains(&self.rating) {
            return Err(AppError::invalid("rating must be between 1 and 5"));
        }
        if self.body.len() > 5_000 {
            return Err(AppError::invalid("review body cannot exceed 5000 characters"));
        }
        if let Some(name) = &self.author_name {
            require_text("author_name", name)?;
        }
        Ok(())
    }
}

/// Business moderation: change status and/or set a public reply.
#[derive(Debug, Deserialize)]
pub struct ModerateReviewRequest {
    pub status: Option<ReviewStatus>,
    pub business_reply: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ReviewListQuery {
    pub status: Option<ReviewStatus>,
    pub space_id: Option<Uuid>,
}

/// Published review as shown on the public site.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct PublicReview {
    pub id: Uuid,
    pub rating: i32,
    pub author_name: String,
    pub body: String,
    pub business_reply: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct PublicReviewList {
    pub count: usize,
    pub average_rating: Option<f64>,
    pub reviews: Vec<PublicReview>,
}

impl PublicReviewList {
    pub fn new(reviews: Vec<PublicReview>) -> Self {
        let count = reviews.len();
        let average_rating = average(reviews.iter().map(|r| r.rating));
        Self {
            count,
            average_rating,
            reviews,
        }
    }
}

/// Mean rating rounded to two decimals, `None` without ratings.
pub fn average(ratings: impl Iterator<Item = i32>) -> Option<f64> {
    let (sum, count) = ratings.fold((0i64, 0i64), |(s, c), r| (s + i64::from(r), c + 1));
    (count > 0).then(|| ((sum as f64 / count as f64) * 100.0).round() / 100.0)
}
