//! Order data models: space bookings and listing purchases.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::AppError,
    models::{
        payment::{Payment, PaymentSummary},
        require_text,
    },
};

string_enum! {
    pub enum OrderKind {
        /// A time slot in a space
        Booking => "booking",
        /// Units of a listing
        Purchase => "purchase",
    }
}

string_enum! {
    /// Lifecycle of an order.
    ///
    /// ```text
    /// pending ──► confirmed ──► completed
    ///    │            │
    ///    ├──► declined└──► cancelled
    ///    └──► cancelled
    /// ```
    pub enum OrderStatus {
        Pending => "pending",
        Confirmed => "confirmed",
        Declined => "declined",
        Cancelled => "cancelled",
        Completed => "completed",
    }
}

impl OrderStatus {
    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (Pending, Confirmed)
                | (Pending, Declined)
                | (Pending, Cancelled)
                | (Confirmed, Cancelled)
                | (Confirmed, Completed)
        )
    }

    /// Statuses in which the order still holds its slot or inventory.
    pub fn holds_capacity(self) -> bool {
        matches!(
            self,
            OrderStatus::Pending | OrderStatus::Confirmed | OrderStatus::Completed
        )
    }

    /// Webhook event emitted when an order enters this status.
    pub fn event_type(self) -> &'static str {
        match self {
            OrderStatus::Pending => "order.created",
            OrderStatus::Confirmed => "order.confirmed",
            OrderStatus::Declined => "order.declined",
            OrderStatus::Cancelled => "order.cancelled",
            OrderStatus::Completed => "order.completed",
        }
    }
}

/// Represents an order record from the database.
///
/// Bookings carry `space_id`, `starts_at`, `ends_at` and `guests`; purchases
/// carry `listing_id` and `quantity`. The database CHECK constraint enforces
/// which columns are present for each kind.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct Order {
    pub id: Uuid,
    #[serde(skip_serializing)]
    pub business_id: Uuid,
    pub kind: String,
    pub space_id: Option<Uuid>,
    pub listing_id: Option<Uuid>,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    pub guests: Option<i32>,
    pub quantity: Option<i32>,
    pub customer_name: String,
    pub customer_email: String,
    pub notes: Option<String>,
    pub status: String,
    pub subtotal_cents: i64,
    pub tax_cents: i64,
    pub total_cents: i64,
    pub currency: String,
    /// Quote snapshot taken when the booking was placed
    pub quote: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn order_status(&self) -> Result<OrderStatus, AppError> {
        self.status.parse()
    }

    pub fn order_kind(&self) -> Result<OrderKind, AppError> {
        self.kind.parse()
    }
}

/// Customer details shared by bookings and purchases.
#[derive(Debug, Deserialize)]
pub struct CustomerDetails {
    pub customer_name: String,
    pub customer_email: String,
    pub notes: Option<String>,
}

impl CustomerDetails {
    pub fn validate(&mut self) -> Result<(), AppError> {
        self.customer_name = require_text("customer_name", &self.customer_name)?;
        self.customer_email = validate_email(&self.customer_email)?;
        if self.notes.as_ref().is_some_and(|notes| notes.len() > 4_000) {
            return Err(AppError::invalid("notes cannot exceed 4000 characters"));
        }
        Ok(())
    }
}

/// Public booking request for a space.
///
/// ```json
/// {
///   "starts_at": "2025-03-14T18:00:00Z",
///   "ends_at": "2025-03-14T22:00:00Z",
///   "guests": 40,
///   "customer_name": "Ada Lovelace",
///   "customer_email": "ada@example.com"
/// }
/// ```
#[derive(Debug, Deserialize)]
pub struct BookingRequest {
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub guests: i32,
    #[serde(flatten)]
    pub customer: CustomerDetails,
}

/// Public purchase request for a listing.
#[derive(Debug, Deserialize)]
pub struct PurchaseRequest {
    #[serde(default = "default_quantity")]
    pub quantity: i32,
    #[serde(flatten)]
    pub customer: CustomerDetails,
}

fn default_quantity() -> i32 {
    1
}

/// Business request to move an order to a new status.
#[derive(Debug, Deserialize)]
pub struct StatusChangeRequest {
    pub status: OrderStatus,
}

/// Filters for `GET /api/v1/orders`.
#[derive(Debug, Default, Deserialize)]
pub struct OrderListQuery {
    pub status: Option<OrderStatus>,
    pub kind: Option<OrderKind>,
    pub space_id: Option<Uuid>,
    pub listing_id: Option<Uuid>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl OrderListQuery {
    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(50).clamp(1, 200)
    }

    pub fn offset(&self) -> i64 {
        self.offset.unwrap_or(0).max(0)
    }
}

/// Order with its payments, returned by `GET /api/v1/orders/{id}`.
#[derive(Debug, Serialize)]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: Order,
    pub payments: Vec<Payment>,
    pub payment: PaymentSummary,
}

/// Minimal email sanity check; lowercases the address.
pub fn validate_email(email: &str) -> Result<String, AppError> {
    let email = email.trim().to_lowercase();
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.contains(char::is_whitespace)
                && email.len() <= 254
        }
        None => false,
    };

    if valid {
        Ok(email)
    } else {
        Err(AppError::invalid(format!("Invalid email address '{email}'")))
    }
}
