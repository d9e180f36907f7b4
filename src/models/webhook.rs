//! Webhook models for endpoint registration and event delivery.
//!
//! # Webhook Flow
//!
//! 1. Business registers a webhook endpoint via `POST /api/v1/webhooks`,
//!    optionally restricted to a set of event types
//! 2. System generates a secret for HMAC signature verification
//! 3. When orders, payments, reviews or event syncs change, the system sends
//!    a signed payload to every subscribed endpoint
//! 4. Business verifies the signature using the secret
//!
//! # Security
//!
//! - Secrets are only shown once during registration
//! - Payloads are signed using HMAC-SHA256
//! - HTTPS is required for non-local endpoints

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Every event type the service emits.
pub const EVENT_TYPES: &[&str] = &[
    "order.created",
    "order.confirmed",
    "order.declined",
    "order.cancelled",
    "order.completed",
    "payment.recorded",
    "review.created",
    "event_sync.published",
    "event_sync.failed",
];

/// Webhook endpoint registered by a business.
///
/// # Database Table
///
/// Maps to the `webhook_endpoints` table. An empty `events` list subscribes
/// the endpoint to everything.
///
/// # Secret Storage
///
/// The `secret` is stored in plaintext (required for HMAC generation)
/// but never returned in list operations.
#[derive(Debug, Clone, FromRow)]
pub struct WebhookEndpoint {
    pub id: Uuid,
    pub business_id: Uuid,
    pub url: String,
    pub secret: String,
    pub events: Vec<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl WebhookEndpoint {
    pub fn subscribes_to(&self, event_type: &str) -> bool {
        self.events.is_empty() || self.events.iter().any(|e| e == event_type)
    }
}

/// Request to register a new webhook endpoint.
///
/// # Example
///
/// ```json
/// {
///   "url": "https://example.com/webhook",
///   "events": ["order.created", "order.confirmed"]
/// }
/// ```
///
/// # Validation
///
/// - URL must be valid HTTPS (HTTP allowed for localhost in development)
/// - URL must not exceed 2048 characters
/// - Every event must be one of [`EVENT_TYPES`]
#[derive(Debug, Deserialize)]
pub struct WebhookEndpointRequest {
    pub url: String,
    #[serde(default)]
    pub events: Vec<String>,
}

/// Response when registering or listing webhook endpoints.
///
/// The `secret` field is ONLY included when creating a new endpoint.
///
/// ```json
/// {
///   "id": "550e8400-e29b-41d4-a716-446655440000",
///   "url": "https://example.com/webhook",
///   "secret": "a1b2c3d4e5f6...",
///   "events": [],
///   "is_active": true,
///   "created_at": "2025-01-15T10:30:00Z"
/// }
/// ```
#[derive(Debug, Serialize)]
pub struct WebhookEndpointResponse {
    pub id: Uuid,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,
    pub events: Vec<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<WebhookEndpoint> for WebhookEndpointResponse {
    fn from(endpoint: WebhookEndpoint) -> Self {
        Self {
            id: endpoint.id,
            url: endpoint.url,
            secret: None,
            events: endpoint.events,
            is_active: endpoint.is_active,
            created_at: endpoint.created_at,
        }
    }
}

impl WebhookEndpointResponse {
    /// Create response with secret included (only for registration).
    pub fn with_secret(mut self, secret: String) -> Self {
        self.secret = Some(secret);
        self
    }
}

/// Webhook event delivery record (`webhook_events` table).
///
/// One row per delivery attempt, including the payload sent and the
/// endpoint's response. `response_status` is absent when the request never
/// got a response (timeout, connection refused).
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct WebhookEvent {
    pub id: Uuid,
    pub webhook_endpoint_id: Uuid,
    pub event_type: String,
    pub resource_id: Uuid,
    pub payload: serde_json::Value,
    pub sent_at: DateTime<Utc>,
    pub response_status: Option<i32>,
    pub response_body: Option<String>,
}

/// `?limit=` for the delivery log.
#[derive(Debug, Default, Deserialize)]
pub struct WebhookEventQuery {
    pub limit: Option<i64>,
}

impl WebhookEventQuery {
    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(50).clamp(1, 200)
    }
}

/// Webhook payload sent to the registered endpoint.
///
/// ```json
/// {
///   "event_type": "order.confirmed",
///   "event_id": "550e8400-e29b-41d4-a716-446655440000",
///   "created_at": "2025-01-15T10:30:00Z",
///   "data": { "id": "...", "kind": "booking", "status": "confirmed", ... }
/// }
/// ```
///
/// # Signature Verification
///
/// The request carries an `X-Webhook-Signature` header of the form
/// `sha256=<hex_encoded_hmac>`, computed as HMAC-SHA256(secret, body).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookPayload {
    pub event_type: String,

    /// Unique per delivery; also the `webhook_events` row id
    pub event_id: Uuid,

    pub created_at: DateTime<Utc>,

    /// The resource that changed, serialized as the API returns it
    pub data: serde_json::Value,
}

/// An event waiting to be fanned out to a business's endpoints.
#[derive(Debug, Clone)]
pub struct OutboundEvent {
    pub business_id: Uuid,
    pub event_type: &'static str,
    pub resource_id: Uuid,
    pub data: serde_json::Value,
}

impl OutboundEvent {
    /// Build an event from any serializable resource.
    pub fn new<T: Serialize>(
        business_id: Uuid,
        event_type: &'static str,
        resource_id: Uuid,
        resource: &T,
    ) -> Self {
        let data = match serde_json::to_value(resource) {
            Ok(value) => value,
            Err(e) => {
                tracing::error!(event_type, error = %e, "Failed to serialize webhook data");
                serde_json::Value::Null
            }
        };
        Self {
            business_id,
            event_type,
            resource_id,
            data,
        }
    }

    /// The payload for one delivery.
    pub fn payload(&self, event_id: Uuid) -> WebhookPayload {
        WebhookPayload {
            event_type: self.event_type.to_string(),
            event_id,
            created_at: Utc::now(),
            data: self.data.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoint(events: &[&str]) -> WebhookEndpoint {
        WebhookEndpoint {
            id: Uuid::new_v4(),
            business_id: Uuid::new_v4(),
            url: "https://example.com/hook".to_string(),
            secret: "s".repeat(64),
            events: events.iter().map(|e| e.to_string()).collect(),
            is_active: true,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn empty_filter_subscribes_to_everything() {
        let endpoint = endpoint(&[]);
        assert!(EVENT_TYPES.iter().all(|e| endpoint.subscribes_to(e)));
    }

    #[test]
    fn filter_limits_events() {
        let endpoint = endpoint(&["order.created"]);
        assert!(endpoint.subscribes_to("order.created"));
        assert!(!endpoint.subscribes_to("payment.recorded"));
    }

    #[test]
    fn secret_only_shown_on_creation() {
        let response = WebhookEndpointResponse::from(endpoint(&[]));
        let json = serde_json::to_value(&response).unwrap();
        assert!(json.get("secret").is_none());

        let json = serde_json::to_value(response.with_secret("abc".to_string())).unwrap();
        assert_eq!(json["secret"], "abc");
    }

    #[test]
    fn payload_carries_resource_data() {
        let event = OutboundEvent::new(
            Uuid::nil(),
            "review.created",
            Uuid::nil(),
            &serde_json::json!({ "rating": 5 }),
        );
        let payload = event.payload(Uuid::new_v4());
        assert_eq!(payload.event_type, "review.created");
        assert_eq!(payload.data["rating"], 5);
    }
}
