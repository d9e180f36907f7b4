//! Webhook service for managing endpoints and sending events.
//!
//! This module handles webhook endpoint registration, event fan-out,
//! and HMAC signature generation for secure webhook verification.
//!
//! Delivery is best-effort: [`dispatch`] returns immediately and the requests
//! run on a spawned task. A failing endpoint is logged and recorded in
//! `webhook_events`, and never affects the operation that raised the event.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use tokio::task::JoinSet;
use uuid::Uuid;

use crate::db::DbPool;
use crate::error::AppError;
use crate::models::webhook::{
    EVENT_TYPES, OutboundEvent, WebhookEndpoint, WebhookEndpointRequest, WebhookEndpointResponse,
    WebhookEvent,
};

type HmacSha256 = Hmac<Sha256>;

/// Create a new webhook endpoint.
///
/// # Process
///
/// 1. Validate URL format and event filter
/// 2. Generate cryptographically secure secret (32 bytes)
/// 3. Store endpoint in database
/// 4. Return endpoint with secret (only shown once)
pub async fn create_webhook_endpoint(
    pool: &DbPool,
    business_id: Uuid,
    request: WebhookEndpointRequest,
) -> Result<WebhookEndpointResponse, AppError> {
    validate_webhook_url(&request.url)?;
    let events = validate_events(request.events)?;

    let secret = generate_secret();

    let endpoint = sqlx::query_as::<_, WebhookEndpoint>(
        r#"
        INSERT INTO webhook_endpoints (business_id, url, secret, events)
        VALUES ($1, $2, $3, $4)
        RETURNING *
        "#,
    )
    .bind(business_id)
    .bind(&request.url)
    .bind(&secret)
    .bind(&events)
    .fetch_one(pool)
    .await?;

    tracing::info!(business_id = %business_id, endpoint_id = %endpoint.id, "webhook endpoint registered");

    Ok(WebhookEndpointResponse::from(endpoint).with_secret(secret))
}

/// List the active webhook endpoints of a business. Secrets are not returned.
pub async fn list_webhook_endpoints(
    pool: &DbPool,
    business_id: Uuid,
) -> Result<Vec<WebhookEndpointResponse>, AppError> {
    let endpoints = sqlx::query_as::<_, WebhookEndpoint>(
        "SELECT * FROM webhook_endpoints WHERE business_id = $1 AND is_active = true ORDER BY created_at DESC",
    )
    .bind(business_id)
    .fetch_all(pool)
    .await?;

    Ok(endpoints.into_iter().map(Into::into).collect())
}

/// Delete a webhook endpoint (soft delete, keeps the delivery log).
pub async fn delete_webhook_endpoint(
    pool: &DbPool,
    business_id: Uuid,
    endpoint_id: Uuid,
) -> Result<(), AppError> {
    let result = sqlx::query(
        "UPDATE webhook_endpoints SET is_active = false WHERE id = $1 AND business_id = $2 AND is_active = true",
    )
    .bind(endpoint_id)
    .bind(business_id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Webhook"));
    }

    Ok(())
}

/// Most recent delivery attempts for one of the business's endpoints.
pub async fn list_webhook_events(
    pool: &DbPool,
    business_id: Uuid,
    endpoint_id: Uuid,
    limit: i64,
) -> Result<Vec<WebhookEvent>, AppError> {
    let owned: Option<(Uuid,)> =
        sqlx::query_as("SELECT id FROM webhook_endpoints WHERE id = $1 AND business_id = $2")
            .bind(endpoint_id)
            .bind(business_id)
            .fetch_optional(pool)
            .await?;

    if owned.is_none() {
        return Err(AppError::NotFound("Webhook"));
    }

    let events = sqlx::query_as::<_, WebhookEvent>(
        r#"
        SELECT * FROM webhook_events
        WHERE webhook_endpoint_id = $1
        ORDER BY sent_at DESC
        LIMIT $2
        "#,
    )
    .bind(endpoint_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(events)
}

/// Send `event` to every subscribed endpoint of its business, in the background.
pub fn dispatch(pool: &DbPool, http: &reqwest::Client, event: OutboundEvent) {
    let pool = pool.clone();
    let http = http.clone();

    tokio::spawn(async move {
        if let Err(e) = deliver_all(&pool, &http, &event).await {
            tracing::error!(
                event_type = event.event_type,
                business_id = %event.business_id,
                error = %e,
                "webhook fan-out failed"
            );
        }
    });
}

/// Deliver to all endpoints concurrently and wait for every attempt.
async fn deliver_all(
    pool: &DbPool,
    http: &reqwest::Client,
    event: &OutboundEvent,
) -> Result<(), AppError> {
    let endpoints = sqlx::query_as::<_, WebhookEndpoint>(
        "SELECT * FROM webhook_endpoints WHERE business_id = $1 AND is_active = true",
    )
    .bind(event.business_id)
    .fetch_all(pool)
    .await?;

    let mut deliveries = JoinSet::new();
    for endpoint in endpoints
        .into_iter()
        .filter(|endpoint| endpoint.subscribes_to(event.event_type))
    {
        let pool = pool.clone();
        let http = http.clone();
        let event = event.clone();
        deliveries.spawn(async move {
            if let Err(e) = send_webhook(&pool, &http, &endpoint, &event).await {
                tracing::error!(url = %endpoint.url, error = %e, "failed to record webhook delivery");
            }
        });
    }

    while let Some(joined) = deliveries.join_next().await {
        if let Err(e) = joined {
            tracing::error!(error = %e, "webhook delivery task aborted");
        }
    }

    Ok(())
}

/// Send a single webhook with HMAC signature and record the attempt.
///
/// # Headers Sent
///
/// - `Content-Type: application/json`
/// - `X-Webhook-Signature: sha256=<hex>`
/// - `X-Webhook-Event-Id: <uuid>`
/// - `X-Webhook-Event-Type: <event type>`
async fn send_webhook(
    pool: &DbPool,
    http: &reqwest::Client,
    endpoint: &WebhookEndpoint,
    event: &OutboundEvent,
) -> Result<(), AppError> {
    let event_id = Uuid::new_v4();
    let payload = event.payload(event_id);
    let payload_json = serde_json::to_string(&payload)
        .map_err(|e| AppError::internal(format!("Failed to serialize payload: {e}")))?;

    let signature = generate_signature(&endpoint.secret, &payload_json)?;

    let response = http
        .post(&endpoint.url)
        .header("Content-Type", "application/json")
        .header("X-Webhook-Signature", &signature)
        .header("X-Webhook-Event-Id", event_id.to_string())
        .header("X-Webhook-Event-Type", event.event_type)
        .body(payload_json)
        .send()
        .await;

    let (status, body) = match response {
        Ok(resp) => {
            let status = i32::from(resp.status().as_u16());
            if !resp.status().is_success() {
                tracing::warn!(url = %endpoint.url, status, "webhook endpoint returned an error status");
            }
            (Some(status), resp.text().await.ok())
        }
        Err(e) => {
            let error_msg = format!("Request failed: {e}");
            tracing::warn!(url = %endpoint.url, "{error_msg}");
            (None, Some(error_msg))
        }
    };

    let payload_value = serde_json::to_value(&payload)
        .map_err(|e| AppError::internal(format!("Failed to serialize payload: {e}")))?;

    sqlx::query(
        r#"
        INSERT INTO webhook_events (
            id,
            webhook_endpoint_id,
            event_type,
            resource_id,
            payload,
            response_status,
            response_body
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(event_id)
    .bind(endpoint.id)
    .bind(event.event_type)
    .bind(event.resource_id)
    .bind(payload_value)
    .bind(status)
    .bind(body)
    .execute(pool)
    .await?;

    Ok(())
}

/// HMAC-SHA256 signature for a webhook body, formatted `sha256=<hex>`.
///
/// Clients should recompute HMAC-SHA256(secret, request_body) and compare in
/// constant time.
pub fn generate_signature(secret: &str, payload: &str) -> Result<String, AppError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| AppError::internal(format!("Invalid HMAC key: {e}")))?;
    mac.update(payload.as_bytes());
    Ok(format!("sha256={}", hex::encode(mac.finalize().into_bytes())))
}

/// 64 hex characters (32 random bytes).
fn generate_secret() -> String {
    let bytes: [u8; 32] = rand::random();
    hex::encode(bytes)
}

/// Validate webhook URL format.
///
/// # Rules
///
/// - Must be a valid URL
/// - Must be HTTPS (HTTP allowed for localhost during development)
/// - Maximum 2048 characters
pub fn validate_webhook_url(url: &str) -> Result<(), AppError> {
    if url.len() > 2048 {
        return Err(AppError::InvalidWebhookUrl(
            "URL exceeds 2048 characters".to_string(),
        ));
    }

    let parsed = url::Url::parse(url)
        .map_err(|_| AppError::InvalidWebhookUrl("Invalid URL format".to_string()))?;

    match parsed.scheme() {
        "https" => Ok(()),
        "http" => match parsed.host_str() {
            Some("localhost" | "127.0.0.1" | "0.0.0.0") => Ok(()),
            _ => Err(AppError::InvalidWebhookUrl(
                "HTTP is only allowed for localhost. Use HTTPS for production.".to_string(),
            )),
        },
        _ => Err(AppError::InvalidWebhookUrl(
            "URL must use HTTP or HTTPS".to_string(),
        )),
    }
}

/// Check the event filter against known types; duplicates are dropped.
fn validate_events(mut events: Vec<String>) -> Result<Vec<String>, AppError> {
    if let Some(unknown) = events.iter().find(|e| !EVENT_TYPES.contains(&e.as_str())) {
        return Err(AppError::invalid(format!(
            "Unknown event type '{unknown}'. Known types: {}",
            EVENT_TYPES.join(", ")
        )));
    }
    events.sort();
    events.dedup();
    Ok(events)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_matches_independent_hmac() {
        let signature = generate_signature("topsecret", r#"{"event_type":"order.created"}"#).unwrap();

        let mut mac = HmacSha256::new_from_slice(b"topsecret").unwrap();
        mac.update(br#"{"event_type":"order.created"}"#);
        let hex_part = signature.strip_prefix("sha256=").unwrap();
        mac.verify_slice(&hex::decode(hex_part).unwrap()).unwrap();
    }

    #[test]
    fn signature_depends_on_secret() {
        let a = generate_signature("one", "body").unwrap();
        let b = generate_signature("two", "body").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn url_rules() {
        assert!(validate_webhook_url("https://hooks.example.com/spaces").is_ok());
        assert!(validate_webhook_url("http://localhost:8080/hook").is_ok());
        assert!(validate_webhook_url("http://127.0.0.1/hook").is_ok());
        assert!(matches!(
            validate_webhook_url("http://hooks.example.com/spaces"),
            Err(AppError::InvalidWebhookUrl(_))
        ));
        assert!(validate_webhook_url("ftp://example.com").is_err());
        assert!(validate_webhook_url("not a url").is_err());
        let long = format!("https://example.com/{}", "a".repeat(2048));
        assert!(validate_webhook_url(&long).is_err());
    }

    #[test]
    fn event_filter() {
        let events = validate_events(vec![
            "order.created".to_string(),
            "payment.recorded".to_string(),
            "order.created".to_string(),
        ])
        .unwrap();
        assert_eq!(events, vec!["order.created", "payment.recorded"]);
        assert!(validate_events(vec!["order.exploded".to_string()]).is_err());
        assert!(validate_events(Vec::new()).unwrap().is_empty());
    }

    #[test]
    fn secrets_are_unique_hex() {
        let a = generate_secret();
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, generate_secret());
    }
}
