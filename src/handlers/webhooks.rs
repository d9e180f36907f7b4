//! HTTP handlers for webhook endpoint management.
//!
//! Businesses register, list and delete the endpoints that receive order,
//! payment, review and event-sync notifications, and read the delivery log.

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use crate::db::DbPool;
use crate::error::AppError;
use crate::middleware::auth::AuthContext;
use crate::models::webhook::{
    WebhookEndpointRequest, WebhookEndpointResponse, WebhookEvent, WebhookEventQuery,
};
use crate::services::webhook_service;

/// Register a new webhook endpoint.
///
/// # Request Body
///
/// ```json
/// {
///   "url": "https://example.com/webhook",
///   "events": ["order.created", "order.confirmed"]
/// }
/// ```
///
/// Omit `events` (or send an empty list) to receive every event type.
///
/// # Response
///
/// Returns 201 Created with the endpoint. The `secret` is only returned
/// here; use it to verify `X-Webhook-Signature`.
///
/// ```json
/// {
///   "id": "550e8400-e29b-41d4-a716-446655440000",
///   "url": "https://example.com/webhook",
///   "secret": "a1b2c3d4e5f6...",
///   "events": ["order.confirmed", "order.created"],
///   "is_active": true,
///   "created_at": "2025-01-15T10:30:00Z"
/// }
/// ```
///
/// # Security
///
/// - HTTPS URLs required (HTTP localhost allowed for development)
/// - Secret is a 64-character hex string for HMAC-SHA256
pub async fn create_webhook(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Json(request): Json<WebhookEndpointRequest>,
) -> Result<impl IntoResponse, AppError> {
    auth.require_write()?;
    let endpoint =
        webhook_service::create_webhook_endpoint(&pool, auth.business_id, request).await?;

    Ok((StatusCode::CREATED, Json(endpoint)))
}

/// List active webhook endpoints. Secrets are never included.
pub async fn list_webhooks(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<Vec<WebhookEndpointResponse>>, AppError> {
    let webhooks = webhook_service::list_webhook_endpoints(&pool, auth.business_id).await?;

    Ok(Json(webhooks))
}

/// Delete a webhook endpoint (soft delete).
///
/// Sets `is_active = false` so the delivery log stays readable. Returns 204,
/// or 404 when the endpoint does not belong to the business.
pub async fn delete_webhook(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path(webhook_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    auth.require_write()?;
    webhook_service::delete_webhook_endpoint(&pool, auth.business_id, webhook_id).await?;

    Ok(StatusCode::NO_CONTENT)
}

/// Recent delivery attempts for one endpoint, newest first (`?limit=`,
/// default 50, max 200).
pub async fn list_webhook_events(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path(webhook_id): Path<Uuid>,
    Query(query): Query<WebhookEventQuery>,
) -> Result<Json<Vec<WebhookEvent>>, AppError> {
    let events =
        webhook_service::list_webhook_events(&pool, auth.business_id, webhook_id, query.limit())
            .await?;

    Ok(Json(events))
}
