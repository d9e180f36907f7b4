//! Payment records on orders.

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use crate::{
    db::DbPool,
    error::AppError,
    middleware::auth::AuthContext,
    models::{
        payment::{Payment, RecordPaymentRequest, RecordedPayment},
        webhook::OutboundEvent,
    },
    services::{payment_service, webhook_service},
    state::AppState,
};

pub async fn list_payments(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path(order_id): Path<Uuid>,
) -> Result<Json<Vec<Payment>>, AppError> {
    let payments = payment_service::list_payments(&pool, auth.business_id, order_id).await?;
    Ok(Json(payments))
}

/// Record a charge or refund collected outside the API.
///
/// # Request Body
///
/// ```json
/// {
///   "kind": "charge",
///   "amount_cents": 25000,
///   "currency": "USD",
///   "provider": "stripe",
///   "provider_reference": "pi_3Nx..."
/// }
/// ```
///
/// # Response
///
/// - **201 Created**: the payment and the order's updated summary
/// - **400**: currency differs from the order
/// - **409**: charging an order that is not confirmed or completed
/// - **422**: refund larger than the net amount paid
pub async fn record_payment(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(order_id): Path<Uuid>,
    Json(request): Json<RecordPaymentRequest>,
) -> Result<impl IntoResponse, AppError> {
    auth.require_write()?;
    let (payment, summary) =
        payment_service::record_payment(&state.pool, auth.business_id, order_id, request).await?;
    let recorded = RecordedPayment { payment, summary };

    webhook_service::dispatch(
        &state.pool,
        &state.http,
        OutboundEvent::new(
            auth.business_id,
            "payment.recorded",
            recorded.payment.id,
            &recorded,
        ),
    );

    Ok((StatusCode::CREATED, Json(recorded)))
}
