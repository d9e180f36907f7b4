//! Order handlers for the business side.
//!
//! Orders are created through the public routes; businesses list them,
//! inspect them and move them through their lifecycle.

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
};
use uuid::Uuid;

use crate::{
    db::DbPool,
    error::AppError,
    middleware::auth::AuthContext,
    models::{
        order::{Order, OrderDetail, OrderListQuery, StatusChangeRequest},
        webhook::OutboundEvent,
    },
    services::{order_service, webhook_service},
    state::AppState,
};

/// List orders, newest first.
///
/// # Query Parameters
///
/// - `status`: `pending`, `confirmed`, `declined`, `cancelled`, `completed`
/// - `kind`: `booking` or `purchase`
/// - `space_id`, `listing_id`
/// - `limit` (default 50, max 200), `offset`
pub async fn list_orders(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<OrderListQuery>,
) -> Result<Json<Vec<Order>>, AppError> {
    let orders = order_service::list_orders(&pool, auth.business_id, &query).await?;
    Ok(Json(orders))
}

/// One order with its payments and payment summary.
pub async fn get_order(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path(order_id): Path<Uuid>,
) -> Result<Json<OrderDetail>, AppError> {
    let detail = order_service::get_order_detail(&pool, auth.business_id, order_id).await?;
    Ok(Json(detail))
}

/// Move an order to a new status.
///
/// # Request Body
///
/// ```json
/// { "status": "confirmed" }
/// ```
///
/// # Allowed Transitions
///
/// | From        | To                                   |
/// |-------------|--------------------------------------|
/// | `pending`   | `confirmed`, `declined`, `cancelled` |
/// | `confirmed` | `cancelled`, `completed`             |
///
/// # Response
///
/// - **200 OK**: the updated order
/// - **409**: transition not allowed, or the slot was taken in the meantime
///
/// The matching `order.*` webhook is sent after the change commits.
pub async fn change_status(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(order_id): Path<Uuid>,
    Json(request): Json<StatusChangeRequest>,
) -> Result<Json<Order>, AppError> {
    auth.require_write()?;
    let order =
        order_service::change_status(&state.pool, auth.business_id, order_id, request.status)
            .await?;

    webhook_service::dispatch(
        &state.pool,
        &state.http,
        OutboundEvent::new(
            order.business_id,
            request.status.event_type(),
            order.id,
            &order,
        ),
    );

    Ok(Json(order))
}
