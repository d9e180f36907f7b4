//! Order service: booking requests, purchases and status transitions.
//!
//! # Atomicity Guarantees
//!
//! - A booking is inserted in the same transaction that locks its space row
//!   (`SELECT ... FOR UPDATE`) and re-checks conflicts, so two requests for
//!   overlapping slots cannot both succeed.
//! - A purchase locks the listing row before reading and decrementing its
//!   inventory.
//! - Confirming a booking re-checks conflicts under the same space lock;
//!   cancelling or declining a purchase gives its units back.

use sqlx::{Postgres, Transaction, types::Json};
use uuid::Uuid;

use crate::{
    db::DbPool,
    error::AppError,
    models::{
        listing::Listing,
        order::{
            BookingRequest, Order, OrderDetail, OrderKind, OrderListQuery, OrderStatus,
            PurchaseRequest,
        },
        payment::{Payment, PaymentSummary},
        space::{PublishStatus, Space},
        MAX_AMOUNT_CENTS,
    },
    services::{availability, pricing, space_service},
};

/// Most units a single purchase may take.
pub const MAX_QUANTITY: i32 = 1_000;

/// Place a booking request for a published space.
///
/// # Process
///
/// 1. Validate customer details and price the slot
/// 2. Lock the space row and re-read it
/// 3. Load confirmed bookings and blackouts around the slot; 409 on conflict
/// 4. Insert the order, `confirmed` for instant-book spaces, else `pending`
pub async fn create_booking(
    pool: &DbPool,
    space: &Space,
    mut request: BookingRequest,
) -> Result<Order, AppError> {
    request.customer.validate()?;

    let rules = space_service::ranked_rules(pool, space.id).await?;
    let slot = pricing::QuoteRequest {
        starts_at: request.starts_at,
        ends_at: request.ends_at,
        guests: request.guests,
    };

    let mut tx = pool.begin().await?;

    let space = lock_space(&mut tx, space.id).await?;
    if space.publish_status()? != PublishStatus::Published {
        return Err(AppError::NotFound("Space"));
    }

    // Priced against the locked row so a concurrent rate change is not missed.
    let quote = pricing::quote(&space.pricing(), &rules, &slot)?;

    let buffer = space.buffer();
    let busy = availability::load_busy(
        &mut *tx,
        space.id,
        slot.starts_at,
        slot.ends_at,
        buffer,
        None,
    )
    .await?;
    availability::ensure_available(slot.starts_at, slot.ends_at, &busy, buffer)?;

    let status = if space.instant_book {
        OrderStatus::Confirmed
    } else {
        OrderStatus::Pending
    };

    let order = sqlx::query_as::<_, Order>(
        r#"
        INSERT INTO orders (
            business_id, kind, space_id, starts_at, ends_at, guests,
            customer_name, customer_email, notes, status,
            subtotal_cents, tax_cents, total_cents, currency, quote
        )
        VALUES ($1, 'booking', $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
        RETURNING *
        "#,
    )
    .bind(space.business_id)
    .bind(space.id)
    .bind(slot.starts_at)
    .bind(slot.ends_at)
    .bind(slot.guests)
    .bind(&request.customer.customer_name)
    .bind(&request.customer.customer_email)
    .bind(&request.customer.notes)
    .bind(status.as_str())
    .bind(quote.subtotal_cents)
    .bind(quote.tax_cents)
    .bind(quote.total_cents)
    .bind(&quote.currency)
    .bind(Json(&quote))
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;

    tracing::info!(
        order_id = %order.id,
        space_id = %space.id,
        status = %order.status,
        total_cents = order.total_cents,
        "booking created"
    );

    Ok(order)
}

/// Buy units of a published listing. Purchases are confirmed immediately.
///
/// # Errors
///
/// - `InvalidRequest`: quantity outside `1..=MAX_QUANTITY`
/// - `Unprocessable`: not enough inventory left
pub async fn create_purchase(
    pool: &DbPool,
    listing: &Listing,
    mut request: PurchaseRequest,
) -> Result<Order, AppError> {
    request.customer.validate()?;
    if !(1..=MAX_QUANTITY).contains(&request.quantity) {
        return Err(AppError::invalid(format!(
            "quantity must be between 1 and {MAX_QUANTITY}"
        )));
    }

    let mut tx = pool.begin().await?;

    let listing = sqlx::query_as::<_, Listing>("SELECT * FROM listings WHERE id = $1 FOR UPDATE")
        .bind(listing.id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(AppError::NotFound("Listing"))?;

    if listing.publish_status()? != PublishStatus::Published {
        return Err(AppError::NotFound("Listing"));
    }

    if let Some(available) = listing.inventory {
        if available < request.quantity {
            return Err(AppError::unprocessable(format!(
                "Only {available} left for '{}'",
                listing.title
            )));
        }
        sqlx::query("UPDATE listings SET inventory = inventory - $1, updated_at = NOW() WHERE id = $2")
            .bind(request.quantity)
            .bind(listing.id)
            .execute(&mut *tx)
            .await?;
    }

    let total_cents = listing
        .price_cents
        .checked_mul(i64::from(request.quantity))
        .filter(|total| *total <= MAX_AMOUNT_CENTS)
        .ok_or_else(|| AppError::invalid("Order total is too large"))?;

    let order = sqlx::query_as::<_, Order>(
        r#"
        INSERT INTO orders (
            business_id, kind, listing_id, quantity,
            customer_name, customer_email, notes, status,
            subtotal_cents, tax_cents, total_cents, currency
        )
        VALUES ($1, 'purchase', $2, $3, $4, $5, $6, 'confirmed', $7, 0, $7, $8)
        RETURNING *
        "#,
    )
    .bind(listing.business_id)
    .bind(listing.id)
    .bind(request.quantity)
    .bind(&request.customer.customer_name)
    .bind(&request.customer.customer_email)
    .bind(&request.customer.notes)
    .bind(total_cents)
    .bind(&listing.currency)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;

    tracing::info!(
        order_id = %order.id,
        listing_id = %listing.id,
        quantity = request.quantity,
        "purchase created"
    );

    Ok(order)
}

/// Orders of a business, newest first, with optional filters.
pub async fn list_orders(
    pool: &DbPool,
    business_id: Uuid,
    query: &OrderListQuery,
) -> Result<Vec<Order>, AppError> {
    let orders = sqlx::query_as::<_, Order>(
        r#"
        SELECT * FROM orders
        WHERE business_id = $1
          AND ($2::text IS NULL OR status = $2)
          AND ($3::text IS NULL OR kind = $3)
          AND ($4::uuid IS NULL OR space_id = $4)
          AND ($5::uuid IS NULL OR listing_id = $5)
        ORDER BY created_at DESC
        LIMIT $6 OFFSET $7
        "#,
    )
    .bind(business_id)
    .bind(query.status.map(|s| s.as_str()))
    .bind(query.kind.map(|k| k.as_str()))
    .bind(query.space_id)
    .bind(query.listing_id)
    .bind(query.limit())
    .bind(query.offset())
    .fetch_all(pool)
    .await?;

    Ok(orders)
}

pub async fn get_order(pool: &DbPool, business_id: Uuid, order_id: Uuid) -> Result<Order, AppError> {
    sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = $1 AND business_id = $2")
        .bind(order_id)
        .bind(business_id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound("Order"))
}

/// Order with its payments and derived payment status.
pub async fn get_order_detail(
    pool: &DbPool,
    business_id: Uuid,
    order_id: Uuid,
) -> Result<OrderDetail, AppError> {
    let order = get_order(pool, business_id, order_id).await?;

    let payments = sqlx::query_as::<_, Payment>(
        "SELECT * FROM payments WHERE order_id = $1 ORDER BY created_at",
    )
    .bind(order.id)
    .fetch_all(pool)
    .await?;

    let payment = PaymentSummary::from_payments(order.total_cents, &payments)?;

    Ok(OrderDetail {
        order,
        payments,
        payment,
    })
}

/// Move an order to `next`.
///
/// # Errors
///
/// - `NotFound`: order does not belong to the business
/// - `Conflict`: transition not allowed, or the slot was taken while the
///   booking was pending
pub async fn change_status(
    pool: &DbPool,
    business_id: Uuid,
    order_id: Uuid,
    next: OrderStatus,
) -> Result<Order, AppError> {
    let mut tx = pool.begin().await?;

    let order = sqlx::query_as::<_, Order>(
        "SELECT * FROM orders WHERE id = $1 AND business_id = $2 FOR UPDATE",
    )
    .bind(order_id)
    .bind(business_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(AppError::NotFound("Order"))?;

    let current = order.order_status()?;
    if !current.can_transition_to(next) {
        return Err(AppError::conflict(format!(
            "Cannot change order status from {current} to {next}"
        )));
    }

    match order.order_kind()? {
        OrderKind::Booking if next == OrderStatus::Confirmed => {
            recheck_booking(&mut tx, &order).await?;
        }
        OrderKind::Purchase if current.holds_capacity() && !next.holds_capacity() => {
            if let (Some(listing_id), Some(quantity)) = (order.listing_id, order.quantity) {
                sqlx::query(
                    r#"
                    UPDATE listings
                    SET inventory = inventory + $1, updated_at = NOW()
                    WHERE id = $2 AND inventory IS NOT NULL
                    "#,
                )
                .bind(quantity)
                .bind(listing_id)
                .execute(&mut *tx)
                .await?;
            }
        }
        _ => {}
    }

    let updated = sqlx::query_as::<_, Order>(
        "UPDATE orders SET status = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
    )
    .bind(order.id)
    .bind(next.as_str())
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;

    tracing::info!(order_id = %order.id, from = %current, to = %next, "order status changed");

    Ok(updated)
}

/// Re-run conflict detection for a pending booking under the space lock.
async fn recheck_booking(tx: &mut Transaction<'_, Postgres>, order: &Order) -> Result<(), AppError> {
    let (Some(space_id), Some(starts_at), Some(ends_at)) =
        (order.space_id, order.starts_at, order.ends_at)
    else {
        return Err(AppError::internal(format!(
            "Booking {} is missing its space or slot",
            order.id
        )));
    };

    let space = lock_space(tx, space_id).await?;
    let buffer = space.buffer();
    let busy =
        availability::load_busy(&mut **tx, space_id, starts_at, ends_at, buffer, Some(order.id))
            .await?;

    availability::ensure_available(starts_at, ends_at, &busy, buffer)
}

async fn lock_space(tx: &mut Transaction<'_, Postgres>, space_id: Uuid) -> Result<Space, AppError> {
    sqlx::query_as::<_, Space>("SELECT * FROM spaces WHERE id = $1 FOR UPDATE")
        .bind(space_id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or(AppError::NotFound("Space"))
}
