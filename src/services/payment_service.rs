//! Payment service: recording charges and refunds against orders.

use uuid::Uuid;

use crate::{
    db::DbPool,
    error::AppError,
    models::{
        order::{Order, OrderStatus},
        payment::{Payment, PaymentKind, PaymentSummary, RecordPaymentRequest},
        MAX_AMOUNT_CENTS,
    },
};

/// Payments of an order, oldest first. The order must belong to the business.
pub async fn list_payments(
    pool: &DbPool,
    business_id: Uuid,
    order_id: Uuid,
) -> Result<Vec<Payment>, AppError> {
    let payments = sqlx::query_as::<_, Payment>(
        r#"
        SELECT p.* FROM payments p
        JOIN orders o ON o.id = p.order_id
        WHERE p.order_id = $1 AND o.business_id = $2
        ORDER BY p.created_at
        "#,
    )
    .bind(order_id)
    .bind(business_id)
    .fetch_all(pool)
    .await?;

    if payments.is_empty() {
        // Distinguish "no payments yet" from "no such order".
        crate::services::order_service::get_order(pool, business_id, order_id).await?;
    }

    Ok(payments)
}

/// Record a charge or refund.
///
/// The order row is locked so concurrent refunds cannot exceed the net paid.
///
/// # Errors
///
/// - `InvalidRequest`: currency differs from the order's
/// - `Conflict`: charge on an order that is not confirmed or completed
/// - `Unprocessable`: refund larger than the net amount paid
pub async fn record_payment(
    pool: &DbPool,
    business_id: Uuid,
    order_id: Uuid,
    mut request: RecordPaymentRequest,
) -> Result<(Payment, PaymentSummary), AppError> {
    request.validate()?;

    let mut tx = pool.begin().await?;

    let order = sqlx::query_as::<_, Order>(
        "SELECT * FROM orders WHERE id = $1 AND business_id = $2 FOR UPDATE",
    )
    .bind(order_id)
    .bind(business_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(AppError::NotFound("Order"))?;

    if request.currency != order.currency {
        return Err(AppError::invalid(format!(
            "Payment currency {} does not match order currency {}",
            request.currency, order.currency
        )));
    }

    let existing = sqlx::query_as::<_, Payment>("SELECT * FROM payments WHERE order_id = $1")
        .bind(order.id)
        .fetch_all(&mut *tx)
        .await?;
    let before = PaymentSummary::from_payments(order.total_cents, &existing)?;

    let (charged, refunded) =
        check_payment(order.order_status()?, &before, request.kind, request.amount_cents)?;

    let payment = sqlx::query_as::<_, Payment>(
        r#"
        INSERT INTO payments (order_id, kind, amount_cents, currency, provider, provider_reference)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING *
        "#,
    )
    .bind(order.id)
    .bind(request.kind.as_str())
    .bind(request.amount_cents)
    .bind(&request.currency)
    .bind(&request.provider)
    .bind(&request.provider_reference)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;

    let summary = PaymentSummary::from_totals(order.total_cents, charged, refunded);

    tracing::info!(
        order_id = %order.id,
        kind = %request.kind,
        amount_cents = payment.amount_cents,
        status = %summary.status,
        "payment recorded"
    );

    Ok((payment, summary))
}

/// Business rules for a new payment against the current summary.
///
/// Returns the charged and refunded totals after the payment. Charges on one
/// order may not add up past `MAX_AMOUNT_CENTS`.
fn check_payment(
    status: OrderStatus,
    summary: &PaymentSummary,
    kind: PaymentKind,
    amount_cents: i64,
) -> Result<(i64, i64), AppError> {
    match kind {
        PaymentKind::Charge => {
            if !matches!(status, OrderStatus::Confirmed | OrderStatus::Completed) {
                return Err(AppError::conflict(format!(
                    "Cannot charge an order that is {status}"
                )));
            }
            let charged = summary
                .charged_cents
                .checked_add(amount_cents)
                .filter(|charged| *charged <= MAX_AMOUNT_CENTS)
                .ok_or_else(|| {
                    AppError::invalid(format!(
                        "Charges on an order cannot exceed {MAX_AMOUNT_CENTS} in total"
                    ))
                })?;
            Ok((charged, summary.refunded_cents))
        }
        PaymentKind::Refund => {
            if amount_cents > summary.net_paid_cents {
                return Err(AppError::unprocessable(format!(
                    "Refund of {amount_cents} exceeds the {} paid",
                    summary.net_paid_cents
                )));
            }
            // Bounded by the charged total, which is itself capped.
            Ok((summary.charged_cents, summary.refunded_cents + amount_cents))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn charges_need_a_confirmed_order() {
        let summary = PaymentSummary::from_totals(1_000, 0, 0);
        assert!(check_payment(OrderStatus::Confirmed, &summary, PaymentKind::Charge, 500).is_ok());
        assert!(check_payment(OrderStatus::Completed, &summary, PaymentKind::Charge, 500).is_ok());
        assert!(matches!(
            check_payment(OrderStatus::Pending, &summary, PaymentKind::Charge, 500),
            Err(AppError::Conflict(_))
        ));
        assert!(check_payment(OrderStatus::Cancelled, &summary, PaymentKind::Charge, 500).is_err());
    }

    #[test]
    fn refunds_are_capped_by_net_paid() {
        let summary = PaymentSummary::from_totals(1_000, 1_000, 300);
        assert_eq!(
            check_payment(OrderStatus::Cancelled, &summary, PaymentKind::Refund, 700).unwrap(),
            (1_000, 1_000)
        );
        assert!(matches!(
            check_payment(OrderStatus::Cancelled, &summary, PaymentKind::Refund, 701),
            Err(AppError::Unprocessable(_))
        ));
    }

    #[test]
    fn charged_total_is_capped() {
        let summary = PaymentSummary::from_totals(100, 400, 0);
        assert_eq!(
            check_payment(OrderStatus::Confirmed, &summary, PaymentKind::Charge, 100).unwrap(),
            (500, 0)
        );

        let summary = PaymentSummary::from_totals(100, MAX_AMOUNT_CENTS, 0);
        assert!(matches!(
            check_payment(OrderStatus::Confirmed, &summary, PaymentKind::Charge, 1),
            Err(AppError::InvalidRequest(_))
        ));

        // Totals that already sit at the edge of i64 are rejected, not wrapped.
        let summary = PaymentSummary::from_totals(100, i64::MAX, 0);
        assert!(matches!(
            check_payment(OrderStatus::Confirmed, &summary, PaymentKind::Charge, 1),
            Err(AppError::InvalidRequest(_))
        ));
    }
}
