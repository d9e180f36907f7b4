//! Summary report over a time window.
//!
//! Orders, payments and reviews are counted by `created_at`; booked hours
//! count bookings whose slot starts inside the window, cut off at its end.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    db::DbPool,
    error::AppError,
    models::report::{SpaceUtilisation, StatusCount, SummaryReport, utilisation},
};

#[derive(Debug, sqlx::FromRow)]
struct SpaceHours {
    space_id: Uuid,
    name: String,
    bookings: i64,
    booked_hours: f64,
}

pub async fn summary(
    pool: &DbPool,
    business_id: Uuid,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> Result<SummaryReport, AppError> {
    let orders_by_status = sqlx::query_as::<_, StatusCount>(
        r#"
        SELECT status, COUNT(*) AS count
        FROM orders
        WHERE business_id = $1 AND created_at >= $2 AND created_at < $3
        GROUP BY status
        ORDER BY status
        "#,
    )
    .bind(business_id)
    .bind(from)
    .bind(to)
    .fetch_all(pool)
    .await?;

    let (gross_booking_value_cents,): (i64,) = sqlx::query_as(
        r#"
        SELECT COALESCE(SUM(total_cents), 0)::BIGINT
        FROM orders
        WHERE business_id = $1
          AND status IN ('confirmed', 'completed')
          AND created_at >= $2 AND created_at < $3
        "#,
    )
    .bind(business_id)
    .bind(from)
    .bind(to)
    .fetch_one(pool)
    .await?;

    let (payments_collected_cents, refunds_cents): (i64, i64) = sqlx::query_as(
        r#"
        SELECT
            COALESCE(SUM(p.amount_cents) FILTER (WHERE p.kind = 'charge'), 0)::BIGINT,
            COALESCE(SUM(p.amount_cents) FILTER (WHERE p.kind = 'refund'), 0)::BIGINT
        FROM payments p
        JOIN orders o ON o.id = p.order_id
        WHERE o.business_id = $1 AND p.created_at >= $2 AND p.created_at < $3
        "#,
    )
    .bind(business_id)
    .bind(from)
    .bind(to)
    .fetch_one(pool)
    .await?;

    let (review_count, average_rating): (i64, Option<f64>) = sqlx::query_as(
        r#"
        SELECT COUNT(*), ROUND(AVG(rating), 2)::FLOAT8
        FROM reviews
        WHERE business_id = $1 AND created_at >= $2 AND created_at < $3
        "#,
    )
    .bind(business_id)
    .bind(from)
    .bind(to)
    .fetch_one(pool)
    .await?;

    let space_hours = sqlx::query_as::<_, SpaceHours>(
        r#"
        SELECT
            s.id AS space_id,
            s.name,
            COUNT(o.id) AS bookings,
            COALESCE(SUM(EXTRACT(EPOCH FROM (LEAST(o.ends_at, $3) - o.starts_at)) / 3600.0), 0)::FLOAT8 AS booked_hours
        FROM spaces s
        LEFT JOIN orders o
            ON o.space_id = s.id
           AND o.kind = 'booking'
           AND o.status IN ('confirmed', 'completed')
           AND o.starts_at >= $2 AND o.starts_at < $3
        WHERE s.business_id = $1 AND s.status <> 'archived'
        GROUP BY s.id, s.name
        ORDER BY booked_hours DESC, s.name
        "#,
    )
    .bind(business_id)
    .bind(from)
    .bind(to)
    .fetch_all(pool)
    .await?;

    let window_hours = (to - from).num_minutes() as f64 / 60.0;
    let spaces: Vec<SpaceUtilisation> = space_hours
        .into_iter()
        .map(|row| SpaceUtilisation {
            space_id: row.space_id,
            name: row.name,
            bookings: row.bookings,
            booked_hours: row.booked_hours,
            utilisation: utilisation(row.booked_hours, window_hours),
        })
        .collect();

    Ok(SummaryReport {
        from,
        to,
        orders_by_status,
        booked_hours: spaces.iter().map(|s| s.booked_hours).sum(),
        gross_booking_value_cents,
        payments_collected_cents,
        refunds_cents,
        net_revenue_cents: payments_collected_cents - refunds_cents,
        review_count,
        average_rating,
        spaces,
    })
}
