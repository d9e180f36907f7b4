//! Order, payment, review and report rules that run inside database
//! transactions, checked against a real `PostgreSQL`.

#![allow(clippy::expect_used)]

mod common;

use axum::{http::StatusCode, response::IntoResponse};
use chrono::Duration;
use spaces_marketplace_server::{
    db::DbPool,
    error::AppError,
    models::{
        order::{BookingRequest, Order, OrderStatus, PurchaseRequest},
        payment::{PaymentKind, PaymentStatus, RecordPaymentRequest},
        review::SubmitReviewRequest,
        space::Space,
    },
    services::{
        listing_service, order_service, payment_service, report_service, review_service,
    },
};
use uuid::Uuid;

use common::june_7;

fn booking_request(starts_hour: u32, ends_hour: u32, email: &str) -> BookingRequest {
    serde_json::from_value(serde_json::json!({
        "starts_at": june_7(starts_hour, 0),
        "ends_at": june_7(ends_hour, 0),
        "guests": 10,
        "customer_name": "Ada Lovelace",
        "customer_email": email
    }))
    .expect("Invalid booking request")
}

fn purchase_request(quantity: i32) -> PurchaseRequest {
    serde_json::from_value(serde_json::json!({
        "quantity": quantity,
        "customer_name": "Grace Hopper",
        "customer_email": "grace@example.com"
    }))
    .expect("Invalid purchase request")
}

fn payment(kind: PaymentKind, amount_cents: i64) -> RecordPaymentRequest {
    RecordPaymentRequest {
        kind,
        amount_cents,
        currency: "USD".to_string(),
        provider: "stripe".to_string(),
        provider_reference: None,
    }
}

async fn book(pool: &DbPool, space: &Space, starts_hour: u32, ends_hour: u32) -> Order {
    order_service::create_booking(pool, space, booking_request(starts_hour, ends_hour, "ada@example.com"))
        .await
        .expect("Failed to create booking")
}

async fn inventory(pool: &DbPool, business_id: Uuid, listing_id: Uuid) -> Option<i32> {
    listing_service::get_listing(pool, business_id, listing_id)
        .await
        .expect("Failed to load listing")
        .inventory
}

#[tokio::test]
async fn overlapping_booking_is_a_conflict() {
    let (_container, pool) = common::setup_database().await;
    let business_id = common::business(&pool).await;
    let space = common::space(&pool, business_id, true).await;

    let first = book(&pool, &space, 18, 22).await;
    assert_eq!(first.status, "confirmed");
    assert_eq!(first.total_cents, 40_000);

    let result = order_service::create_booking(
        &pool,
        &space,
        booking_request(20, 23, "ada@example.com"),
    )
    .await;
    let err = result.expect_err("overlapping slot must be rejected");
    assert!(matches!(err, AppError::Conflict(_)));
    assert_eq!(err.into_response().status(), StatusCode::CONFLICT);

    // Back-to-back is fine: intervals are half-open.
    let adjacent = book(&pool, &space, 22, 23).await;
    assert_eq!(adjacent.status, "confirmed");
}

#[tokio::test]
async fn confirming_a_pending_booking_rechecks_the_slot() {
    let (_container, pool) = common::setup_database().await;
    let business_id = common::business(&pool).await;
    let space = common::space(&pool, business_id, false).await;

    // Pending requests do not block each other.
    let first = book(&pool, &space, 18, 22).await;
    let second = book(&pool, &space, 19, 21).await;
    assert_eq!(first.status, "pending");
    assert_eq!(second.status, "pending");

    let confirmed = order_service::change_status(&pool, business_id, second.id, OrderStatus::Confirmed)
        .await
        .expect("first confirmation should succeed");
    assert_eq!(confirmed.status, "confirmed");

    let result =
        order_service::change_status(&pool, business_id, first.id, OrderStatus::Confirmed).await;
    assert!(matches!(result, Err(AppError::Conflict(_))));

    let unchanged = order_service::get_order(&pool, business_id, first.id)
        .await
        .expect("order should still exist");
    assert_eq!(unchanged.status, "pending");

    // Declining the loser is still allowed.
    let declined = order_service::change_status(&pool, business_id, first.id, OrderStatus::Declined)
        .await
        .expect("decline should succeed");
    assert_eq!(declined.status, "declined");
}

#[tokio::test]
async fn purchases_take_and_return_inventory() {
    let (_container, pool) = common::setup_database().await;
    let business_id = common::business(&pool).await;
    let listing = common::listing(&pool, business_id, 5).await;

    let order = order_service::create_purchase(&pool, &listing, purchase_request(3))
        .await
        .expect("purchase within stock should succeed");
    assert_eq!(order.status, "confirmed");
    assert_eq!(order.total_cents, 7_500);
    assert_eq!(inventory(&pool, business_id, listing.id).await, Some(2));

    let result = order_service::create_purchase(&pool, &listing, purchase_request(3)).await;
    let err = result.expect_err("purchase beyond stock must be rejected");
    assert!(matches!(err, AppError::Unprocessable(_)));
    assert_eq!(err.into_response().status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(inventory(&pool, business_id, listing.id).await, Some(2));

    order_service::change_status(&pool, business_id, order.id, OrderStatus::Cancelled)
        .await
        .expect("cancel should succeed");
    assert_eq!(inventory(&pool, business_id, listing.id).await, Some(5));

    // A second cancel is an illegal transition and must not restock again.
    let result =
        order_service::change_status(&pool, business_id, order.id, OrderStatus::Cancelled).await;
    assert!(matches!(result, Err(AppError::Conflict(_))));
    assert_eq!(inventory(&pool, business_id, listing.id).await, Some(5));
}

#[tokio::test]
async fn refunds_cannot_exceed_net_paid() {
    let (_container, pool) = common::setup_database().await;
    let business_id = common::business(&pool).await;
    let space = common::space(&pool, business_id, true).await;
    let order = book(&pool, &space, 10, 12).await;
    assert_eq!(order.total_cents, 20_000);

    let (_, summary) = payment_service::record_payment(
        &pool,
        business_id,
        order.id,
        payment(PaymentKind::Charge, 20_000),
    )
    .await
    .expect("charge should succeed");
    assert_eq!(summary.status, PaymentStatus::Paid);

    let result = payment_service::record_payment(
        &pool,
        business_id,
        order.id,
        payment(PaymentKind::Refund, 20_001),
    )
    .await;
    assert!(matches!(result, Err(AppError::Unprocessable(_))));

    let (_, summary) = payment_service::record_payment(
        &pool,
        business_id,
        order.id,
        payment(PaymentKind::Refund, 15_000),
    )
    .await
    .expect("partial refund should succeed");
    assert_eq!(summary.status, PaymentStatus::PartiallyRefunded);
    assert_eq!(summary.net_paid_cents, 5_000);

    let result = payment_service::record_payment(
        &pool,
        business_id,
        order.id,
        payment(PaymentKind::Refund, 5_001),
    )
    .await;
    assert!(matches!(result, Err(AppError::Unprocessable(_))));

    let detail = order_service::get_order_detail(&pool, business_id, order.id)
        .await
        .expect("detail should load");
    assert_eq!(detail.payments.len(), 2);
    assert_eq!(detail.payment.refunded_cents, 15_000);
}

#[tokio::test]
async fn oversized_payment_is_rejected_before_storage() {
    let (_container, pool) = common::setup_database().await;
    let business_id = common::business(&pool).await;
    let space = common::space(&pool, business_id, true).await;
    let order = book(&pool, &space, 10, 12).await;

    let result = payment_service::record_payment(
        &pool,
        business_id,
        order.id,
        payment(PaymentKind::Charge, i64::MAX),
    )
    .await;
    assert!(matches!(result, Err(AppError::InvalidRequest(_))));

    let detail = order_service::get_order_detail(&pool, business_id, order.id)
        .await
        .expect("detail should load");
    assert!(detail.payments.is_empty());
    assert_eq!(detail.payment.status, PaymentStatus::Unpaid);
}

#[tokio::test]
async fn reviews_need_a_completed_order_and_are_one_per_order() {
    let (_container, pool) = common::setup_database().await;
    let business_id = common::business(&pool).await;
    let space = common::space(&pool, business_id, true).await;
    let order = book(&pool, &space, 10, 12).await;

    let review = |email: &str| SubmitReviewRequest {
        order_id: order.id,
        customer_email: email.to_string(),
        rating: 5,
        author_name: None,
        body: "Great light, friendly host.".to_string(),
    };

    let result = review_service::submit_review(&pool, business_id, review("ada@example.com")).await;
    assert!(matches!(result, Err(AppError::Unprocessable(_))));

    order_service::change_status(&pool, business_id, order.id, OrderStatus::Completed)
        .await
        .expect("complete should succeed");

    let result =
        review_service::submit_review(&pool, business_id, review("mallory@example.com")).await;
    assert!(matches!(result, Err(AppError::NotFound("Order"))));

    let created = review_service::submit_review(&pool, business_id, review("ADA@example.com"))
        .await
        .expect("matching email on a completed order should succeed");
    assert_eq!(created.rating, 5);
    assert_eq!(created.author_name, "Ada Lovelace");

    let err = review_service::submit_review(&pool, business_id, review("ada@example.com"))
        .await
        .expect_err("second review must be rejected");
    assert_eq!(err.into_response().status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn report_clips_booked_hours_to_the_window() {
    let (_container, pool) = common::setup_database().await;
    let business_id = common::business(&pool).await;
    let space = common::space(&pool, business_id, true).await;

    // 20:00 to 02:00 the next day, six hours of which four fall before midnight.
    let request: BookingRequest = serde_json::from_value(serde_json::json!({
        "starts_at": june_7(20, 0),
        "ends_at": june_7(20, 0) + Duration::hours(6),
        "guests": 10,
        "customer_name": "Ada Lovelace",
        "customer_email": "ada@example.com"
    }))
    .expect("Invalid booking request");
    order_service::create_booking(&pool, &space, request)
        .await
        .expect("booking should succeed");

    let from = june_7(0, 0);
    let to = from + Duration::days(1);
    let report = report_service::summary(&pool, business_id, from, to)
        .await
        .expect("report should load");

    assert_eq!(report.spaces.len(), 1);
    assert_eq!(report.spaces[0].bookings, 1);
    assert!((report.spaces[0].booked_hours - 4.0).abs() < 1e-9);
    assert!((report.booked_hours - 4.0).abs() < 1e-9);
}
