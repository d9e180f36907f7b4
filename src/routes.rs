//! Route table.
//!
//! Three groups share one [`AppState`]:
//! - open routes: health, robots.txt, sitemap.xml
//! - `/public/{business}/...`: storefront, no authentication
//! - `/api/v1/...`: business API behind [`auth_middleware`]

use axum::{
    Router, middleware as axum_middleware,
    routing::{delete, get, patch, post},
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    error::AppError,
    handlers::{
        api_keys, event_syncs, health, listings, orders, payments, public, reports, reviews, seo,
        social_accounts, spaces, webhooks,
    },
    middleware::auth::auth_middleware,
    state::AppState,
};

pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        // Spaces
        .route("/api/v1/spaces", get(spaces::list_spaces).post(spaces::create_space))
        .route(
            "/api/v1/spaces/{id}",
            get(spaces::get_space)
                .patch(spaces::update_space)
                .delete(spaces::archive_space),
        )
        .route(
            "/api/v1/spaces/{id}/pricing-rules",
            get(spaces::list_pricing_rules).post(spaces::add_pricing_rule),
        )
        .route(
            "/api/v1/spaces/{id}/pricing-rules/{rule_id}",
            delete(spaces::delete_pricing_rule),
        )
        .route(
            "/api/v1/spaces/{id}/blackouts",
            get(spaces::list_blackouts).post(spaces::add_blackout),
        )
        .route(
            "/api/v1/spaces/{id}/blackouts/{blackout_id}",
            delete(spaces::delete_blackout),
        )
        .route("/api/v1/spaces/{id}/quote", post(spaces::quote_space))
        .route(
            "/api/v1/spaces/{id}/availability",
            get(spaces::space_availability),
        )
        // Listings
        .route(
            "/api/v1/listings",
            get(listings::list_listings).post(listings::create_listing),
        )
        .route(
            "/api/v1/listings/{id}",
            get(listings::get_listing)
                .patch(listings::update_listing)
                .delete(listings::archive_listing),
        )
        .route(
            "/api/v1/listings/{id}/event-syncs",
            get(event_syncs::list_syncs).post(event_syncs::create_sync),
        )
        // Orders and payments
        .route("/api/v1/orders", get(orders::list_orders))
        .route("/api/v1/orders/{id}", get(orders::get_order))
        .route("/api/v1/orders/{id}/status", post(orders::change_status))
        .route(
            "/api/v1/orders/{id}/payments",
            get(payments::list_payments).post(payments::record_payment),
        )
        // Reviews
        .route("/api/v1/reviews", get(reviews::list_reviews))
        .route("/api/v1/reviews/{id}", patch(reviews::moderate_review))
        // Social accounts and event syncs
        .route(
            "/api/v1/social-accounts",
            get(social_accounts::list_accounts).post(social_accounts::connect_account),
        )
        .route(
            "/api/v1/social-accounts/{id}",
            get(social_accounts::get_account).delete(social_accounts::disconnect_account),
        )
        .route(
            "/api/v1/social-accounts/{id}/refresh",
            post(social_accounts::refresh_account),
        )
        .route("/api/v1/event-syncs/{id}", delete(event_syncs::delete_sync))
        .route("/api/v1/event-syncs/{id}/retry", post(event_syncs::retry_sync))
        // Webhooks
        .route(
            "/api/v1/webhooks",
            get(webhooks::list_webhooks).post(webhooks::create_webhook),
        )
        .route("/api/v1/webhooks/{id}", delete(webhooks::delete_webhook))
        .route(
            "/api/v1/webhooks/{id}/events",
            get(webhooks::list_webhook_events),
        )
        // API keys and reports
        .route(
            "/api/v1/api-keys",
            get(api_keys::list_api_keys).post(api_keys::create_api_key),
        )
        .route("/api/v1/api-keys/{id}", delete(api_keys::revoke_api_key))
        .route("/api/v1/reports/summary", get(reports::summary))
        // Only matched routes are authenticated; unknown paths fall through to 404
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let public_routes = Router::new()
        .route("/public/{business}/spaces", get(public::list_spaces))
        .route("/public/{business}/spaces/{slug}", get(public::get_space))
        .route(
            "/public/{business}/spaces/{slug}/availability",
            get(public::space_availability),
        )
        .route(
            "/public/{business}/spaces/{slug}/quote",
            post(public::quote_space),
        )
        .route(
            "/public/{business}/spaces/{slug}/bookings",
            post(public::create_booking),
        )
        .route(
            "/public/{business}/spaces/{slug}/reviews",
            get(public::space_reviews),
        )
        .route("/public/{business}/listings", get(public::list_listings))
        .route(
            "/public/{business}/listings/{slug}",
            get(public::get_listing),
        )
        .route(
            "/public/{business}/listings/{slug}/orders",
            post(public::create_purchase),
        )
        .route("/public/{business}/reviews", post(public::submit_review));

    Router::new()
        .route("/health", get(health::health_check))
        .route("/robots.txt", get(seo::robots))
        .route("/sitemap.xml", get(seo::sitemap))
        .merge(public_routes)
        .merge(api_routes)
        .fallback(not_found)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn not_found() -> AppError {
    AppError::NotFound("Route")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{sync::Arc, time::Duration};

    use axum::{
        body::{Body, to_bytes},
        http::{Request, StatusCode, header},
    };
    use sqlx::postgres::PgPoolOptions;
    use tower::ServiceExt;

    use crate::{config::test_config, services::platform_client::HttpPlatformClient};

    /// Router over a pool that never connects; enough for paths that do not
    /// reach the database.
    fn app() -> Router {
        let config = test_config();
        let pool = PgPoolOptions::new()
            .connect_lazy(&config.database_url)
            .unwrap();
        let platforms = Arc::new(HttpPlatformClient::new(Duration::from_secs(1)).unwrap());
        build_router(AppState::new(pool, config, platforms).unwrap())
    }

    async fn json_body(response: axum::response::Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn api_requires_bearer_key() {
        let response = app()
            .oneshot(Request::get("/api/v1/spaces").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = json_body(response).await;
        assert_eq!(body["error"]["code"], "invalid_api_key");
    }

    #[tokio::test]
    async fn non_bearer_authorization_is_rejected() {
        let response = app()
            .oneshot(
                Request::post("/api/v1/webhooks")
                    .header(header::AUTHORIZATION, "Basic dXNlcjpwYXNz")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn robots_txt_links_sitemap() {
        let response = app()
            .oneshot(Request::get("/robots.txt").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/plain; charset=utf-8"
        );
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(text.contains("Disallow: /api/"));
        assert!(text.contains("Sitemap: https://spaces.example.com/sitemap.xml"));
    }

    #[tokio::test]
    async fn unknown_route_is_json_404() {
        let response = app()
            .oneshot(Request::get("/nowhere").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = json_body(response).await;
        assert_eq!(body["error"]["code"], "not_found");
        assert_eq!(body["error"]["message"], "Route not found");
    }
}
