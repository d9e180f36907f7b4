//! Spaces Marketplace - Main Application Entry Point
//!
//! REST API for businesses renting out spaces and selling listings, with a
//! public storefront, payments ledger, reviews, event-platform publishing and
//! signed webhooks.
//!
//! # Architecture
//!
//! - **Web Framework**: Axum (async HTTP server)
//! - **Database**: PostgreSQL with sqlx (async queries)
//! - **Authentication**: API key with SHA-256 hashing
//! - **Format**: JSON requests/responses
//!
//! # Startup Flow
//!
//! 1. Load configuration from environment variables
//! 2. Create database connection pool
//! 3. Run database migrations
//! 4. Build shared state and the router
//! 5. Start server on configured port

use std::{sync::Arc, time::Duration};

use spaces_marketplace_server::{
    config::Config, db, routes::build_router, services::platform_client::HttpPlatformClient,
    state::AppState,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // RUST_LOG controls verbosity (defaults to "info")
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = Config::from_env()?;
    tracing::info!("Configuration loaded");

    let pool = db::create_pool(&config.database_url, config.database_max_connections).await?;
    tracing::info!(
        max_connections = config.database_max_connections,
        "Database pool created"
    );

    db::run_migrations(&pool).await?;
    tracing::info!("Database migrations complete");

    let platforms = Arc::new(HttpPlatformClient::new(Duration::from_secs(
        config.webhook_timeout_secs,
    ))?);

    let addr = format!("0.0.0.0:{}", config.server_port);
    let state = AppState::new(pool, config, platforms)?;
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
