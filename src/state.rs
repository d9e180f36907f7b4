//! Shared application state handed to every handler.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::FromRef;

use crate::{
    config::Config, crypto::TokenCipher, db::DbPool, services::platform_client::PlatformClient,
};

/// State shared across all routes.
///
/// Handlers that only need the database extract `State<DbPool>` through `FromRef`.
#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub config: Arc<Config>,
    pub cipher: TokenCipher,
    pub http: reqwest::Client,
    pub platforms: Arc<dyn PlatformClient>,
}

impl AppState {
    /// Build the state from loaded configuration and a connection pool.
    pub fn new(
        pool: DbPool,
        config: Config,
        platforms: Arc<dyn PlatformClient>,
    ) -> anyhow::Result<Self> {
        let cipher = TokenCipher::new(&config.encryption_key_bytes()?)?;
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.webhook_timeout_secs))
            .build()?;

        Ok(Self {
            pool,
            config: Arc::new(config),
            cipher,
            http,
            platforms,
        })
    }
}

impl FromRef<AppState> for DbPool {
    fn from_ref(state: &AppState) -> Self {
        state.pool.clone()
    }
}

impl FromRef<AppState> for Arc<Config> {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}
