//! Application configuration management.
//!
//! This module handles loading configuration from environment variables.
//! It uses the `envy` crate to automatically deserialize environment variables into a type-safe struct.

use serde::Deserialize;

use crate::models::social_account::SocialPlatform;

/// Application configuration loaded from environment variables.
///
/// # Environment Variables
///
/// - `DATABASE_URL` (required): PostgreSQL connection string
/// - `ENCRYPTION_KEY` (required): 64 hex characters, the AES-256 key for stored OAuth tokens
/// - `SERVER_PORT` (optional): HTTP server port, defaults to 3000
/// - `DATABASE_MAX_CONNECTIONS` (optional): pool size, defaults to 5
/// - `PUBLIC_BASE_URL` (optional): base URL of the public site, used in the sitemap
/// - `WEBHOOK_TIMEOUT_SECS` (optional): per-delivery timeout, defaults to 5
/// - `TOKEN_EXPIRY_WARNING_HOURS` (optional): when a token counts as expiring soon, defaults to 168
/// - `<PLATFORM>_CLIENT_ID` / `<PLATFORM>_CLIENT_SECRET` (optional): OAuth client credentials
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database_url: String,

    pub encryption_key: String,

    #[serde(default = "default_port")]
    pub server_port: u16,

    #[serde(default = "default_max_connections")]
    pub database_max_connections: u32,

    #[serde(default = "default_public_base_url")]
    pub public_base_url: String,

    #[serde(default = "default_webhook_timeout")]
    pub webhook_timeout_secs: u64,

    #[serde(default = "default_warning_hours")]
    pub token_expiry_warning_hours: i64,

    pub facebook_client_id: Option<String>,
    pub facebook_client_secret: Option<String>,
    pub instagram_client_id: Option<String>,
    pub instagram_client_secret: Option<String>,
    pub eventbrite_client_id: Option<String>,
    pub eventbrite_client_secret: Option<String>,
    pub meetup_client_id: Option<String>,
    pub meetup_client_secret: Option<String>,
    pub google_client_id: Option<String>,
    pub google_client_secret: Option<String>,
}

/// OAuth client credentials for one platform.
#[derive(Debug, Clone)]
pub struct OAuthClient {
    pub client_id: String,
    pub client_secret: String,
}

/// Default port if SERVER_PORT environment variable is not set.
fn default_port() -> u16 {
    3000
}

fn default_max_connections() -> u32 {
    5
}

fn default_public_base_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_webhook_timeout() -> u64 {
    5
}

fn default_warning_hours() -> i64 {
    168
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// This method first attempts to load a `.env` file (which is optional),
    /// then reads environment variables and deserializes them into a Config struct.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Required environment variables are missing (e.g., DATABASE_URL)
    /// - Environment variable values cannot be parsed into expected types
    pub fn from_env() -> Result<Self, envy::Error> {
        // Try to load .env file if it exists (does nothing if not found)
        dotenvy::dotenv().ok();

        // Field names are automatically converted: database_url -> DATABASE_URL
        envy::from_env::<Config>()
    }

    /// Decode `ENCRYPTION_KEY` into the raw 32-byte key.
    pub fn encryption_key_bytes(&self) -> anyhow::Result<Vec<u8>> {
        let bytes = hex::decode(self.encryption_key.trim())?;
        anyhow::ensure!(
            bytes.len() == 32,
            "ENCRYPTION_KEY must be 64 hex characters (32 bytes)"
        );
        Ok(bytes)
    }

    /// Public base URL without a trailing slash.
    pub fn base_url(&self) -> &str {
        self.public_base_url.trim_end_matches('/')
    }

    pub fn token_warning_window(&self) -> chrono::Duration {
        chrono::Duration::hours(self.token_expiry_warning_hours)
    }

    /// OAuth client credentials for a platform, if both halves are configured.
    pub fn oauth_client(&self, platform: SocialPlatform) -> Option<OAuthClient> {
        let (id, secret) = match platform {
            SocialPlatform::Facebook => (&self.facebook_client_id, &self.facebook_client_secret),
            SocialPlatform::Instagram => (&self.instagram_client_id, &self.instagram_client_secret),
            SocialPlatform::Eventbrite => {
                (&self.eventbrite_client_id, &self.eventbrite_client_secret)
            }
            SocialPlatform::Meetup => (&self.meetup_client_id, &self.meetup_client_secret),
            SocialPlatform::Google => (&self.google_client_id, &self.google_client_secret),
        };

        match (id, secret) {
            (Some(client_id), Some(client_secret)) => Some(OAuthClient {
                client_id: client_id.clone(),
                client_secret: client_secret.clone(),
            }),
            _ => None,
        }
    }
}

#[cfg(test)]
pub(crate) fn test_config() -> Config {
    Config {
        database_url: "postgres://localhost/spaces_test".to_string(),
        encryption_key: "00".repeat(32),
        server_port: 3000,
        database_max_connections: 1,
        public_base_url: "https://spaces.example.com/".to_string(),
        webhook_timeout_secs: 5,
        token_expiry_warning_hours: 168,
        facebook_client_id: Some("fb-id".to_string()),
        facebook_client_secret: Some("fb-secret".to_string()),
        instagram_client_id: None,
        instagram_client_secret: None,
        eventbrite_client_id: Some("eb-id".to_string()),
        eventbrite_client_secret: None,
        meetup_client_id: None,
        meetup_client_secret: None,
        google_client_id: None,
        google_client_secret: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encryption_key_must_be_32_bytes() {
        let mut config = test_config();
        assert_eq!(config.encryption_key_bytes().unwrap().len(), 32);

        config.encryption_key = "abcd".to_string();
        assert!(config.encryption_key_bytes().is_err());

        config.encryption_key = "zz".repeat(32);
        assert!(config.encryption_key_bytes().is_err());
    }

    #[test]
    fn base_url_drops_trailing_slash() {
        assert_eq!(test_config().base_url(), "https://spaces.example.com");
    }

    #[test]
    fn oauth_client_requires_both_credentials() {
        let config = test_config();
        assert!(config.oauth_client(SocialPlatform::Facebook).is_some());
        assert!(config.oauth_client(SocialPlatform::Eventbrite).is_none());
        assert!(config.oauth_client(SocialPlatform::Meetup).is_none());
    }
}
