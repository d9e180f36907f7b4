//! Connected social and event-platform accounts.
//!
//! Access and refresh tokens are stored encrypted (see [`crate::crypto`]) and
//! are never serialized into API responses. Token health is derived on read.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::AppError,
    models::require_text,
    services::token_status::{TokenHealth, TokenState, token_status},
};

string_enum! {
    /// Third-party platforms a business can connect.
    pub enum SocialPlatform {
        Facebook => "facebook",
        Instagram => "instagram",
        Eventbrite => "eventbrite",
        Meetup => "meetup",
        Google => "google",
    }
}

impl SocialPlatform {
    /// OAuth2 token endpoint used for the `refresh_token` grant.
    pub fn token_url(self) -> &'static str {
        match self {
            SocialPlatform::Facebook | SocialPlatform::Instagram => {
                "https://graph.facebook.com/v19.0/oauth/access_token"
            }
            SocialPlatform::Eventbrite => "https://www.eventbrite.com/oauth/token",
            SocialPlatform::Meetup => "https://secure.meetup.com/oauth2/access",
            SocialPlatform::Google => "https://oauth2.googleapis.com/token",
        }
    }

    /// Base URL of the platform API that events are published to.
    pub fn api_base(self) -> &'static str {
        match self {
            SocialPlatform::Facebook | SocialPlatform::Instagram => {
                "https://graph.facebook.com/v19.0"
            }
            SocialPlatform::Eventbrite => "https://www.eventbriteapi.com/v3",
            SocialPlatform::Meetup => "https://api.meetup.com",
            SocialPlatform::Google => "https://www.googleapis.com/calendar/v3",
        }
    }
}

/// Represents a social account record from the database.
///
/// `access_token_enc` and `refresh_token_enc` hold ciphertext; both are
/// cleared when the account is disconnected.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SocialAccount {
    pub id: Uuid,
    pub business_id: Uuid,
    pub platform: String,
    pub external_account_id: String,
    pub account_name: String,
    pub access_token_enc: Option<String>,
    pub refresh_token_enc: Option<String>,
    pub scopes: Vec<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub connected_at: DateTime<Utc>,
    pub last_refreshed_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub last_error_at: Option<DateTime<Utc>>,
    pub disconnected_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SocialAccount {
    pub fn social_platform(&self) -> Result<SocialPlatform, AppError> {
        self.platform.parse()
    }

    pub fn token_state(&self) -> TokenState {
        TokenState {
            has_refresh_token: self.refresh_token_enc.is_some(),
            expires_at: self.expires_at,
            last_refreshed_at: self.last_refreshed_at,
            last_error_at: self.last_error_at,
            connected_at: Some(self.connected_at),
            disconnected_at: self.disconnected_at,
        }
    }

    pub fn health(&self, now: DateTime<Utc>, warning_window: Duration) -> TokenHealth {
        token_status(&self.token_state(), now, warning_window)
    }
}

/// Tokens obtained by the dashboard after the OAuth consent flow.
///
/// ```json
/// {
///   "platform": "eventbrite",
///   "external_account_id": "1234567890",
///   "account_name": "Rooftop Loft Events",
///   "access_token": "EAAB...",
///   "refresh_token": "AQX...",
///   "expires_in": 5183944,
///   "scopes": ["event_management"]
/// }
/// ```
#[derive(Debug, Deserialize)]
pub struct ConnectSocialAccountRequest {
    pub platform: SocialPlatform,
    pub external_account_id: String,
    pub account_name: String,
    pub access_token: String,
    pub refresh_token: Option<String>,
    /// Absolute expiry; takes precedence over `expires_in`
    pub expires_at: Option<DateTime<Utc>>,
    /// Lifetime in seconds, as returned by most token endpoints
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub scopes: Vec<String>,
}

impl ConnectSocialAccountRequest {
    pub fn validate(&mut self) -> Result<(), AppError> {
        self.external_account_id = require_text("external_account_id", &self.external_account_id)?;
        self.account_name = require_text("account_name", &self.account_name)?;
        self.access_token = require_text("access_token", &self.access_token)?;
        if self.expires_in.is_some_and(|secs| secs <= 0) {
            return Err(AppError::invalid("expires_in must be positive"));
        }
        Ok(())
    }

    /// Resolve the token expiry relative to `now`.
    pub fn expiry(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.expires_at
            .or_else(|| self.expires_in.map(|secs| now + Duration::seconds(secs)))
    }
}

/// API view of a connected account. Tokens are never included.
#[derive(Debug, Serialize)]
pub struct SocialAccountResponse {
    pub id: Uuid,
    pub platform: String,
    pub external_account_id: String,
    pub account_name: String,
    pub scopes: Vec<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub connected_at: DateTime<Utc>,
    pub last_refreshed_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub last_error_at: Option<DateTime<Utc>>,
    pub disconnected_at: Option<DateTime<Utc>>,
    pub token: TokenHealth,
    pub created_at: DateTime<Utc>,
}

impl SocialAccountResponse {
    pub fn new(account: SocialAccount, now: DateTime<Utc>, warning_window: Duration) -> Self {
        let token = account.health(now, warning_window);
        Self {
            id: account.id,
            platform: account.platform,
            external_account_id: account.external_account_id,
            account_name: account.account_name,
            scopes: account.scopes,
            expires_at: account.expires_at,
            connected_at: account.connected_at,
            last_refreshed_at: account.last_refreshed_at,
            last_error: account.last_error,
            last_error_at: account.last_error_at,
            disconnected_at: account.disconnected_at,
            token,
            created_at: account.created_at,
        }
    }
}
