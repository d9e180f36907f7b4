//! Lifecycle status of stored OAuth credentials.
//!
//! The status of a connected social account is derived, never stored: it is
//! computed from the expiry, refresh and error timestamps each time the
//! account is read.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

/// Derived health of an OAuth credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenStatus {
    /// Usable, not close to expiry (or never expires).
    Active,
    /// Usable, but expires within the warning window.
    ExpiringSoon,
    /// Past `expires_at`.
    Expired,
    /// The most recent refresh attempt failed.
    Error,
    /// Disconnected by the business; tokens wiped.
    Disconnected,
}

impl TokenStatus {
    /// Whether API calls can be made with the current access token.
    pub fn is_usable(self) -> bool {
        matches!(self, TokenStatus::Active | TokenStatus::ExpiringSoon)
    }
}

/// The timestamps token health is derived from.
#[derive(Debug, Clone, Default)]
pub struct TokenState {
    pub has_refresh_token: bool,
    pub expires_at: Option<DateTime<Utc>>,
    pub last_refreshed_at: Option<DateTime<Utc>>,
    pub last_error_at: Option<DateTime<Utc>>,
    pub connected_at: Option<DateTime<Utc>>,
    pub disconnected_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TokenHealth {
    pub status: TokenStatus,
    pub needs_refresh: bool,
    /// Seconds until expiry; negative once expired, absent when the token never expires.
    pub expires_in_seconds: Option<i64>,
}

/// Derive token health at `now`.
///
/// Precedence: disconnected, error, expired, expiring soon, active.
/// An error only counts when it is newer than the last successful refresh
/// (or the connection time, for tokens never refreshed).
pub fn token_status(state: &TokenState, now: DateTime<Utc>, warning_window: Duration) -> TokenHealth {
    let expires_in_seconds = state.expires_at.map(|at| (at - now).num_seconds());

    let last_success = state.last_refreshed_at.max(state.connected_at);
    let failing = match (state.last_error_at, last_success) {
        (Some(error_at), Some(success_at)) => error_at > success_at,
        (Some(_), None) => true,
        (None, _) => false,
    };

    let status = if state.disconnected_at.is_some() {
        TokenStatus::Disconnected
    } else if failing {
        TokenStatus::Error
    } else {
        match state.expires_at {
            Some(at) if at <= now => TokenStatus::Expired,
            Some(at) if at - now <= warning_window => TokenStatus::ExpiringSoon,
            _ => TokenStatus::Active,
        }
    };

    let needs_refresh = state.has_refresh_token
        && matches!(
            status,
            TokenStatus::Expired | TokenStatus::ExpiringSoon | TokenStatus::Error
        );

    TokenHealth {
        status,
        needs_refresh,
        expires_in_seconds,
    }
}
