//! Outbound calls to connected social and event platforms.
//!
//! Two operations are needed: renewing an access token with the OAuth2
//! `refresh_token` grant, and publishing a listing as an event. Both sit behind
//! [`PlatformClient`] so tests and alternative transports can replace the
//! HTTP implementation.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use serde::Deserialize;
use serde_json::{Value, json};

use crate::{
    config::OAuthClient,
    error::AppError,
    models::{
        event_sync::{EventDetails, PublishedEvent},
        social_account::SocialPlatform,
    },
};

pub type PlatformFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, PlatformError>> + Send + 'a>>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlatformError {
    /// The request never got a response.
    #[error("request to {platform} failed: {message}")]
    Transport { platform: String, message: String },

    /// The platform answered with a non-success status.
    #[error("{platform} returned HTTP {status}: {body}")]
    Rejected {
        platform: String,
        status: u16,
        body: String,
    },

    /// The platform answered 2xx with a body we could not interpret.
    #[error("unexpected response from {platform}: {message}")]
    InvalidResponse { platform: String, message: String },
}

impl From<PlatformError> for AppError {
    fn from(error: PlatformError) -> Self {
        AppError::Upstream(error.to_string())
    }
}

/// Token endpoint response for a successful refresh.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RefreshedToken {
    pub access_token: String,
    /// Some platforms rotate refresh tokens; absent means keep the old one
    pub refresh_token: Option<String>,
    pub expires_in: Option<i64>,
}

pub trait PlatformClient: Send + Sync {
    /// Exchange a refresh token for a new access token.
    fn refresh_token<'a>(
        &'a self,
        platform: SocialPlatform,
        client: &'a OAuthClient,
        refresh_token: &'a str,
    ) -> PlatformFuture<'a, RefreshedToken>;

    /// Create the event on the platform, on behalf of the connected account.
    fn publish_event<'a>(
        &'a self,
        platform: SocialPlatform,
        external_account_id: &'a str,
        access_token: &'a str,
        event: &'a EventDetails,
    ) -> PlatformFuture<'a, PublishedEvent>;
}

/// [`PlatformClient`] backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpPlatformClient {
    http: reqwest::Client,
}

impl HttpPlatformClient {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http })
    }

    async fn send(
        &self,
        platform: SocialPlatform,
        request: reqwest::RequestBuilder,
    ) -> Result<Value, PlatformError> {
        let response = request
            .send()
            .await
            .map_err(|e| PlatformError::Transport {
                platform: platform.to_string(),
                message: e.to_string(),
            })?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if !status.is_success() {
            return Err(PlatformError::Rejected {
                platform: platform.to_string(),
                status: status.as_u16(),
                body: truncate(&body, 500),
            });
        }

        serde_json::from_str(&body).map_err(|e| PlatformError::InvalidResponse {
            platform: platform.to_string(),
            message: e.to_string(),
        })
    }
}

impl PlatformClient for HttpPlatformClient {
    fn refresh_token<'a>(
        &'a self,
        platform: SocialPlatform,
        client: &'a OAuthClient,
        refresh_token: &'a str,
    ) -> PlatformFuture<'a, RefreshedToken> {
        Box::pin(async move {
            let form = [
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
                ("client_id", client.client_id.as_str()),
                ("client_secret", client.client_secret.as_str()),
            ];
            let request = self.http.post(platform.token_url()).form(&form);
            let body = self.send(platform, request).await?;

            serde_json::from_value(body).map_err(|e| PlatformError::InvalidResponse {
                platform: platform.to_string(),
                message: e.to_string(),
            })
        })
    }

    fn publish_event<'a>(
        &'a self,
        platform: SocialPlatform,
        external_account_id: &'a str,
        access_token: &'a str,
        event: &'a EventDetails,
    ) -> PlatformFuture<'a, PublishedEvent> {
        Box::pin(async move {
            let url = events_url(platform, external_account_id);
            let request = self
                .http
                .post(url)
                .bearer_auth(access_token)
                .json(&event_body(platform, event));
            let body = self.send(platform, request).await?;
            parse_published(platform, &body)
        })
    }
}

/// Endpoint that creates an event for the account.
fn events_url(platform: SocialPlatform, account_id: &str) -> String {
    let base = platform.api_base();
    match platform {
        SocialPlatform::Eventbrite => format!("{base}/organizations/{account_id}/events/"),
        SocialPlatform::Google => format!("{base}/calendars/{account_id}/events"),
        SocialPlatform::Facebook | SocialPlatform::Instagram | SocialPlatform::Meetup => {
            format!("{base}/{account_id}/events")
        }
    }
}

/// Request body in the shape each platform expects.
fn event_body(platform: SocialPlatform, event: &EventDetails) -> Value {
    let end = event.ends_at.unwrap_or(event.starts_at);
    match platform {
        SocialPlatform::Eventbrite => json!({
            "event": {
                "name": { "html": event.title },
                "description": { "html": event.description },
                "start": { "timezone": "UTC", "utc": event.starts_at.format("%Y-%m-%dT%H:%M:%SZ").to_string() },
                "end": { "timezone": "UTC", "utc": end.format("%Y-%m-%dT%H:%M:%SZ").to_string() },
                "currency": event.currency,
            }
        }),
        SocialPlatform::Google => json!({
            "summary": event.title,
            "description": format!("{}\n\n{}", event.description, event.url),
            "start": { "dateTime": event.starts_at.to_rfc3339() },
            "end": { "dateTime": end.to_rfc3339() },
            "source": { "title": event.title, "url": event.url },
        }),
        SocialPlatform::Facebook | SocialPlatform::Instagram | SocialPlatform::Meetup => json!({
            "name": event.title,
            "description": event.description,
            "start_time": event.starts_at.to_rfc3339(),
            "end_time": end.to_rfc3339(),
            "ticket_uri": event.url,
        }),
    }
}

/// Pull the event id and public URL out of a create-event response.
fn parse_published(platform: SocialPlatform, body: &Value) -> Result<PublishedEvent, PlatformError> {
    let external_event_id = match body.get("id") {
        Some(Value::String(id)) if !id.is_empty() => id.clone(),
        Some(Value::Number(id)) => id.to_string(),
        _ => {
            return Err(PlatformError::InvalidResponse {
                platform: platform.to_string(),
                message: "response has no event id".to_string(),
            });
        }
    };

    let external_url = ["url", "htmlLink", "link", "permalink_url"]
        .iter()
        .find_map(|key| body.get(*key).and_then(Value::as_str))
        .map(str::to_string);

    Ok(PublishedEvent {
        external_event_id,
        external_url,
    })
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn event() -> EventDetails {
        EventDetails {
            title: "Jazz Night".to_string(),
            description: "Live trio".to_string(),
            starts_at: Utc.with_ymd_and_hms(2025, 3, 14, 19, 0, 0).unwrap(),
            ends_at: None,
            price_cents: 2_500,
            currency: "USD".to_string(),
            url: "https://spaces.example.com/loft/listings/jazz-night".to_string(),
        }
    }

    #[test]
    fn parses_string_and_numeric_ids() {
        let published = parse_published(
            SocialPlatform::Google,
            &json!({ "id": "abc", "htmlLink": "https://calendar.google.com/e/abc" }),
        )
        .unwrap();
        assert_eq!(published.external_event_id, "abc");
        assert_eq!(
            published.external_url.as_deref(),
            Some("https://calendar.google.com/e/abc")
        );

        let published = parse_published(SocialPlatform::Meetup, &json!({ "id": 123 })).unwrap();
        assert_eq!(published.external_event_id, "123");
        assert_eq!(published.external_url, None);
    }

    #[test]
    fn missing_id_is_an_invalid_response() {
        let err = parse_published(SocialPlatform::Facebook, &json!({ "ok": true })).unwrap_err();
        assert!(matches!(err, PlatformError::InvalidResponse { .. }));
        assert!(matches!(AppError::from(err), AppError::Upstream(_)));
    }

    #[test]
    fn event_without_end_uses_start() {
        let body = event_body(SocialPlatform::Google, &event());
        assert_eq!(body["start"]["dateTime"], body["end"]["dateTime"]);

        let body = event_body(SocialPlatform::Eventbrite, &event());
        assert_eq!(body["event"]["start"]["utc"], "2025-03-14T19:00:00Z");
    }

    #[test]
    fn urls_per_platform() {
        assert_eq!(
            events_url(SocialPlatform::Eventbrite, "42"),
            "https://www.eventbriteapi.com/v3/organizations/42/events/"
        );
        assert_eq!(
            events_url(SocialPlatform::Facebook, "page1"),
            "https://graph.facebook.com/v19.0/page1/events"
        );
    }
}
