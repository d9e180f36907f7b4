//! HTTP request handlers (route handlers).
//!
//! Each handler is an async function that:
//! 1. Receives HTTP request data (JSON body, URL params, query string)
//! 2. Checks the caller's role for mutations
//! 3. Delegates to a service and returns JSON with a status code
//!
//! Handlers that change orders, payments or reviews also hand the new
//! state to the webhook dispatcher.

/// API key management
pub mod api_keys;
/// Publishing listings to event platforms
pub mod event_syncs;
/// Health check
pub mod health;
pub mod listings;
pub mod orders;
pub mod payments;
/// Unauthenticated storefront routes
pub mod public;
pub mod reports;
pub mod reviews;
/// robots.txt and sitemap.xml
pub mod seo;
pub mod social_accounts;
pub mod spaces;
/// Webhook endpoint management
pub mod webhooks;
