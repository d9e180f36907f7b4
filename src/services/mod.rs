//! Business logic services.
//!
//! Services contain core business logic separated from HTTP handlers.
//! They handle database transactions, validation, and complex operations.
//! `pricing`, `availability` and `token_status` are pure and do no I/O.

pub mod api_key_service;
pub mod availability;
pub mod business_service;
pub mod event_sync_service;
pub mod listing_service;
pub mod order_service;
pub mod payment_service;
pub mod platform_client;
pub mod pricing;
pub mod report_service;
pub mod review_service;
pub mod seo;
pub mod social_service;
pub mod space_service;
pub mod token_status;
pub mod webhook_service;
