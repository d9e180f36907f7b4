//! Spaces marketplace backend.
//!
//! Businesses publish bookable spaces and purchasable listings, take
//! bookings and orders from a public storefront, record payments, moderate
//! reviews, push listings to connected event platforms and receive signed
//! webhooks. The business API is authenticated with per-business API keys.

pub mod config;
pub mod crypto;
pub mod db;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
