//! Merch Commerce - drop shop storefront and production backend
//!
//! ## Features
//! - Drop shops: themed storefronts over one Shopify collection
//! - Checkout proxying to Shopify carts
//! - Production jobs with an append-only status/event log
//! - Periodic purchase-order batches, opened and closed on a schedule
//! - Customer portal with reorders

pub mod auth;
pub mod config;
pub mod domain;
pub mod error;
pub mod events;
pub mod routes;
pub mod services;
pub mod shopify;
pub mod sitemap;
pub mod store;
pub mod theme;

use std::sync::Arc;

pub use config::Config;
pub use error::{ApiError, ApiResult};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn store::Store>,
    pub storefront: Arc<dyn shopify::Storefront>,
    pub config: Arc<Config>,
    pub nats: Option<async_nats::Client>,
}
