//! Shopify Storefront API access.
//!
//! Shopify stays the source of truth for the catalog: nothing is synced
//! locally, every storefront request goes straight to the Storefront GraphQL
//! API. Handlers depend on the [`Storefront`] trait so they can run against a
//! fake in tests.

mod storefront;
pub mod types;

pub use storefront::StorefrontClient;
pub use types::*;

use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur when talking to Shopify.
#[derive(Debug, Error)]
pub enum ShopifyError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success HTTP status.
    #[error("unexpected status {0}")]
    Status(u16),

    /// GraphQL query returned errors.
    #[error("GraphQL errors: {}", .0.join("; "))]
    GraphQL(Vec<String>),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rate limited by Shopify.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// User error from a mutation (e.g., sold-out variant).
    #[error("User error: {0}")]
    UserError(String),
}

#[async_trait]
pub trait Storefront: Send + Sync {
    /// Products of the collection with the given handle.
    async fn collection_products(&self, handle: &str) -> Result<Collection, ShopifyError>;
    /// Handles of every published product, for the sitemap.
    async fn product_handles(&self) -> Result<Vec<String>, ShopifyError>;
    /// Creates a cart and returns where to send the shopper to pay.
    async fn create_checkout(&self, lines: &[CheckoutLine], attributes: &[(String, String)]) -> Result<Checkout, ShopifyError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shopify_error_display() {
        assert_eq!(ShopifyError::NotFound("collection tour".into()).to_string(), "Not found: collection tour");
        assert_eq!(ShopifyError::GraphQL(vec!["Field not found".into(), "Invalid ID".into()]).to_string(), "GraphQL errors: Field not found; Invalid ID");
        assert_eq!(ShopifyError::RateLimited(60).to_string(), "Rate limited, retry after 60 seconds");
    }
}
