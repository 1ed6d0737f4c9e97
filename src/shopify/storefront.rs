use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::json;

use super::types::{CartCreateData, CollectionData, GraphQLResponse, ProductHandlesData};
use super::{Checkout, CheckoutLine, Collection, ShopifyError, Storefront};
use crate::config::ShopifyConfig;

const COLLECTION_QUERY: &str = r#"
query CollectionProducts($handle: String!) {
  collection(handle: $handle) {
    id handle title
    products(first: 100) {
      nodes {
        id handle title description
        featuredImage { url }
        variants(first: 50) { nodes { id title availableForSale price { amount currencyCode } } }
      }
    }
  }
}"#;

const PRODUCT_HANDLES_QUERY: &str = r#"
query ProductHandles($after: String) {
  products(first: 250, after: $after) {
    pageInfo { hasNextPage endCursor }
    nodes { handle }
  }
}"#;

const CART_CREATE_MUTATION: &str = r#"
mutation CartCreate($input: CartInput!) {
  cartCreate(input: $input) {
    cart { id checkoutUrl }
    userErrors { message }
  }
}"#;

/// Client for the Storefront GraphQL API.
#[derive(Clone)]
pub struct StorefrontClient { http: reqwest::Client, endpoint: String, token: String }

impl StorefrontClient {
    pub fn new(config: &ShopifyConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: format!("https://{}/api/{}/graphql.json", config.store_domain, config.api_version),
            token: config.storefront_token.clone(),
        }
    }

    async fn execute<T: DeserializeOwned>(&self, query: &str, variables: serde_json::Value) -> Result<T, ShopifyError> {
        let response = self.http.post(&self.endpoint)
            .header("X-Shopify-Storefront-Access-Token", &self.token)
            .json(&json!({ "query": query, "variables": variables }))
            .send().await?;
        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry = response.headers().get("Retry-After").and_then(|v| v.to_str().ok()).and_then(|v| v.parse().ok()).unwrap_or(1);
            return Err(ShopifyError::RateLimited(retry));
        }
        if !status.is_success() { return Err(ShopifyError::Status(status.as_u16())); }
        let body = response.bytes().await?;
        decode(&body)
    }
}

/// Unwraps a GraphQL envelope, turning `errors` into [`ShopifyError::GraphQL`].
pub(crate) fn decode<T: DeserializeOwned>(body: &[u8]) -> Result<T, ShopifyError> {
    let envelope: GraphQLResponse<T> = serde_json::from_slice(body)?;
    if !envelope.errors.is_empty() {
        return Err(ShopifyError::GraphQL(envelope.errors.into_iter().map(|e| e.message).collect()));
    }
    envelope.data.ok_or_else(|| ShopifyError::GraphQL(vec!["response has no data".to_string()]))
}

#[async_trait]
impl Storefront for StorefrontClient {
    async fn collection_products(&self, handle: &str) -> Result<Collection, ShopifyError> {
        let data: CollectionData = self.execute(COLLECTION_QUERY, json!({ "handle": handle })).await?;
        data.collection.map(Collection::from).ok_or_else(|| ShopifyError::NotFound(format!("collection {handle}")))
    }

    async fn product_handles(&self) -> Result<Vec<String>, ShopifyError> {
        let mut handles = Vec::new();
        let mut after: Option<String> = None;
        loop {
            let data: ProductHandlesData = self.execute(PRODUCT_HANDLES_QUERY, json!({ "after": after })).await?;
            handles.extend(data.products.nodes.into_iter().map(|n| n.handle));
            match data.products.page_info {
                p if p.has_next_page && p.end_cursor.is_some() => after = p.end_cursor,
                _ => break,
            }
        }
        tracing::debug!(count = handles.len(), "fetched product handles");
        Ok(handles)
    }

    async fn create_checkout(&self, lines: &[CheckoutLine], attributes: &[(String, String)]) -> Result<Checkout, ShopifyError> {
        let input = json!({
            "lines": lines.iter().map(|l| json!({ "merchandiseId": l.variant_id, "quantity": l.quantity })).collect::<Vec<_>>(),
            "attributes": attributes.iter().map(|(k, v)| json!({ "key": k, "value": v })).collect::<Vec<_>>(),
        });
        let data: CartCreateData = self.execute(CART_CREATE_MUTATION, json!({ "input": input })).await?;
        if let Some(e) = data.cart_create.user_errors.into_iter().next() { return Err(ShopifyError::UserError(e.message)); }
        let cart = data.cart_create.cart.ok_or_else(|| ShopifyError::UserError("cart was not created".to_string()))?;
        Ok(Checkout { cart_id: cart.id, checkout_url: cart.checkout_url })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_collection() {
        let body = br#"{"data":{"collection":{"id":"gid://shopify/Collection/1","handle":"tour","title":"Tour","products":{"nodes":[
            {"id":"gid://shopify/Product/9","handle":"tour-tee","title":"Tour Tee","description":"Cotton","featuredImage":null,
             "variants":{"nodes":[{"id":"gid://shopify/ProductVariant/3","title":"L","availableForSale":true,"price":{"amount":"25.0","currencyCode":"USD"}}]}}]}}}}"#;
        let data: CollectionData = decode(body).unwrap();
        let c = Collection::from(data.collection.unwrap());
        assert_eq!(c.products.len(), 1);
        assert_eq!(c.products[0].image_url, None);
        assert_eq!(c.products[0].variants[0].price, "25.0");
        assert!(c.products[0].variants[0].available);
    }

    #[test]
    fn test_decode_errors() {
        let body = br#"{"data":null,"errors":[{"message":"Throttled"},{"message":"Bad handle"}]}"#;
        match decode::<CollectionData>(body) {
            Err(ShopifyError::GraphQL(msgs)) => assert_eq!(msgs, ["Throttled", "Bad handle"]),
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(decode::<CollectionData>(b"not json"), Err(ShopifyError::Parse(_))));
    }

    #[test]
    fn test_endpoint() {
        let client = StorefrontClient::new(&ShopifyConfig { store_domain: "merch.myshopify.com".into(), storefront_token: "t".into(), api_version: "2024-01".into() });
        assert_eq!(client.endpoint, "https://merch.myshopify.com/api/2024-01/graphql.json");
    }
}
