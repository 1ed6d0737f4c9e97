pub mod batch_scheduler;
pub mod batches;
pub mod jobs;

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;
    use async_trait::async_trait;
    use uuid::Uuid;

    use crate::domain::aggregates::Customer;
    use crate::shopify::{Checkout, CheckoutLine, Collection, ShopifyError, Storefront};
    use crate::store::MemoryStore;
    use crate::{AppState, Config};

    pub struct NoShopify;

    #[async_trait]
    impl Storefront for NoShopify {
        async fn collection_products(&self, handle: &str) -> Result<Collection, ShopifyError> { Err(ShopifyError::NotFound(handle.to_string())) }
        async fn product_handles(&self) -> Result<Vec<String>, ShopifyError> { Ok(vec![]) }
        async fn create_checkout(&self, _: &[CheckoutLine], _: &[(String, String)]) -> Result<Checkout, ShopifyError> { Err(ShopifyError::Status(503)) }
    }

    pub fn state() -> AppState {
        let config = Config::from_lookup(|k| Some(match k {
            "DATABASE_URL" => "postgres://unused",
            "SHOPIFY_STORE_DOMAIN" => "test.myshopify.com",
            "SHOPIFY_STOREFRONT_TOKEN" => "sf",
            "ADMIN_API_TOKEN" => "admin",
            "CRON_SECRET" => "cron",
            _ => return None,
        }.to_string())).expect("test config");
        AppState { store: Arc::new(MemoryStore::new()), storefront: Arc::new(NoShopify), config: Arc::new(config), nats: None }
    }

    pub async fn customer(state: &AppState, name: &str) -> Customer {
        let c = Customer::create(name, &format!("{}@example.com", Uuid::new_v4().simple())).unwrap();
        state.store.insert_customer(&c).await.unwrap();
        c
    }
}
