//! Environment-driven configuration.

use anyhow::{Context, Result};
use chrono::Duration;

#[derive(Clone, Debug)]
pub struct ShopifyConfig { pub store_domain: String, pub storefront_token: String, pub api_version: String }

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub shopify: ShopifyConfig,
    pub admin_token: String,
    pub cron_secret: String,
    pub site_url: String,
    pub session_ttl: Duration,
    pub nats_url: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let required = |key: &str| get(key).filter(|v| !v.trim().is_empty()).with_context(|| format!("{key} must be set"));
        let port = get("PORT").unwrap_or_else(|| "8083".to_string()).parse().context("PORT must be a port number")?;
        let ttl_hours: i64 = get("SESSION_TTL_HOURS").unwrap_or_else(|| "720".to_string()).parse().context("SESSION_TTL_HOURS must be an integer")?;
        Ok(Self {
            database_url: required("DATABASE_URL")?,
            port,
            shopify: ShopifyConfig {
                store_domain: required("SHOPIFY_STORE_DOMAIN")?,
                storefront_token: required("SHOPIFY_STOREFRONT_TOKEN")?,
                api_version: get("SHOPIFY_API_VERSION").unwrap_or_else(|| "2024-01".to_string()),
            },
            admin_token: required("ADMIN_API_TOKEN")?,
            cron_secret: required("CRON_SECRET")?,
            site_url: get("SITE_URL").unwrap_or_else(|| "http://localhost:8083".to_string()).trim_end_matches('/').to_string(),
            session_ttl: Duration::hours(ttl_hours),
            nats_url: get("NATS_URL").filter(|v| !v.is_empty()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |k| map.get(k).cloned()
    }

    const BASE: &[(&str, &str)] = &[
        ("DATABASE_URL", "postgres://localhost/merch"),
        ("SHOPIFY_STORE_DOMAIN", "merch.myshopify.com"),
        ("SHOPIFY_STOREFRONT_TOKEN", "sf"),
        ("ADMIN_API_TOKEN", "admin"),
        ("CRON_SECRET", "cron"),
    ];

    #[test]
    fn test_defaults() {
        let c = Config::from_lookup(env(BASE)).unwrap();
        assert_eq!(c.port, 8083);
        assert_eq!(c.shopify.api_version, "2024-01");
        assert_eq!(c.session_ttl, Duration::hours(720));
        assert!(c.nats_url.is_none());
    }

    #[test]
    fn test_missing_required() {
        let err = Config::from_lookup(env(&BASE[1..])).unwrap_err();
        assert!(err.to_string().contains("DATABASE_URL"));
    }

    #[test]
    fn test_site_url_trimmed() {
        let mut pairs = BASE.to_vec();
        pairs.push(("SITE_URL", "https://merch.example/"));
        pairs.push(("PORT", "9000"));
        let c = Config::from_lookup(env(&pairs)).unwrap();
        assert_eq!(c.site_url, "https://merch.example");
        assert_eq!(c.port, 9000);
    }
}
