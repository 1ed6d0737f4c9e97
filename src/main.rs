//! Merch Commerce - drop shop storefront and production backend

use anyhow::Result;
use merch_commerce::{routes, shopify::StorefrontClient, store::PgStore, AppState, Config};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry().with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into())).with(tracing_subscriber::fmt::layer()).init();
    let config = Config::from_env()?;
    let db = PgPoolOptions::new().max_connections(10).connect(&config.database_url).await?;
    sqlx::migrate!("./migrations").run(&db).await?;
    let nats = match &config.nats_url {
        Some(url) => match async_nats::connect(url.as_str()).await {
            Ok(client) => Some(client),
            Err(e) => { tracing::warn!(error = %e, "NATS unavailable, job events will not be published"); None }
        },
        None => None,
    };
    let port = config.port;
    let state = AppState {
        store: Arc::new(PgStore::new(db)),
        storefront: Arc::new(StorefrontClient::new(&config.shopify)),
        config: Arc::new(config),
        nats,
    };

    let app = routes::router(state);
    tracing::info!("🚀 Merch Commerce listening on 0.0.0.0:{}", port);
    axum::serve(tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?, app).await?;
    Ok(())
}
