//! HTTP surface. Each submodule returns a `Router<AppState>` for one area of
//! the API; admin areas are merged behind the admin guard.

mod admin;
mod batches;
mod cron;
mod jobs;
mod portal;
mod storefront;

use axum::{async_trait, extract::{FromRequest, Request}, middleware::from_extractor_with_state, routing::get, Json, Router};
use serde::de::DeserializeOwned;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use validator::Validate;

use crate::auth::Admin;
use crate::{ApiError, AppState};

pub fn router(state: AppState) -> Router {
    let admin = Router::new()
        .merge(admin::routes())
        .merge(jobs::routes())
        .merge(batches::routes())
        .route_layer(from_extractor_with_state::<Admin, AppState>(state.clone()));

    Router::new()
        .route("/health", get(|| async { Json(serde_json::json!({"status": "healthy", "service": "merch-commerce"})) }))
        .merge(storefront::routes())
        .merge(portal::routes())
        .merge(cron::routes())
        .merge(admin)
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(CorsLayer::permissive()))
        .with_state(state)
}

/// JSON body that is deserialized and validated, failing with a 400 envelope.
pub struct ValidJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ValidJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, ApiError> {
        let Json(value) = Json::<T>::from_request(req, state).await.map_err(|e| ApiError::BadRequest(e.body_text()))?;
        value.validate()?;
        Ok(ValidJson(value))
    }
}
