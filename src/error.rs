//! API error envelope: every failure renders as `{"error": "..."}`.

use axum::{http::StatusCode, response::{IntoResponse, Response}, Json};
use thiserror::Error;

use crate::domain::aggregates::{BatchError, DropShopError, JobError};
use crate::domain::value_objects::ValueError;
use crate::shopify::ShopifyError;
use crate::store::StoreError;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Conflict(String),

    #[error("Shopify request failed: {0}")]
    Shopify(#[from] ShopifyError),

    #[error("Internal server error")]
    Internal(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Shopify(ShopifyError::NotFound(_)) => StatusCode::NOT_FOUND,
            Self::Shopify(_) => StatusCode::BAD_GATEWAY,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        match &self {
            Self::Internal(detail) => tracing::error!(error = %detail, "request failed"),
            Self::Shopify(e) => tracing::error!(error = %e, "shopify call failed"),
            _ => tracing::debug!(status = %status, error = %self, "request rejected"),
        }
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Conflict(msg) => Self::Conflict(msg),
            e @ StoreError::Stale(_) => Self::Conflict(e.to_string()),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<ValueError> for ApiError { fn from(e: ValueError) -> Self { Self::BadRequest(e.to_string()) } }
impl From<JobError> for ApiError { fn from(e: JobError) -> Self { Self::BadRequest(e.to_string()) } }
impl From<DropShopError> for ApiError { fn from(e: DropShopError) -> Self { Self::BadRequest(e.to_string()) } }
impl From<BatchError> for ApiError { fn from(e: BatchError) -> Self { Self::BadRequest(e.to_string()) } }
impl From<validator::ValidationErrors> for ApiError { fn from(e: validator::ValidationErrors) -> Self { Self::BadRequest(e.to_string()) } }

pub type ApiResult<T> = std::result::Result<T, ApiError>;
