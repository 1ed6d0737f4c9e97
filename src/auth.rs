//! Route guards. Identity is established upstream by the auth provider; we
//! only check the bearer tokens it hands out.

use axum::{async_trait, extract::FromRequestParts, http::{header::AUTHORIZATION, request::Parts}};
use chrono::Utc;

use crate::domain::aggregates::Customer;
use crate::{ApiError, AppState};

fn bearer(parts: &Parts) -> Option<&str> {
    parts.headers.get(AUTHORIZATION)?.to_str().ok()?.strip_prefix("Bearer ").map(str::trim).filter(|t| !t.is_empty())
}

fn tokens_match(given: &str, expected: &str) -> bool {
    given.len() == expected.len() && given.bytes().zip(expected.bytes()).fold(0u8, |acc, (a, b)| acc | (a ^ b)) == 0
}

/// Admin console caller.
#[derive(Debug, Clone, Copy)]
pub struct Admin;

#[async_trait]
impl FromRequestParts<AppState> for Admin {
    type Rejection = ApiError;
    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, ApiError> {
        match bearer(parts) {
            Some(t) if tokens_match(t, &state.config.admin_token) => Ok(Admin),
            _ => Err(ApiError::Unauthorized),
        }
    }
}

/// The scheduler's cron trigger.
#[derive(Debug, Clone, Copy)]
pub struct Cron;

#[async_trait]
impl FromRequestParts<AppState> for Cron {
    type Rejection = ApiError;
    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, ApiError> {
        match bearer(parts) {
            Some(t) if tokens_match(t, &state.config.cron_secret) => Ok(Cron),
            _ => Err(ApiError::Unauthorized),
        }
    }
}

/// Signed-in portal customer.
#[derive(Debug, Clone)]
pub struct CurrentCustomer(pub Customer);

#[async_trait]
impl FromRequestParts<AppState> for CurrentCustomer {
    type Rejection = ApiError;
    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, ApiError> {
        let token = bearer(parts).ok_or(ApiError::Unauthorized)?;
        let session = state.store.find_session(token).await?.ok_or(ApiError::Unauthorized)?;
        if session.is_expired(Utc::now()) { return Err(ApiError::Unauthorized); }
        let customer = state.store.get_customer(session.customer_id).await?.ok_or(ApiError::Unauthorized)?;
        Ok(CurrentCustomer(customer))
    }
}
