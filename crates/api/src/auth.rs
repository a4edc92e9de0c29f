//! Caller identity forwarded by the upstream gateway.
//!
//! The gateway authenticates the request and sets exactly one of
//! `x-customer-id` or `x-admin-id`. Requests with neither are anonymous.

use axum::extract::FromRequestParts;
use axum::http::HeaderMap;
use axum::http::request::Parts;
use domain::Caller;
use store::{AdminId, CustomerId};

use crate::error::ApiError;

pub const CUSTOMER_HEADER: &str = "x-customer-id";
pub const ADMIN_HEADER: &str = "x-admin-id";

/// Extractor resolving the [`Caller`] of a request.
#[derive(Debug, Clone, Copy)]
pub struct Identity(pub Caller);

impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        caller_from_headers(&parts.headers).map(Identity)
    }
}

/// Reads the identity headers.
pub fn caller_from_headers(headers: &HeaderMap) -> Result<Caller, ApiError> {
    let customer = header_id(headers, CUSTOMER_HEADER)?;
    let admin = header_id(headers, ADMIN_HEADER)?;

    match (customer, admin) {
        (None, None) => Ok(Caller::Anonymous),
        (Some(id), None) => Ok(Caller::Customer(CustomerId::new(id))),
        (None, Some(id)) => Ok(Caller::Admin(AdminId::new(id))),
        (Some(_), Some(_)) => Err(ApiError::BadRequest(format!(
            "only one of {CUSTOMER_HEADER} and {ADMIN_HEADER} may be set"
        ))),
    }
}

fn header_id(headers: &HeaderMap, name: &str) -> Result<Option<i64>, ApiError> {
    let Some(value) = headers.get(name) else {
        return Ok(None);
    };
    value
        .to_str()
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .map(Some)
        .ok_or_else(|| ApiError::BadRequest(format!("invalid {name} header")))
}
