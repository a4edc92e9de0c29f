//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use domain::{DomainError, OrderError};
use store::StoreError;
use serde_json::json;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Bad request from the client.
    BadRequest(String),
    /// Domain logic error.
    Domain(DomainError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, json!({ "error": msg })),
            ApiError::Domain(err) => domain_error_to_response(err),
        };

        (status, axum::Json(body)).into_response()
    }
}

fn domain_error_to_response(err: DomainError) -> (StatusCode, serde_json::Value) {
    let status = match &err {
        DomainError::InsufficientStock {
            book_id,
            requested,
            available,
        } => {
            let body = json!({
                "error": err.to_string(),
                "book_id": book_id,
                "requested": requested,
                "available": available,
            });
            return (StatusCode::CONFLICT, body);
        }
        DomainError::OrderNotFound(_) | DomainError::BookNotFound(_) => StatusCode::NOT_FOUND,
        DomainError::Forbidden(_) => StatusCode::FORBIDDEN,
        DomainError::Unauthenticated => StatusCode::UNAUTHORIZED,
        DomainError::BookInUse(_) => StatusCode::CONFLICT,
        DomainError::InvalidBook(_) => StatusCode::BAD_REQUEST,
        DomainError::Order(order_err) => match order_err {
            OrderError::NotEditable { .. } => StatusCode::CONFLICT,
            OrderError::CustomerIdRequired
            | OrderError::InvalidQuantity { .. }
            | OrderError::NoItems => StatusCode::BAD_REQUEST,
            OrderError::TotalOutOfRange => StatusCode::UNPROCESSABLE_ENTITY,
        },
        DomainError::Store(StoreError::OutOfRange(_)) => StatusCode::UNPROCESSABLE_ENTITY,
        DomainError::Store(store_err) if store_err.is_transient() => {
            tracing::warn!(error = %store_err, "store unavailable");
            StatusCode::SERVICE_UNAVAILABLE
        }
        DomainError::Store(store_err) => {
            tracing::error!(error = %store_err, "internal server error");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };

    (status, json!({ "error": err.to_string() }))
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        ApiError::Domain(err)
    }
}
