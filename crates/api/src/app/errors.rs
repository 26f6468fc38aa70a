//! Error envelopes.
//!
//! Every failure leaves the API as `{"success": false, "message": "..."}`
//! with a status drawn from the error kind. Backend failures are logged in
//! full but reported to the client as a generic message so connection
//! strings and SQL never leak outward.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use kosh_core::DomainError;
use kosh_store::StoreError;

use super::services::ServiceError;

/// The uniform failure body.
pub fn envelope(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "success": false, "message": message }))).into_response()
}

/// Missing or incomplete tenant scope.
pub fn unauthorized() -> Response {
    envelope(StatusCode::UNAUTHORIZED, "Unauthorized")
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        match self {
            ServiceError::Domain(err) => domain_response(err),
            ServiceError::Store(err) => store_response(err),
        }
    }
}

fn domain_response(err: DomainError) -> Response {
    let status = match &err {
        DomainError::Validation(_) | DomainError::InvariantViolation(_) => {
            StatusCode::BAD_REQUEST
        }
        DomainError::NotFound => StatusCode::NOT_FOUND,
        DomainError::Unauthorized => StatusCode::UNAUTHORIZED,
    };
    envelope(status, &err.to_string())
}

fn store_response(err: StoreError) -> Response {
    match err {
        StoreError::NotFound => envelope(StatusCode::NOT_FOUND, "voucher not found"),
        StoreError::Conflict(detail) => {
            tracing::warn!(detail = %detail, "allocation conflict surfaced to client");
            envelope(StatusCode::CONFLICT, "voucher number conflict, please retry")
        }
        StoreError::Backend(detail) => {
            tracing::error!(detail = %detail, "store backend failure");
            envelope(StatusCode::INTERNAL_SERVER_ERROR, "internal server error")
        }
    }
}
