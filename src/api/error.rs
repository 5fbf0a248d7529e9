//! Maps ledger and auth errors to HTTP statuses with `{"error": ...}` bodies.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::ledger::LedgerError;

#[derive(Debug)]
pub enum ApiError {
    Ledger(LedgerError),
    Unauthorized,
    BadRequest(String),
    NotFound(&'static str),
    Internal(String),
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        ApiError::Ledger(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Ledger(err) => match &err {
                LedgerError::Validation(_)
                | LedgerError::InsufficientFunds { .. }
                | LedgerError::InsufficientShares { .. }
                | LedgerError::InvalidState(_) => (StatusCode::BAD_REQUEST, err.to_string()),
                LedgerError::NotFound(_) => (StatusCode::NOT_FOUND, err.to_string()),
                LedgerError::Forbidden => (StatusCode::FORBIDDEN, err.to_string()),
                LedgerError::Persistence(inner) => {
                    // Details stay in the logs, not in the response.
                    tracing::error!(err = %inner, "persistence failure");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "internal error".to_string(),
                    )
                }
            },
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized".to_string()),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::NotFound(what) => (StatusCode::NOT_FOUND, format!("{what} not found")),
            ApiError::Internal(msg) => {
                tracing::error!(%msg, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal error".to_string(),
                )
            }
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}
