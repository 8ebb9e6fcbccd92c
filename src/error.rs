use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum AppError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("invalid coordinate: {0}")]
    InvalidCoordinate(String),

    #[error("duplicate claim: {0}")]
    DuplicateClaim(String),

    /// The claim is terminal, or another claim already won the order.
    #[error("already resolved: {0}")]
    AlreadyResolved(String),

    #[error("invalid transition: {0}")]
    InvalidTransition(String),

    /// Storage rejected a write; nothing from the attempted write is visible.
    #[error("transaction failed: {0}")]
    TransactionFailure(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn code(&self) -> &'static str {
        match self {
            AppError::NotFound(_) => "not_found",
            AppError::BadRequest(_) => "bad_request",
            AppError::InvalidCoordinate(_) => "invalid_coordinate",
            AppError::DuplicateClaim(_) => "duplicate_claim",
            AppError::AlreadyResolved(_) => "already_resolved",
            AppError::InvalidTransition(_) => "invalid_transition",
            AppError::TransactionFailure(_) => "transaction_failure",
            AppError::Internal(_) => "internal",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::BadRequest(msg) | AppError::InvalidCoordinate(msg) => {
                (StatusCode::BAD_REQUEST, msg.clone())
            }
            AppError::DuplicateClaim(msg)
            | AppError::AlreadyResolved(msg)
            | AppError::InvalidTransition(msg) => (StatusCode::CONFLICT, msg.clone()),
            AppError::TransactionFailure(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg.clone()),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        let body = Json(json!({
            "error": message,
            "code": self.code(),
        }));

        (status, body).into_response()
    }
}
