//! API error types for labelconv-srv

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use labelconv_common::Error as CoreError;
use serde_json::json;
use thiserror::Error;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Duplicate active request for the submitting email (409)
    #[error("Request already exists (id: {existing_id})")]
    Conflict { existing_id: String },

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),

    /// Core lifecycle error
    #[error(transparent)]
    Common(#[from] CoreError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        // Conflict carries the surviving request id so the client can
        // point the customer at their existing submission.
        let (status, body) = match self {
            ApiError::Conflict { existing_id }
            | ApiError::Common(CoreError::Conflict { existing_id }) => (
                StatusCode::CONFLICT,
                json!({
                    "error": "Request already exists for this email",
                    "existingRequestId": existing_id,
                }),
            ),
            ApiError::BadRequest(msg) => error_body(StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::NotFound(msg) => error_body(StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            ApiError::Internal(msg) => {
                error_body(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", msg)
            }
            ApiError::Common(err) => match err {
                CoreError::InvalidInput(msg) => {
                    error_body(StatusCode::BAD_REQUEST, "BAD_REQUEST", msg)
                }
                CoreError::NotFound(msg) => error_body(StatusCode::NOT_FOUND, "NOT_FOUND", msg),
                CoreError::StorageUnavailable(msg) => {
                    error_body(StatusCode::SERVICE_UNAVAILABLE, "STORAGE_UNAVAILABLE", msg)
                }
                CoreError::StorageWrite(msg) => error_body(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "STORAGE_WRITE_FAILED",
                    msg,
                ),
                other => error_body(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    other.to_string(),
                ),
            },
        };

        (status, Json(body)).into_response()
    }
}

fn error_body(status: StatusCode, code: &str, message: String) -> (StatusCode, serde_json::Value) {
    (
        status,
        json!({
            "error": {
                "code": code,
                "message": message,
            }
        }),
    )
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
