//! API errors mapped to HTTP status codes with a `{"error": "..."}` body.

use crate::tagger::TaggerError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use tagsim_core::IndexError;

#[derive(Debug)]
pub enum ApiError {
    /// Missing or unacceptable upload (400).
    BadRequest(String),
    /// Admin token missing or wrong (401).
    Unauthorized(String),
    /// Tagger failed to caption the upload (502).
    BadGateway(String),
    /// No index loaded yet (503).
    ServiceUnavailable(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::BadGateway(msg) => (StatusCode::BAD_GATEWAY, msg),
            ApiError::ServiceUnavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };
        (status, axum::Json(json!({ "error": message }))).into_response()
    }
}

impl From<IndexError> for ApiError {
    fn from(e: IndexError) -> Self {
        match e {
            e @ IndexError::IndexNotLoaded => ApiError::ServiceUnavailable(e.to_string()),
            other => {
                tracing::error!(error = %other, "index error");
                ApiError::Internal(other.to_string())
            }
        }
    }
}

impl From<TaggerError> for ApiError {
    fn from(e: TaggerError) -> Self {
        ApiError::BadGateway(e.to_string())
    }
}
