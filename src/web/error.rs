//! API error type and its mapping onto HTTP responses.

#![allow(dead_code)]

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

use crate::error::Error as CoreError;

/// Error surface of the web API. Every variant renders as
/// `{"error": "<message>"}` with a matching status code. Domain error
/// messages pass through verbatim so clients can surface them as-is;
/// internal details never leave the process.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Internal server error")]
    Internal(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        let message = err.to_string();
        match err {
            CoreError::Validation(_)
            | CoreError::InvalidTarget(_)
            | CoreError::QueueClosed
            | CoreError::QueueFull
            | CoreError::AlreadyBooked
            | CoreError::SwapQuotaExceeded => ApiError::BadRequest(message),

            CoreError::NotFound(_) => ApiError::NotFound(message),
            CoreError::Forbidden(_) => ApiError::Forbidden(message),

            CoreError::AlreadyCalling
            | CoreError::QueueEmpty
            | CoreError::TokenNotWaiting(_)
            | CoreError::TokenNotCalling
            | CoreError::TokenTerminal(_)
            | CoreError::TokenStateChanged
            | CoreError::SwapAlreadyResolved => ApiError::Conflict(message),

            CoreError::Config(_)
            | CoreError::Io(_)
            | CoreError::Json(_)
            | CoreError::Directory(_)
            | CoreError::Web(_) => ApiError::Internal(message),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            ApiError::Internal(detail) => error!("Internal error: {}", detail),
            other => warn!("Request rejected ({}): {}", status.as_u16(), other),
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_errors_map_to_statuses() {
        assert_eq!(
            ApiError::from(CoreError::QueueFull).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(CoreError::AlreadyCalling).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::from(CoreError::NotFound("queue x".to_string())).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::from(CoreError::Forbidden("nope".to_string())).status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ApiError::from(CoreError::Directory("disk on fire".to_string())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_messages_pass_through_verbatim() {
        let api = ApiError::from(CoreError::QueueFull);
        assert_eq!(api.to_string(), "Queue is full");

        let api = ApiError::from(CoreError::SwapAlreadyResolved);
        assert_eq!(api.to_string(), "Swap request was already resolved");
    }

    #[test]
    fn test_internal_details_are_hidden() {
        let api = ApiError::from(CoreError::Directory("sqlite open: no such file".to_string()));
        assert_eq!(api.to_string(), "Internal server error");
    }
}
