//! # API Error Types
//!
//! [`AppError`] implements `axum::response::IntoResponse`. It wraps the
//! closed [`DomainError`] taxonomy and adds the transport-only failures
//! (malformed body, failed request validation, rate limiting).
//!
//! Every error body has the same shape:
//!
//! ```json
//! { "error": { "code": "NOT_FOUND", "message": "listing 9 not found" } }
//! ```
//!
//! Internal error details are logged and never returned to clients.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use estate_core::{DomainError, ValidationError};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// Structured JSON error response body.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

/// Inner error detail.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g. "NOT_FOUND", "INVALID_TOKEN").
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Additional context, present only for some client errors.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Application-level error returned by every handler.
#[derive(Error, Debug)]
pub enum AppError {
    /// A failure produced by the session manager, access gate or services.
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// Request body, path or query could not be parsed (400).
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Request parsed but violates a field rule (422).
    #[error("validation error: {0}")]
    Validation(String),

    /// Too many requests from one client (429).
    #[error("rate limit exceeded, retry after {retry_after_secs}s")]
    RateLimited {
        /// Seconds until the current window resets.
        retry_after_secs: u64,
    },
}

impl AppError {
    /// HTTP status and machine-readable code for this error.
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::Domain(err) => match err {
                DomainError::Unauthenticated => (StatusCode::UNAUTHORIZED, "UNAUTHENTICATED"),
                DomainError::InvalidToken(_) => (StatusCode::UNAUTHORIZED, "INVALID_TOKEN"),
                DomainError::InvalidCredentials => {
                    (StatusCode::UNAUTHORIZED, "INVALID_CREDENTIALS")
                }
                DomainError::Forbidden(_) => (StatusCode::FORBIDDEN, "FORBIDDEN"),
                DomainError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
                DomainError::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT"),
                DomainError::Invalid(_) => (StatusCode::CONFLICT, "INVALID_MUTATION"),
                DomainError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
            },
            Self::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            Self::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR"),
            Self::RateLimited { .. } => (StatusCode::TOO_MANY_REQUESTS, "RATE_LIMITED"),
        }
    }

    fn is_internal(&self) -> bool {
        matches!(self, Self::Domain(DomainError::Internal(_)))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let message = if self.is_internal() {
            tracing::error!(error = %self, "internal server error");
            "An internal error occurred".to_string()
        } else {
            self.to_string()
        };

        let details = match &self {
            Self::RateLimited { retry_after_secs } => {
                Some(serde_json::json!({ "retryAfterSecs": retry_after_secs }))
            }
            _ => None,
        };

        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message,
                details,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        Self::Validation(err.to_string())
    }
}
