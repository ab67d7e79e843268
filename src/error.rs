//! # Error Handling
//!
//! This module defines custom error types for the application and handles
//! converting them into HTTP responses.
//!
//! A failed cryptographic check is deliberately *not* represented here:
//! a well-formed ceremony response that does not verify produces a normal
//! `{ "verified": false }` result, and callers branch on that boolean. The
//! variants below cover request-shape problems that are rejected before any
//! cryptographic work, plus the usual infrastructure failures.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::store::StoreError;

/// Application-wide error type
///
/// Each variant corresponds to a different category of error. The `#[from]`
/// attributes let storage and serialization errors convert automatically via
/// the `?` operator.
#[derive(Error, Debug)]
pub enum AppError {
    /// Storage errors (SQLite or in-memory backend)
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Username fails format validation; rejected before any storage access
    #[error("Invalid username: {0}")]
    InvalidUsername(String),

    /// User or credential absent where one is required (404)
    #[error("Not found: {0}")]
    NotFound(String),

    /// No outstanding challenge for this username: never issued, already
    /// consumed, or overwritten by a newer ceremony
    #[error("Challenge expired or was never issued")]
    ChallengeExpired,

    /// Assertion references a credential id not on file for the claimed user
    #[error("Credential is not registered for this user")]
    CredentialNotFound,

    /// Administrative operation attempted while the policy is locked (403)
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Malformed client payload (400)
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Missing or expired session (401)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Unexpected errors that shouldn't normally occur (500)
    #[error("Internal server error: {0}")]
    Internal(String),
}

/// Convert AppError into an HTTP response
///
/// Allows handlers to return `Result<T, AppError>` and have errors
/// automatically converted into proper HTTP error responses. Internal
/// details are logged server-side; the client receives a generic message
/// for the opaque variants.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            AppError::Store(e) => {
                tracing::error!("Storage error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Storage error".to_string(),
                )
            }
            AppError::Serialization(e) => {
                tracing::error!("Serialization error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Serialization error".to_string(),
                )
            }
            // For these errors, the message is safe to show to users
            AppError::InvalidUsername(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, self.to_string()),
            AppError::ChallengeExpired => (StatusCode::BAD_REQUEST, self.to_string()),
            AppError::CredentialNotFound => (StatusCode::BAD_REQUEST, self.to_string()),
            AppError::Forbidden(_) => (StatusCode::FORBIDDEN, self.to_string()),
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            AppError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, self.to_string()),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()),
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

/// Convenience type alias for Results using AppError
pub type AppResult<T> = Result<T, AppError>;
