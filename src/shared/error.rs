//! Application Error Types
//!
//! Centralized error handling with Axum integration.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Application error type
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Rate limited")]
    RateLimited,

    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Validation error: {message}")]
    Validation {
        message: String,
        errors: Vec<FieldError>,
    },
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: u16,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<FieldError>>,
}

/// Field-level validation error
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl AppError {
    /// HTTP status and numeric error code for this error.
    pub fn status_and_code(&self) -> (StatusCode, u16) {
        match self {
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, 10001),
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, 10002),
            AppError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, 10003),
            AppError::Forbidden(_) => (StatusCode::FORBIDDEN, 10004),
            AppError::Conflict(_) => (StatusCode::CONFLICT, 10005),
            AppError::RateLimited => (StatusCode::TOO_MANY_REQUESTS, 10006),
            AppError::Validation { .. } => (StatusCode::BAD_REQUEST, 10007),
            AppError::PayloadTooLarge(_) => (StatusCode::PAYLOAD_TOO_LARGE, 10008),
            AppError::Internal(_)
            | AppError::Database(_)
            | AppError::Redis(_)
            | AppError::Storage(_) => (StatusCode::INTERNAL_SERVER_ERROR, 10000),
        }
    }

    /// Message safe to show to clients. Server-side failures are logged
    /// here and replaced by a generic message.
    pub fn public_message(&self) -> String {
        match self {
            AppError::NotFound(msg)
            | AppError::BadRequest(msg)
            | AppError::Unauthorized(msg)
            | AppError::Forbidden(msg)
            | AppError::Conflict(msg)
            | AppError::PayloadTooLarge(msg) => msg.clone(),
            AppError::Validation { message, .. } => message.clone(),
            AppError::RateLimited => "Rate limited".into(),
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                "Internal server error".into()
            }
            AppError::Database(e) => {
                tracing::error!("Database error: {}", e);
                "Internal server error".into()
            }
            AppError::Redis(e) => {
                tracing::error!("Redis error: {}", e);
                "Internal server error".into()
            }
            AppError::Storage(msg) => {
                tracing::error!("Storage error: {}", msg);
                "Internal server error".into()
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        let message = self.public_message();
        let errors = match self {
            AppError::Validation { errors, .. } if !errors.is_empty() => Some(errors),
            _ => None,
        };

        let body = ErrorResponse {
            code,
            message,
            errors,
        };

        (status, Json(body)).into_response()
    }
}

/// True when the error is a PostgreSQL unique-constraint violation.
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(AppError::NotFound("x".into()), StatusCode::NOT_FOUND, 10001)]
    #[test_case(AppError::BadRequest("x".into()), StatusCode::BAD_REQUEST, 10002)]
    #[test_case(AppError::Unauthorized("x".into()), StatusCode::UNAUTHORIZED, 10003)]
    #[test_case(AppError::Forbidden("x".into()), StatusCode::FORBIDDEN, 10004)]
    #[test_case(AppError::Conflict("x".into()), StatusCode::CONFLICT, 10005)]
    #[test_case(AppError::RateLimited, StatusCode::TOO_MANY_REQUESTS, 10006)]
    #[test_case(AppError::PayloadTooLarge("x".into()), StatusCode::PAYLOAD_TOO_LARGE, 10008)]
    #[test_case(AppError::Storage("x".into()), StatusCode::INTERNAL_SERVER_ERROR, 10000)]
    fn test_status_mapping(err: AppError, status: StatusCode, code: u16) {
        assert_eq!(err.status_and_code(), (status, code));
    }

    #[test]
    fn test_internal_details_are_hidden() {
        let err = AppError::Internal("connection refused to 10.0.0.3".into());
        assert_eq!(err.public_message(), "Internal server error");
    }

    #[test]
    fn test_into_response_status() {
        let response = AppError::Conflict("Email already exists".into()).into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }
}
