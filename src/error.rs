use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::models::ValidationError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Invalid report: {0}")]
    InvalidReport(#[from] ValidationError),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Report already resolved")]
    AlreadyResolved,

    #[error("A pending report for this target already exists")]
    DuplicateReport,

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Authorization error: {0}")]
    Authorization(String),

    #[error("Account suspended")]
    Suspended,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("JWT error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    #[error("Rate limit exceeded")]
    RateLimit,
}

impl AppError {
    /// Machine-readable code carried next to the message in every error body.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Database(_) | AppError::Redis(_) | AppError::Internal(_) => "internal",
            AppError::InvalidReport(e) => e.code(),
            AppError::Validation(_) => "validation",
            AppError::AlreadyResolved => "already_resolved",
            AppError::DuplicateReport => "duplicate_report",
            AppError::Authentication(_) | AppError::Jwt(_) => "unauthenticated",
            AppError::Authorization(_) => "forbidden",
            AppError::Suspended => "account_suspended",
            AppError::NotFound(_) => "not_found",
            AppError::BadRequest(_) => "bad_request",
            AppError::RateLimit => "rate_limited",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let code = self.code();
        let (status, error_message) = match self {
            AppError::Database(ref e) => {
                tracing::error!("Database error: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
            AppError::Redis(ref e) => {
                tracing::error!("Redis error: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
            AppError::InvalidReport(ref e) => (StatusCode::BAD_REQUEST, e.to_string()),
            AppError::Validation(message) => (StatusCode::BAD_REQUEST, message),
            AppError::AlreadyResolved => (
                StatusCode::CONFLICT,
                "Report has already been resolved".to_string(),
            ),
            AppError::DuplicateReport => (
                StatusCode::CONFLICT,
                "You have already reported this".to_string(),
            ),
            AppError::Authentication(message) => (StatusCode::UNAUTHORIZED, message),
            AppError::Authorization(message) => (StatusCode::FORBIDDEN, message),
            AppError::Suspended => (StatusCode::FORBIDDEN, "Account is suspended".to_string()),
            AppError::NotFound(message) => (StatusCode::NOT_FOUND, message),
            AppError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            AppError::Internal(ref message) => {
                tracing::error!("Internal error: {}", message);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
            AppError::Jwt(ref e) => {
                tracing::warn!("JWT error: {:?}", e);
                (StatusCode::UNAUTHORIZED, "Invalid token".to_string())
            }
            AppError::RateLimit => (
                StatusCode::TOO_MANY_REQUESTS,
                "Rate limit exceeded".to_string(),
            ),
        };

        let body = Json(json!({
            "error": error_message,
            "code": code,
            "status": status.as_u16()
        }));

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

// Validation helper
impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let error_messages: Vec<String> = errors
            .field_errors()
            .iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |error| {
                    format!(
                        "{}: {}",
                        field,
                        error.message.as_ref().unwrap_or(&"Invalid value".into())
                    )
                })
            })
            .collect();

        AppError::Validation(error_messages.join(", "))
    }
}
