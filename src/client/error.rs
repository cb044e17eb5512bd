use reqwest::StatusCode;
use serde::Deserialize;

use crate::models::ValidationError;

/// Failures a client component reports to whoever triggered the action.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClientError {
    #[error("{0}")]
    Validation(#[from] ValidationError),

    #[error("this report has already been handled")]
    AlreadyResolved,

    #[error("please sign in again")]
    Unauthenticated,

    #[error("you are not allowed to do that: {0}")]
    Forbidden(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("too many requests, try again later")]
    RateLimited,

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("server error: {0}")]
    Server(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("request timed out")]
    Timeout,

    #[error("this action is not available")]
    Disabled,

    #[error("a request is already in flight")]
    Busy,
}

/// Coarse grouping used to pick a message and decide what the surface does next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Caught locally; nothing was sent.
    Validation,
    /// Informational; the surface refreshes what it shows.
    Notice,
    /// The session is gone and the user must sign in.
    Auth,
    /// Transient transport failure; dismissible.
    Network,
    Authorization,
    NotFound,
    Server,
    /// The control refused the action without calling out.
    Guard,
}

impl ClientError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            ClientError::Validation(_) => ErrorCategory::Validation,
            ClientError::AlreadyResolved | ClientError::Conflict(_) => ErrorCategory::Notice,
            ClientError::Unauthenticated => ErrorCategory::Auth,
            ClientError::Network(_) | ClientError::Timeout | ClientError::RateLimited => {
                ErrorCategory::Network
            }
            ClientError::Forbidden(_) => ErrorCategory::Authorization,
            ClientError::NotFound(_) => ErrorCategory::NotFound,
            ClientError::BadRequest(_) | ClientError::Server(_) => ErrorCategory::Server,
            ClientError::Disabled | ClientError::Busy => ErrorCategory::Guard,
        }
    }

    /// Maps a non-success response onto the taxonomy, using the body's
    /// machine code where one is present.
    pub fn from_response(status: StatusCode, body: &str) -> Self {
        let parsed: Option<ErrorBody> = serde_json::from_str(body).ok();
        let code = parsed.as_ref().and_then(|b| b.code.as_deref());
        let message = parsed
            .as_ref()
            .map(|b| b.error.clone())
            .unwrap_or_else(|| status.canonical_reason().unwrap_or("error").to_string());

        match status {
            StatusCode::UNAUTHORIZED => ClientError::Unauthenticated,
            StatusCode::FORBIDDEN => ClientError::Forbidden(message),
            StatusCode::NOT_FOUND => ClientError::NotFound(message),
            StatusCode::CONFLICT if code == Some("already_resolved") => {
                ClientError::AlreadyResolved
            }
            StatusCode::CONFLICT => ClientError::Conflict(message),
            StatusCode::TOO_MANY_REQUESTS => ClientError::RateLimited,
            StatusCode::BAD_REQUEST => match code.and_then(ValidationError::from_code) {
                Some(validation) => ClientError::Validation(validation),
                None => ClientError::BadRequest(message),
            },
            _ => ClientError::Server(message),
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ClientError::Timeout
        } else if e.is_decode() {
            ClientError::Server(format!("unexpected response: {e}"))
        } else {
            ClientError::Network(e.to_string())
        }
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
    #[serde(default)]
    code: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(code: &str) -> String {
        format!(r#"{{"error":"nope","code":"{code}","status":0}}"#)
    }

    #[test]
    fn statuses_map_to_distinct_categories() {
        let cases = [
            (StatusCode::UNAUTHORIZED, ErrorCategory::Auth),
            (StatusCode::FORBIDDEN, ErrorCategory::Authorization),
            (StatusCode::NOT_FOUND, ErrorCategory::NotFound),
            (StatusCode::INTERNAL_SERVER_ERROR, ErrorCategory::Server),
        ];
        for (status, category) in cases {
            let err = ClientError::from_response(status, &body("whatever"));
            assert_eq!(err.category(), category, "{status}");
        }
    }

    #[test]
    fn conflict_codes_are_told_apart() {
        assert_eq!(
            ClientError::from_response(StatusCode::CONFLICT, &body("already_resolved")),
            ClientError::AlreadyResolved
        );
        assert_eq!(
            ClientError::from_response(StatusCode::CONFLICT, &body("duplicate_report")),
            ClientError::Conflict("nope".to_string())
        );
    }

    #[test]
    fn server_validation_codes_come_back_as_validation_errors() {
        assert_eq!(
            ClientError::from_response(StatusCode::BAD_REQUEST, &body("too_many_images")),
            ClientError::Validation(ValidationError::TooManyImages)
        );
        assert_eq!(
            ClientError::from_response(StatusCode::BAD_REQUEST, &body("validation")),
            ClientError::BadRequest("nope".to_string())
        );
    }

    #[test]
    fn unparseable_bodies_fall_back_to_the_status_text() {
        assert_eq!(
            ClientError::from_response(StatusCode::BAD_GATEWAY, "<html>"),
            ClientError::Server("Bad Gateway".to_string())
        );
    }
}
