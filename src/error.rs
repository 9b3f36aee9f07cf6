use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CourierError>;

#[derive(Debug, Clone, Error)]
pub enum CourierError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Email not found")]
    NotFound,

    /// A breaker rejected the call before the provider was invoked.
    #[error("Circuit breaker is open")]
    BreakerOpen,

    /// A provider-reported transport failure, retried per backoff policy.
    #[error("{0}")]
    Provider(String),

    #[error("All providers failed")]
    AllProvidersExhausted,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CourierError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            CourierError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            CourierError::RateLimitExceeded => StatusCode::TOO_MANY_REQUESTS,
            CourierError::NotFound => StatusCode::NOT_FOUND,
            CourierError::BreakerOpen
            | CourierError::Provider(_)
            | CourierError::AllProvidersExhausted => StatusCode::BAD_GATEWAY,
            CourierError::Config(_) | CourierError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

impl IntoResponse for CourierError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.to_string(),
        };
        (self.status_code(), Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            CourierError::RateLimitExceeded.status_code(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            CourierError::InvalidRequest("missing field".to_string()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(CourierError::NotFound.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_display_messages() {
        assert_eq!(
            CourierError::RateLimitExceeded.to_string(),
            "Rate limit exceeded"
        );
        assert_eq!(
            CourierError::BreakerOpen.to_string(),
            "Circuit breaker is open"
        );
    }
}
