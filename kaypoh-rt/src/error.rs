//! Error types for kaypoh-rt

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::services::{ClassifierError, CrawlError};

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Upstream service failed or answered unexpectedly (502)
    #[error("Upstream failure: {0}")]
    BadGateway(String),

    /// Crawl did not finish within the wait budget (504)
    #[error("Upstream timeout: {0}")]
    GatewayTimeout(String),

    /// kaypoh-common error
    #[error("Common error: {0}")]
    Common(#[from] kaypoh_common::Error),
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<CrawlError> for ApiError {
    fn from(e: CrawlError) -> Self {
        match e {
            CrawlError::WaitExceeded { .. } => ApiError::GatewayTimeout(e.to_string()),
            _ => ApiError::BadGateway(e.to_string()),
        }
    }
}

impl From<ClassifierError> for ApiError {
    fn from(e: ClassifierError) -> Self {
        ApiError::BadGateway(e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::BadGateway(msg) => (StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR", msg),
            ApiError::GatewayTimeout(msg) => {
                (StatusCode::GATEWAY_TIMEOUT, "UPSTREAM_TIMEOUT", msg)
            }
            ApiError::Common(kaypoh_common::Error::InvalidInput(msg)) => {
                (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg)
            }
            ApiError::Common(ref err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "COMMON_ERROR",
                err.to_string(),
            ),
        };

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crawl_errors_map_to_gateway_statuses() {
        let timeout: ApiError = CrawlError::WaitExceeded { seconds: 300 }.into();
        assert_eq!(timeout.into_response().status(), StatusCode::GATEWAY_TIMEOUT);

        let failed: ApiError = CrawlError::JobFailed {
            status: crate::services::RunStatus::Failed,
            message: "Scraping failed: boom".to_string(),
        }
        .into();
        assert_eq!(failed.into_response().status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_invalid_input_is_bad_request() {
        let err: ApiError = kaypoh_common::Error::InvalidInput("Review text is required".into()).into();
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_exhausted_classifier_is_bad_gateway() {
        let err: ApiError = ClassifierError::Exhausted {
            attempts: 3,
            last_error: "warming up".to_string(),
        }
        .into();
        assert_eq!(err.into_response().status(), StatusCode::BAD_GATEWAY);
    }
}
