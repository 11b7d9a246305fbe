//! services/api/src/error.rs
//!
//! Defines the primary error type for the entire API service and how each
//! variant is rendered as an HTTP response.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use diary_core::ports::PortError;
use serde_json::json;

use crate::config::ConfigError;

/// The primary error type for the `api` service.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Represents an error that propagated up from one of the core service ports.
    #[error("Service Port Error: {0}")]
    Port(#[from] PortError),

    /// Represents an error from the underlying database library.
    #[error("Database Error: {0}")]
    Database(#[from] sqlx::Error),

    /// Represents an error while running the embedded migrations.
    #[error("Migration Error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Represents a standard Input/Output error (e.g., binding to a network socket).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The request carried no usable credentials.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// A request parameter was malformed outside of the core's field rules.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// A catch-all for any other unexpected errors.
    #[error("An unexpected internal error occurred: {0}")]
    Internal(String),
}

/// Malformed or wrongly typed JSON bodies get the same `{detail, code}` shape.
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::Port(PortError::Validation { field, message }) => (
                StatusCode::BAD_REQUEST,
                json!({ "detail": message, "code": "validation_error", "field": field }),
            ),
            ApiError::Port(PortError::MissingParameter(detail)) => (
                StatusCode::BAD_REQUEST,
                json!({ "detail": detail, "code": "missing_parameter" }),
            ),
            ApiError::BadRequest(detail) => (
                StatusCode::BAD_REQUEST,
                json!({ "detail": detail, "code": "bad_request" }),
            ),
            ApiError::Port(PortError::NotFound(detail)) => (
                StatusCode::NOT_FOUND,
                json!({ "detail": detail, "code": "not_found" }),
            ),
            ApiError::Port(PortError::Conflict(detail)) => (
                StatusCode::CONFLICT,
                json!({ "detail": detail, "code": "conflict" }),
            ),
            ApiError::Unauthorized(detail) => (
                StatusCode::UNAUTHORIZED,
                json!({ "detail": detail, "code": "unauthorized" }),
            ),
            ApiError::Port(PortError::Unauthorized) => (
                StatusCode::UNAUTHORIZED,
                json!({ "detail": "Authentication credentials were not provided.", "code": "unauthorized" }),
            ),
            ApiError::Port(PortError::RateLimited(message)) => {
                tracing::warn!("Analysis provider rate limited the request: {}", message);
                (
                    StatusCode::TOO_MANY_REQUESTS,
                    json!({
                        "detail": "The OpenAI API usage limit was exceeded. Please check the billing page.",
                        "code": "rate_limited"
                    }),
                )
            }
            ApiError::Port(PortError::Upstream(message)) => {
                tracing::error!("Analysis provider error: {}", message);
                (
                    StatusCode::BAD_GATEWAY,
                    json!({ "detail": format!("OpenAI API error: {}", message), "code": "openai_error" }),
                )
            }
            other => {
                tracing::error!("Internal error: {:?}", other);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "detail": "internal server error", "code": "internal_error" }),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use serde_json::Value;

    async fn render(err: ApiError) -> (StatusCode, Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_rate_limited_maps_to_429() {
        let (status, body) = render(PortError::RateLimited("quota".into()).into()).await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(body["code"], "rate_limited");
        assert!(body["detail"].is_string());
    }

    #[tokio::test]
    async fn test_upstream_maps_to_502_with_message() {
        let (status, body) = render(PortError::Upstream("model overloaded".into()).into()).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["code"], "openai_error");
        assert!(body["detail"].as_str().unwrap().contains("model overloaded"));
    }

    #[tokio::test]
    async fn test_validation_names_field() {
        let (status, body) =
            render(PortError::validation("original_text", "too short").into()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["field"], "original_text");
        assert_eq!(body["code"], "validation_error");
    }

    #[tokio::test]
    async fn test_internal_errors_hide_details() {
        let (status, body) = render(PortError::Unexpected("db password wrong".into()).into()).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["detail"], "internal server error");
    }
}
