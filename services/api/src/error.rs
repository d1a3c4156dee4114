//! services/api/src/error.rs
//!
//! Defines the primary error type for the entire API service and how each
//! variant is reported over HTTP.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use docchat_core::ports::PortError;
use serde_json::json;
use tracing::error;

use crate::config::ConfigError;

/// Discriminator the client interceptor looks for before refreshing.
pub const TOKEN_EXPIRED_MARKER: &str = "TOKEN_EXPIRED";

/// The primary error type for the `api` service.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Represents an error that propagated up from one of the core service ports.
    #[error("{0}")]
    Port(#[from] PortError),

    /// Represents an error from the underlying database library.
    #[error("Database Error: {0}")]
    Database(#[from] sqlx::Error),

    /// Represents a standard Input/Output error (e.g., binding to a network socket).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Missing or malformed input. Raised before anything is persisted.
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Conflict(String),

    /// Bad credentials, missing or invalid access token, or unknown account.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// The access token was well formed but its lifetime has elapsed.
    #[error("Unauthorized: Token expired")]
    TokenExpired,

    /// The account exists but belongs to a different sign-in method.
    #[error("{0}")]
    WrongProvider(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    UnsupportedType(String),

    #[error("{0}")]
    PayloadTooLarge(String),

    #[error("No refresh token provided")]
    NoRefreshToken,

    #[error("{0}")]
    InvalidRefreshToken(String),

    /// Extraction, model or mail failure. The message is passed through.
    #[error("{0}")]
    Upstream(String),

    /// A catch-all for any other unexpected errors.
    #[error("An unexpected internal error occurred: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) | ApiError::PayloadTooLarge(_) => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Unauthorized(_) | ApiError::TokenExpired | ApiError::NoRefreshToken => {
                StatusCode::UNAUTHORIZED
            }
            ApiError::WrongProvider(_) | ApiError::InvalidRefreshToken(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::UnsupportedType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ApiError::Port(PortError::NotFound(_)) => StatusCode::NOT_FOUND,
            ApiError::Port(PortError::Conflict(_)) => StatusCode::CONFLICT,
            ApiError::Port(PortError::Unauthorized) => StatusCode::UNAUTHORIZED,
            ApiError::Port(_)
            | ApiError::Config(_)
            | ApiError::Database(_)
            | ApiError::Io(_)
            | ApiError::Upstream(_)
            | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("Request failed: {}", self);
        }

        let body = match &self {
            ApiError::TokenExpired => json!({
                "success": false,
                "message": self.to_string(),
                "error": TOKEN_EXPIRED_MARKER,
            }),
            _ => json!({
                "success": false,
                "message": self.to_string(),
            }),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_json(err: ApiError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn expired_token_carries_the_marker() {
        let (status, body) = body_json(ApiError::TokenExpired).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "TOKEN_EXPIRED");
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn other_unauthorized_errors_have_no_marker() {
        let (status, body) = body_json(ApiError::Unauthorized("Invalid token".into())).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(body.get("error").is_none());
        assert_eq!(body["message"], "Unauthorized: Invalid token");
    }

    #[test]
    fn taxonomy_maps_to_expected_statuses() {
        assert_eq!(ApiError::Conflict("x".into()).status(), StatusCode::CONFLICT);
        assert_eq!(ApiError::WrongProvider("x".into()).status(), StatusCode::FORBIDDEN);
        assert_eq!(ApiError::NoRefreshToken.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::InvalidRefreshToken("x".into()).status(), StatusCode::FORBIDDEN);
        assert_eq!(
            ApiError::UnsupportedType("x".into()).status(),
            StatusCode::UNSUPPORTED_MEDIA_TYPE
        );
        assert_eq!(ApiError::PayloadTooLarge("x".into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ApiError::Port(PortError::Unexpected("db down".into())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
