// HTTP API and pipeline error types
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};

use crate::middleware::origin::OriginReason;

/// HTTP API error with appropriate status codes and client-friendly messages
#[derive(Debug)]
pub enum ApiError {
    // 403 Forbidden
    Forbidden(String),

    // 404 Not Found
    NotFound(String),

    // 500 Internal Server Error
    InternalServerError(String),
}

impl ApiError {
    /// Get HTTP status code
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::Forbidden(_) => 403,
            ApiError::NotFound(_) => 404,
            ApiError::InternalServerError(_) => 500,
        }
    }

    /// Get client-safe error message
    pub fn message(&self) -> &str {
        match self {
            ApiError::Forbidden(msg) => msg,
            ApiError::NotFound(msg) => msg,
            ApiError::InternalServerError(msg) => msg,
        }
    }

    /// Get error code for client handling
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::InternalServerError(_) => "INTERNAL_SERVER_ERROR",
        }
    }

    /// Convert to JSON response body
    pub fn to_json(&self) -> Value {
        json!({
            "error": true,
            "message": self.message(),
            "code": self.error_code()
        })
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::Forbidden(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn internal_server_error(message: impl Into<String>) -> Self {
        ApiError::InternalServerError(message.into())
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ApiError {}

// Automatic HTTP response conversion for Axum
impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.to_json())).into_response()
    }
}

/// Everything that can go wrong while a request crosses the edge pipeline.
///
/// Only [`PipelineError::is_terminal`] variants ever reach the caller; the
/// rest are logged by the middleware that produced them and dropped.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("origin {origin:?} denied: {reason:?}")]
    OriginDenied { origin: String, reason: OriginReason },

    #[error("origin header could not be parsed: {0}")]
    PathUnparseable(String),

    #[error("no usable bearer credential: {0}")]
    AuthExtractionSkipped(&'static str),

    #[error("authentication failed: {0}")]
    AuthenticationFailed(#[from] crate::auth::AuthError),

    #[error("identity lookup for '{username}' failed: {source}")]
    IdentityLookupFailed {
        username: String,
        #[source]
        source: crate::services::IdentityError,
    },

    #[error("identity creation for '{username}' failed: {source}")]
    IdentityCreationFailed {
        username: String,
        #[source]
        source: crate::services::IdentityError,
    },

    #[error("unable to generate request id: {0}")]
    CorrelationGenerationFailed(String),

    #[error("no API tree serves path {0}")]
    RoutingMiss(String),
}

impl PipelineError {
    /// Terminal errors short-circuit the request with a caller-visible rejection
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PipelineError::OriginDenied { .. }
                | PipelineError::PathUnparseable(_)
                | PipelineError::RoutingMiss(_)
        )
    }
}

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        if !err.is_terminal() {
            // Absorbed errors should never be turned into a response
            tracing::error!("non-terminal pipeline error surfaced as response: {}", err);
            return ApiError::internal_server_error("An error occurred while processing your request");
        }

        match err {
            PipelineError::RoutingMiss(path) => ApiError::not_found(format!("No API serves path '{}'", path)),
            _ => ApiError::forbidden("Origin not allowed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_errors_map_to_caller_visible_status() {
        let denied: ApiError = PipelineError::OriginDenied {
            origin: "http://example.com".into(),
            reason: OriginReason::SchemeMismatch,
        }
        .into();
        assert_eq!(denied.status_code(), 403);

        let unparseable: ApiError = PipelineError::PathUnparseable("::".into()).into();
        assert_eq!(unparseable.status_code(), 403);

        let miss: ApiError = PipelineError::RoutingMiss("/v9/x".into()).into();
        assert_eq!(miss.status_code(), 404);
        assert_eq!(miss.to_json()["code"], "NOT_FOUND");
    }

    #[test]
    fn test_absorbed_errors_are_not_terminal() {
        assert!(!PipelineError::AuthExtractionSkipped("missing header").is_terminal());
        assert!(!PipelineError::CorrelationGenerationFailed("entropy".into()).is_terminal());
        assert!(PipelineError::RoutingMiss("/".into()).is_terminal());
    }

    #[test]
    fn test_absorbed_errors_never_leak_detail() {
        let absorbed = [
            PipelineError::AuthExtractionSkipped("missing header"),
            PipelineError::CorrelationGenerationFailed("entropy".into()),
            PipelineError::IdentityLookupFailed {
                username: "alice".into(),
                source: crate::services::IdentityError::Unavailable("lookup timed out".into()),
            },
        ];

        for err in absorbed {
            let api: ApiError = err.into();
            assert_eq!(api.status_code(), 500);
            assert!(!api.message().contains("alice"));
        }
    }
}
