//! Error types for the RAG system

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Result type alias for RAG operations
pub type Result<T> = std::result::Result<T, Error>;

/// RAG system errors
#[derive(Debug, Error)]
pub enum Error {
    /// File extension not in the configured allow-list
    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    /// Upload exceeds the configured maximum size
    #[error("File too large: {size_mb:.2}MB exceeds limit of {limit_mb}MB")]
    TooLarge { size_mb: f64, limit_mb: u64 },

    /// Chat message was empty or whitespace-only
    #[error("Query must not be empty")]
    QueryEmpty,

    /// Admin request carried no `X-Admin-Key` header
    #[error("Missing admin credential")]
    AuthMissing,

    /// Admin request carried a key that did not match configuration
    #[error("Invalid admin credential")]
    AuthInvalid,

    /// Failed to extract text from an uploaded file
    #[error("Failed to parse '{filename}': {message}")]
    ParseFailed { filename: String, message: String },

    /// Embedding backend failed to produce a vector
    #[error("Embedding generation failed: {0}")]
    EmbeddingFailed(String),

    /// Vector store read or write failed
    #[error("Vector store error: {0}")]
    VectorStoreFailed(String),

    /// The configured embedding model does not match the one a collection was created with
    #[error("Embedding model mismatch: collection was built with '{stored}', configured model is '{configured}'")]
    EmbeddingModelMismatch { stored: String, configured: String },

    /// Model daemon did not respond
    #[error("LLM unreachable: {0}")]
    LlmUnreachable(String),

    /// Model daemon did not respond before the deadline
    #[error("LLM request timed out")]
    LlmTimeout,

    /// Invalid configuration detected at startup
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Outbound HTTP request error
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    /// Catch-all for conditions that should not occur
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    pub fn parse_failed(filename: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ParseFailed {
            filename: filename.into(),
            message: message.into(),
        }
    }

    pub fn embedding(message: impl Into<String>) -> Self {
        Self::EmbeddingFailed(message.into())
    }

    pub fn vector_store(message: impl Into<String>) -> Self {
        Self::VectorStoreFailed(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// True for the error kinds the orchestrator treats as a 5xx dependency
    /// failure and that trigger compensating cleanup during ingestion.
    pub fn is_dependency_failure(&self) -> bool {
        matches!(
            self,
            Error::EmbeddingFailed(_)
                | Error::VectorStoreFailed(_)
                | Error::LlmUnreachable(_)
                | Error::LlmTimeout
                | Error::Http(_)
        )
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match &self {
            Error::UnsupportedFormat(ext) => (
                StatusCode::BAD_REQUEST,
                "unsupported_format",
                format!("Unsupported file format: {}", ext),
            ),
            Error::TooLarge { size_mb, limit_mb } => (
                StatusCode::PAYLOAD_TOO_LARGE,
                "too_large",
                format!("File is {:.2}MB, limit is {}MB", size_mb, limit_mb),
            ),
            Error::QueryEmpty => (
                StatusCode::BAD_REQUEST,
                "query_empty",
                "Query must not be empty".to_string(),
            ),
            Error::AuthMissing => (
                StatusCode::UNAUTHORIZED,
                "auth_missing",
                "Missing X-Admin-Key header".to_string(),
            ),
            Error::AuthInvalid => (
                StatusCode::UNAUTHORIZED,
                "auth_invalid",
                "Invalid admin credential".to_string(),
            ),
            Error::ParseFailed { filename, message } => (
                StatusCode::BAD_REQUEST,
                "parse_failed",
                format!("Failed to parse '{}': {}", filename, message),
            ),
            Error::EmbeddingFailed(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "embedding_failed",
                msg.clone(),
            ),
            Error::VectorStoreFailed(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "vector_store_failed",
                msg.clone(),
            ),
            Error::EmbeddingModelMismatch { stored, configured } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "embedding_model_mismatch",
                format!(
                    "collection uses '{}', configuration requests '{}'",
                    stored, configured
                ),
            ),
            Error::LlmUnreachable(msg) => {
                (StatusCode::SERVICE_UNAVAILABLE, "llm_unreachable", msg.clone())
            }
            Error::LlmTimeout => (
                StatusCode::GATEWAY_TIMEOUT,
                "llm_timeout",
                "LLM request timed out".to_string(),
            ),
            Error::Config(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "config_error", msg.clone()),
            Error::Io(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "io_error",
                err.to_string(),
            ),
            Error::Json(err) => (StatusCode::BAD_REQUEST, "json_error", err.to_string()),
            Error::Http(err) => (StatusCode::BAD_GATEWAY, "http_error", err.to_string()),
            Error::Internal(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", msg.clone())
            }
        };

        let body = Json(json!({
            "error": {
                "type": error_type,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dependency_failures_are_flagged_for_compensation() {
        assert!(Error::embedding("down").is_dependency_failure());
        assert!(Error::vector_store("down").is_dependency_failure());
        assert!(Error::LlmTimeout.is_dependency_failure());
        assert!(!Error::QueryEmpty.is_dependency_failure());
        assert!(!Error::AuthMissing.is_dependency_failure());
    }

    #[test]
    fn status_codes_match_taxonomy() {
        assert_eq!(
            Error::AuthMissing.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            Error::QueryEmpty.into_response().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            Error::TooLarge { size_mb: 25.0, limit_mb: 20 }.into_response().status(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(
            Error::LlmTimeout.into_response().status(),
            StatusCode::GATEWAY_TIMEOUT
        );
    }
}
