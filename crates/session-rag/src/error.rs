//! Error types for the answering pipeline

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, Error>;

/// Pipeline errors
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid chunking, weighting or threshold settings
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Embedding length differs from the index dimensionality
    #[error("Dimension mismatch: index expects {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Caller supplied a bad argument (top_k, threshold, empty question)
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Embedding provider could not produce a vector
    #[error("Embedding unavailable: {0}")]
    EmbeddingUnavailable(String),

    /// A collaborator call exceeded its deadline
    #[error("Timed out during {stage}")]
    Timeout { stage: String },

    /// Collaborator rejected the call because of quota
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// Collaborator answered with something unusable
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// Extractor does not handle this content type
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Extractor failed on a supported format
    #[error("Failed to extract text from '{filename}': {message}")]
    ExtractionFailed { filename: String, message: String },

    /// Document not found
    #[error("Document not found: {0}")]
    DocumentNotFound(Uuid),

    /// Ingestion failure with the stage and chunk it happened at
    #[error("Ingestion of document {document_id} failed at {stage}{}: {source}", chunk_suffix(.chunk_index))]
    Ingestion {
        document_id: Uuid,
        chunk_index: Option<u32>,
        stage: IngestStage,
        #[source]
        source: Box<Error>,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML configuration parse error
    #[error("Config parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// HTTP request error
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Ingestion stage, reported with failures so callers can retry
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IngestStage {
    Chunking,
    Embedding,
    Indexing,
}

impl std::fmt::Display for IngestStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Chunking => "chunking",
            Self::Embedding => "embedding",
            Self::Indexing => "indexing",
        };
        f.write_str(name)
    }
}

fn chunk_suffix(chunk_index: &Option<u32>) -> String {
    chunk_index
        .map(|i| format!(" (chunk {i})"))
        .unwrap_or_default()
}

impl Error {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Create an invalid argument error
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    /// Create an embedding error
    pub fn embedding(message: impl Into<String>) -> Self {
        Self::EmbeddingUnavailable(message.into())
    }

    /// Create a timeout error for a stage
    pub fn timeout(stage: impl Into<String>) -> Self {
        Self::Timeout {
            stage: stage.into(),
        }
    }

    /// Create an extraction error
    pub fn extraction(filename: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ExtractionFailed {
            filename: filename.into(),
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Wrap with ingestion context
    pub fn during_ingest(self, document_id: Uuid, stage: IngestStage, chunk_index: Option<u32>) -> Self {
        Self::Ingestion {
            document_id,
            chunk_index,
            stage,
            source: Box::new(self),
        }
    }

    /// Collaborator failures that are worth another attempt
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::EmbeddingUnavailable(_)
            | Self::Timeout { .. }
            | Self::RateLimited(_)
            | Self::Http(_) => true,
            Self::Ingestion { source, .. } => source.is_retryable(),
            _ => false,
        }
    }

    /// Innermost error, skipping ingestion context
    pub fn root(&self) -> &Error {
        match self {
            Self::Ingestion { source, .. } => source.root(),
            other => other,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, error_type) = match self.root() {
            Error::Configuration(_) => (StatusCode::INTERNAL_SERVER_ERROR, "configuration_error"),
            Error::DimensionMismatch { .. } => (StatusCode::UNPROCESSABLE_ENTITY, "dimension_mismatch"),
            Error::InvalidArgument(_) => (StatusCode::BAD_REQUEST, "invalid_argument"),
            Error::EmbeddingUnavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, "embedding_unavailable"),
            Error::Timeout { .. } => (StatusCode::GATEWAY_TIMEOUT, "timeout"),
            Error::RateLimited(_) => (StatusCode::TOO_MANY_REQUESTS, "rate_limited"),
            Error::MalformedResponse(_) => (StatusCode::BAD_GATEWAY, "malformed_response"),
            Error::UnsupportedFormat(_) => (StatusCode::UNSUPPORTED_MEDIA_TYPE, "unsupported_format"),
            Error::ExtractionFailed { .. } => (StatusCode::UNPROCESSABLE_ENTITY, "extraction_failed"),
            Error::DocumentNotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            Error::Json(_) | Error::Toml(_) => (StatusCode::BAD_REQUEST, "parse_error"),
            Error::Http(_) => (StatusCode::BAD_GATEWAY, "http_error"),
            Error::Io(_) | Error::Internal(_) | Error::Ingestion { .. } => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error")
            }
        };

        let body = Json(json!({
            "error": {
                "type": error_type,
                "message": self.to_string(),
            }
        }));

        (status, body).into_response()
    }
}
