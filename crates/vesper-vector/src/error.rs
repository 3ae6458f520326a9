//! Error types for vector storage

use thiserror::Error;

/// Vector storage error type
#[derive(Error, Debug)]
pub enum VectorError {
    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("{backend} rejected the request: {message}")]
    Backend {
        backend: &'static str,
        message: String,
    },

    #[error("Document not found: {0}")]
    NotFound(String),

    #[error("Index not found: {0}")]
    IndexNotFound(String),

    #[error("Invalid vector dimension: expected {expected}, got {actual}")]
    InvalidDimension { expected: usize, actual: usize },

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Malformed reply: {0}")]
    MalformedReply(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl VectorError {
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection(message.into())
    }

    pub fn backend(backend: &'static str, message: impl Into<String>) -> Self {
        Self::Backend {
            backend,
            message: message.into(),
        }
    }

    pub fn not_found(id: impl Into<String>) -> Self {
        Self::NotFound(id.into())
    }

    pub fn index_not_found(name: impl Into<String>) -> Self {
        Self::IndexNotFound(name.into())
    }

    pub fn invalid_dimension(expected: usize, actual: usize) -> Self {
        Self::InvalidDimension { expected, actual }
    }

    pub fn invalid_query(message: impl Into<String>) -> Self {
        Self::InvalidQuery(message.into())
    }

    pub fn malformed_reply(message: impl Into<String>) -> Self {
        Self::MalformedReply(message.into())
    }

    /// Stable reason code, suitable for logs and exit statuses
    pub fn reason(&self) -> &'static str {
        match self {
            Self::Connection(_) => "connection",
            Self::Backend { .. } => "backend",
            Self::NotFound(_) => "not_found",
            Self::IndexNotFound(_) => "index_not_found",
            Self::InvalidDimension { .. } => "invalid_dimension",
            Self::InvalidQuery(_) => "invalid_query",
            Self::MalformedReply(_) => "malformed_reply",
            Self::SerializationError(_) => "serialization",
        }
    }
}

/// Result type for vector operations
pub type VectorResult<T> = Result<T, VectorError>;
