//! Runtime abstractions for text encoders.

use thiserror::Error;

pub mod embedding;

pub use embedding::{
    BatchEmbeddingRequest, BatchEmbeddingResponse, EmbeddingProvider, EmbeddingRequest,
    EmbeddingResponse, HttpEmbeddingProvider, MockEmbeddingProvider, DEFAULT_EMBEDDING_DIMENSION,
};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProviderError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("http status {status}: {body}")]
    HttpStatus { status: u16, body: String },
    #[error("decode error: {0}")]
    Decode(String),
    #[error("gave up after {attempts} attempts: {last_error}")]
    RetryExhausted { attempts: u32, last_error: String },
    #[error("provider error: {0}")]
    Message(String),
}

impl ProviderError {
    /// Whether a later attempt may succeed
    pub fn is_retriable(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::HttpStatus { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::ProviderError;

    #[test]
    fn retriable_errors() {
        assert!(ProviderError::Transport("reset".to_string()).is_retriable());
        assert!(ProviderError::HttpStatus { status: 503, body: String::new() }.is_retriable());
        assert!(ProviderError::HttpStatus { status: 429, body: String::new() }.is_retriable());
        assert!(!ProviderError::HttpStatus { status: 400, body: String::new() }.is_retriable());
        assert!(!ProviderError::Decode("bad json".to_string()).is_retriable());
    }
}
