//! Indexing service implementation

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn};
use vesper_runtime::{EmbeddingProvider, EmbeddingRequest, ProviderError};
use vesper_vector::prelude::*;
use vesper_vector::{BatchResult, SourceRecord};

use super::source::SourceBatch;

/// Ingestion service writing documents into vector storage
#[async_trait]
pub trait IndexingService: Send + Sync {
    /// Validate and persist one document. Returns the store key.
    async fn index_document(&self, document: Document) -> IndexingResult<String>;

    /// Write records one at a time. A failing record is logged and recorded
    /// in the batch result; the remaining records are still written.
    async fn index_batch(&self, records: Vec<SourceRecord>) -> BatchResult;

    /// Write the decoded records of a source. Records the source could not
    /// decode are reported as failures next to the write failures.
    async fn index_source(&self, source: SourceBatch) -> BatchResult {
        let mut result = self.index_batch(source.records).await;
        for rejected in source.rejected {
            result.add_failure(rejected.id, rejected.reason);
        }
        result
    }

    /// Encode `title` and persist it under `id`
    async fn index_text(&self, id: &str, title: &str) -> IndexingResult<String>;
}

/// Document indexer configuration
#[derive(Debug, Clone)]
pub struct IndexerConfig {
    /// Vector dimension every written document must have
    pub dimension: usize,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            dimension: vesper_runtime::DEFAULT_EMBEDDING_DIMENSION,
        }
    }
}

/// Indexer that normalizes records and writes them to a vector store
pub struct DocumentIndexer {
    vector_store: Arc<dyn VectorStore>,
    embedding_provider: Option<Arc<dyn EmbeddingProvider>>,
    config: IndexerConfig,
}

impl DocumentIndexer {
    /// Create a new document indexer
    pub fn new(vector_store: Arc<dyn VectorStore>, config: IndexerConfig) -> Self {
        Self {
            vector_store,
            embedding_provider: None,
            config,
        }
    }

    /// Create with default configuration
    pub fn with_defaults(vector_store: Arc<dyn VectorStore>) -> Self {
        Self::new(vector_store, IndexerConfig::default())
    }

    /// Attach an encoder, enabling [`IndexingService::index_text`]
    pub fn with_embedder(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedding_provider = Some(provider);
        self
    }

    /// Map a source record onto the stored document shape
    pub fn normalize(&self, record: SourceRecord) -> IndexingResult<Document> {
        if record.doc_id.trim().is_empty() {
            return Err(IndexingError::InvalidDocument("document id cannot be empty".to_string()));
        }
        let document = Document::from(record);
        document.vector.validate(self.config.dimension)?;
        Ok(document)
    }
}

#[async_trait]
impl IndexingService for DocumentIndexer {
    async fn index_document(&self, document: Document) -> IndexingResult<String> {
        if document.id.trim().is_empty() {
            return Err(IndexingError::InvalidDocument("document id cannot be empty".to_string()));
        }
        document.vector.validate(self.config.dimension)?;

        let key = self.vector_store.write(&document).await?;
        info!(key = %key, "Document added");
        Ok(key)
    }

    async fn index_batch(&self, records: Vec<SourceRecord>) -> BatchResult {
        let mut result = BatchResult::new();

        for record in records {
            let id = record.doc_id.clone();
            let outcome = match self.normalize(record) {
                Ok(document) => self.index_document(document).await,
                Err(e) => Err(e),
            };

            match outcome {
                Ok(_) => result.add_success(id),
                Err(e) => {
                    warn!(id = %id, error = %e, "Failed to add document");
                    result.add_failure(id, e.to_string());
                }
            }
        }

        debug!(
            succeeded = result.succeeded.len(),
            failed = result.failed.len(),
            "Batch ingestion finished"
        );
        result
    }

    async fn index_text(&self, id: &str, title: &str) -> IndexingResult<String> {
        let provider = self
            .embedding_provider
            .as_ref()
            .ok_or(IndexingError::EncoderMissing)?;

        let response = provider.embed(EmbeddingRequest::new(title)).await?;
        let document = Document::new(id, title, Vector::new(response.embedding));
        self.index_document(document).await
    }
}

// Error types

/// Indexing error type
#[derive(Debug, thiserror::Error)]
pub enum IndexingError {
    #[error("Embedding generation failed: {0}")]
    EmbeddingError(#[from] ProviderError),

    #[error("Vector storage error: {0}")]
    StorageError(#[from] VectorError),

    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    #[error("No encoder configured")]
    EncoderMissing,
}

/// Indexing result type
pub type IndexingResult<T> = Result<T, IndexingError>;
