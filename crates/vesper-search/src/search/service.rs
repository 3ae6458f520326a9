//! Search service implementation

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;
use vesper_runtime::{EmbeddingProvider, EmbeddingRequest, ProviderError};
use vesper_vector::prelude::*;
use vesper_vector::schema::VECTOR_FIELD;

/// Query shape
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SearchMode {
    /// The `k` closest documents
    Knn { k: usize },
    /// Every document within `radius` of the query
    Range { radius: f32 },
}

/// Search request parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchRequest {
    /// Search query text
    pub query: String,
    pub mode: SearchMode,
    /// Results skipped before the page starts
    pub offset: usize,
    /// Page size
    pub limit: usize,
}

impl SearchRequest {
    /// Nearest-neighbour request on the first page of ten
    pub fn knn(query: impl Into<String>, k: usize) -> Self {
        Self {
            query: query.into(),
            mode: SearchMode::Knn { k },
            offset: 0,
            limit: 10,
        }
    }

    /// Range request on the first page of ten
    pub fn range(query: impl Into<String>, radius: f32) -> Self {
        Self {
            query: query.into(),
            mode: SearchMode::Range { radius },
            offset: 0,
            limit: 10,
        }
    }

    pub fn with_page(mut self, offset: usize, limit: usize) -> Self {
        self.offset = offset;
        self.limit = limit;
        self
    }
}

/// Search response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    /// Original query
    pub query: String,
    pub mode: SearchMode,
    /// Matches reported by the store before pagination
    pub total: usize,
    /// Ascending by score
    pub hits: Vec<SearchHit>,
}

/// Search service trait
#[async_trait]
pub trait SearchService: Send + Sync {
    /// Encode the query text and run the requested search
    async fn search(&self, request: SearchRequest) -> Result<SearchResponse, SearchError>;

    /// KNN search on the first page of ten
    async fn knn(&self, query: &str, k: usize) -> Result<SearchResponse, SearchError> {
        self.search(SearchRequest::knn(query, k)).await
    }

    /// Range search on the first page of ten
    async fn range(&self, query: &str, radius: f32) -> Result<SearchResponse, SearchError> {
        self.search(SearchRequest::range(query, radius)).await
    }
}

/// Search error type
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Embedding generation failed: {0}")]
    EmbeddingError(#[from] ProviderError),

    #[error("Query vector has dimension {actual}, index expects {expected}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Vector search failed: {0}")]
    VectorError(#[from] VectorError),
}

impl SearchError {
    /// Stable reason code
    pub fn reason(&self) -> &'static str {
        match self {
            Self::InvalidQuery(_) => "invalid_query",
            Self::EmbeddingError(_) => "embedding",
            Self::DimensionMismatch { .. } => "invalid_dimension",
            Self::VectorError(e) => e.reason(),
        }
    }
}

/// Semantic search service implementation
pub struct SemanticSearchService {
    vector_store: Arc<dyn VectorStore>,
    embedding_provider: Arc<dyn EmbeddingProvider>,
    index_name: String,
    dimension: usize,
    vector_field: String,
}

impl SemanticSearchService {
    /// Create a service querying `index_name`, whose vectors have `dimension`
    pub fn new(
        vector_store: Arc<dyn VectorStore>,
        embedding_provider: Arc<dyn EmbeddingProvider>,
        index_name: impl Into<String>,
        dimension: usize,
    ) -> Self {
        Self {
            vector_store,
            embedding_provider,
            index_name: index_name.into(),
            dimension,
            vector_field: VECTOR_FIELD.to_string(),
        }
    }

    /// Query a vector field other than the title embedding
    pub fn with_vector_field(mut self, field: impl Into<String>) -> Self {
        self.vector_field = field.into();
        self
    }

    pub fn index_name(&self) -> &str {
        &self.index_name
    }

    async fn generate_embedding(&self, text: &str) -> Result<Vector, SearchError> {
        let response = self.embedding_provider.embed(EmbeddingRequest::new(text)).await?;
        Ok(Vector::new(response.embedding))
    }

    /// Run a search with an already encoded query vector
    pub async fn search_vector(
        &self,
        vector: Vector,
        mode: SearchMode,
        offset: usize,
        limit: usize,
    ) -> Result<SearchResults, SearchError> {
        if vector.data.len() != self.dimension {
            return Err(SearchError::DimensionMismatch {
                expected: self.dimension,
                actual: vector.data.len(),
            });
        }

        let query = match mode {
            SearchMode::Knn { k } => SearchQuery::Knn(
                KnnQuery::new(vector, k)
                    .with_field(&self.vector_field)
                    .with_page(offset, limit),
            ),
            SearchMode::Range { radius } => SearchQuery::Range(
                RangeQuery::new(vector, radius)
                    .with_field(&self.vector_field)
                    .with_page(offset, limit),
            ),
        };
        query.validate()?;

        Ok(self.vector_store.search(&self.index_name, &query).await?)
    }
}

#[async_trait]
impl SearchService for SemanticSearchService {
    async fn search(&self, request: SearchRequest) -> Result<SearchResponse, SearchError> {
        debug!(query = %request.query, mode = ?request.mode, "Searching");

        if request.query.trim().is_empty() {
            return Err(SearchError::InvalidQuery("Query cannot be empty".to_string()));
        }

        let vector = self.generate_embedding(&request.query).await?;
        let results = self
            .search_vector(vector, request.mode, request.offset, request.limit)
            .await?;

        debug!(total = results.total, returned = results.hits.len(), "Search finished");
        Ok(SearchResponse {
            query: request.query,
            mode: request.mode,
            total: results.total,
            hits: results.hits,
        })
    }
}
