//! Vesper Vector Storage - document model, vector store abstraction and search
//!
//! This crate provides:
//! - `VectorStore` trait for abstracting vector storage backends
//! - In-memory vector store for testing
//! - Redis Stack integration (optional, feature-gated)
//! - KNN and range query construction and result formatting

pub mod error;
pub mod format;
pub mod query;
#[cfg(feature = "redis")]
pub mod redis_store;
pub mod schema;
pub mod store;
pub mod types;

pub use error::{VectorError, VectorResult};
pub use format::RawDocument;
pub use query::{CompiledQuery, KnnQuery, Page, RangeQuery, SearchQuery};
#[cfg(feature = "redis")]
pub use redis_store::{RedisConfig, RedisVectorStore};
pub use schema::{
    DistanceMetric, IndexAlgorithm, IndexDefinition, IndexField, IndexStatus, VectorFieldParams,
};
pub use store::{InMemoryVectorStore, VectorStore};
pub use types::{BatchResult, Document, SearchHit, SearchResults, SourceRecord, StoredDocument, Vector};

/// Prelude for common imports
pub mod prelude {
    pub use crate::error::{VectorError, VectorResult};
    pub use crate::query::{KnnQuery, RangeQuery, SearchQuery};
    pub use crate::schema::{DistanceMetric, IndexDefinition, IndexStatus, VectorFieldParams};
    pub use crate::store::VectorStore;
    pub use crate::types::{Document, SearchHit, SearchResults, Vector};
}
