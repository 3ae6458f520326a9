//! Resolved runtime settings

use serde::{Deserialize, Serialize};
use thiserror::Error;
use vesper_runtime::DEFAULT_EMBEDDING_DIMENSION;
use vesper_vector::query::MIN_VECTOR_DIALECT;
use vesper_vector::{DistanceMetric, IndexAlgorithm, IndexDefinition, VectorFieldParams};

/// Settings shared by the ingestion and query flows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Redis connection URL, credentials included
    pub redis_url: String,
    /// Prefix under which documents are written and indexed
    pub key_prefix: String,
    pub index_name: String,
    /// Vector dimension; must match the embedding model
    pub dimension: usize,
    pub metric: DistanceMetric,
    pub algorithm: IndexAlgorithm,
    /// Query dialect, at least 2 for vector syntax
    pub dialect: u32,
    /// Base URL of the sentence-embedding server
    pub embedding_url: String,
    pub embedding_model: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            redis_url: "redis://127.0.0.1:6379".to_string(),
            key_prefix: "product-docs:".to_string(),
            index_name: "productDocsIdx".to_string(),
            dimension: DEFAULT_EMBEDDING_DIMENSION,
            metric: DistanceMetric::Cosine,
            algorithm: IndexAlgorithm::Hnsw,
            dialect: MIN_VECTOR_DIALECT,
            embedding_url: "http://127.0.0.1:8081".to_string(),
            embedding_model: "all-MiniLM-L6-v2".to_string(),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} cannot be empty")]
    Empty(&'static str),
    #[error("dimension must be positive")]
    ZeroDimension,
    #[error("dialect {0} does not support vector queries (need 2 or later)")]
    DialectTooLow(u32),
}

impl Settings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("redis url", &self.redis_url),
            ("key prefix", &self.key_prefix),
            ("index name", &self.index_name),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::Empty(name));
            }
        }
        if self.dimension == 0 {
            return Err(ConfigError::ZeroDimension);
        }
        if self.dialect < MIN_VECTOR_DIALECT {
            return Err(ConfigError::DialectTooLow(self.dialect));
        }
        Ok(())
    }

    pub fn vector_params(&self) -> VectorFieldParams {
        VectorFieldParams::new(self.dimension, self.metric).with_algorithm(self.algorithm)
    }

    /// Index over the title text and title embedding of every document
    /// under the key prefix
    pub fn index_definition(&self) -> IndexDefinition {
        IndexDefinition::for_documents(&self.index_name, &self.key_prefix, self.vector_params())
    }
}
