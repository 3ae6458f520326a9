//! Idempotent index provisioning

use std::sync::Arc;

use tracing::{info, warn};
use vesper_vector::prelude::*;

use crate::config::Settings;

/// Makes sure the document index exists before queries run
pub struct IndexProvisioner {
    vector_store: Arc<dyn VectorStore>,
    definition: IndexDefinition,
}

impl IndexProvisioner {
    pub fn new(vector_store: Arc<dyn VectorStore>, definition: IndexDefinition) -> Self {
        Self {
            vector_store,
            definition,
        }
    }

    pub fn from_settings(vector_store: Arc<dyn VectorStore>, settings: &Settings) -> Self {
        Self::new(vector_store, settings.index_definition())
    }

    pub fn definition(&self) -> &IndexDefinition {
        &self.definition
    }

    /// Create the index if it is missing. Safe to call on every start.
    pub async fn ensure(&self) -> VectorResult<IndexStatus> {
        match self.vector_store.ensure_index(&self.definition).await {
            Ok(IndexStatus::Created) => {
                info!(index = %self.definition.name, "Index created");
                Ok(IndexStatus::Created)
            }
            Ok(IndexStatus::AlreadyExists) => {
                info!(index = %self.definition.name, "Index already exists");
                Ok(IndexStatus::AlreadyExists)
            }
            Err(e) => {
                warn!(index = %self.definition.name, error = %e, "Error creating index");
                Err(e)
            }
        }
    }

    /// Drop the index; stored documents are kept
    pub async fn drop_index(&self) -> VectorResult<()> {
        self.vector_store.drop_index(&self.definition.name).await
    }
}
