//! Vector store trait and implementations

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::{VectorError, VectorResult};
use crate::format::{format_hits, RawDocument, JSON_ROOT_FIELD};
use crate::query::{SearchQuery, SCORE_ALIAS};
use crate::schema::{FieldKind, IndexDefinition, IndexStatus};
use crate::types::{document_key, Document, SearchResults, StoredDocument, Vector};

/// Vector store abstraction
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Prefix prepended to document ids to form store keys
    fn key_prefix(&self) -> &str;

    /// Persist a document at `prefix + id`, replacing any previous value.
    /// Returns the key written.
    async fn write(&self, document: &Document) -> VectorResult<String>;

    /// Get a document by ID
    async fn get(&self, id: &str) -> VectorResult<Document>;

    /// Delete a document
    async fn delete(&self, id: &str) -> VectorResult<()>;

    /// Names of all existing indexes
    async fn list_indexes(&self) -> VectorResult<Vec<String>>;

    /// Create an index. Fails if one with the same name exists.
    async fn create_index(&self, definition: &IndexDefinition) -> VectorResult<()>;

    /// Drop an index, keeping the documents it covered
    async fn drop_index(&self, name: &str) -> VectorResult<()>;

    /// Create the index unless one with the same name already exists
    async fn ensure_index(&self, definition: &IndexDefinition) -> VectorResult<IndexStatus> {
        definition.validate()?;

        let indexes = self.list_indexes().await?;
        if indexes.iter().any(|name| *name == definition.name) {
            return Ok(IndexStatus::AlreadyExists);
        }

        debug!(
            index = %definition.name,
            prefix = %definition.key_prefix,
            backend = self.backend_name(),
            "Creating index"
        );
        self.create_index(definition).await?;
        Ok(IndexStatus::Created)
    }

    /// Run a KNN or range query against `index`
    async fn search(&self, index: &str, query: &SearchQuery) -> VectorResult<SearchResults>;

    /// Backend identifier for logs
    fn backend_name(&self) -> &'static str;
}

/// In-memory vector store for testing
pub struct InMemoryVectorStore {
    key_prefix: String,
    documents: Arc<RwLock<BTreeMap<String, StoredDocument>>>,
    indexes: Arc<RwLock<HashMap<String, IndexDefinition>>>,
    offline: AtomicBool,
}

impl InMemoryVectorStore {
    /// Create a new in-memory store writing under `key_prefix`
    pub fn new(key_prefix: impl Into<String>) -> Self {
        Self {
            key_prefix: key_prefix.into(),
            documents: Arc::new(RwLock::new(BTreeMap::new())),
            indexes: Arc::new(RwLock::new(HashMap::new())),
            offline: AtomicBool::new(false),
        }
    }

    /// Simulate the store becoming unreachable
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Number of stored documents
    pub async fn len(&self) -> usize {
        self.documents.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.documents.read().await.is_empty()
    }

    /// Definition of an existing index
    pub async fn index_definition(&self, name: &str) -> Option<IndexDefinition> {
        self.indexes.read().await.get(name).cloned()
    }

    fn check_online(&self) -> VectorResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            Err(VectorError::connection("in-memory store is offline"))
        } else {
            Ok(())
        }
    }

    // Indexes covering `key` must agree on the vector dimension.
    async fn check_covering_indexes(&self, key: &str, document: &Document) -> VectorResult<()> {
        let indexes = self.indexes.read().await;
        for definition in indexes.values().filter(|d| key.starts_with(&d.key_prefix)) {
            for field in &definition.fields {
                if let FieldKind::Vector(params) = &field.kind {
                    if params.dimension != document.vector.data.len() {
                        return Err(VectorError::invalid_dimension(
                            params.dimension,
                            document.vector.data.len(),
                        ));
                    }
                }
            }
        }
        Ok(())
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    fn key_prefix(&self) -> &str {
        &self.key_prefix
    }

    async fn write(&self, document: &Document) -> VectorResult<String> {
        self.check_online()?;
        let key = document.key(&self.key_prefix);
        self.check_covering_indexes(&key, document).await?;

        self.documents
            .write()
            .await
            .insert(key.clone(), document.to_stored());
        Ok(key)
    }

    async fn get(&self, id: &str) -> VectorResult<Document> {
        self.check_online()?;
        let key = document_key(&self.key_prefix, id);
        self.documents
            .read()
            .await
            .get(&key)
            .cloned()
            .map(|stored| Document::from_stored(id, stored))
            .ok_or_else(|| VectorError::not_found(key))
    }

    async fn delete(&self, id: &str) -> VectorResult<()> {
        self.check_online()?;
        let key = document_key(&self.key_prefix, id);
        self.documents
            .write()
            .await
            .remove(&key)
            .map(|_| ())
            .ok_or_else(|| VectorError::not_found(key))
    }

    async fn list_indexes(&self) -> VectorResult<Vec<String>> {
        self.check_online()?;
        let mut names: Vec<String> = self.indexes.read().await.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    async fn create_index(&self, definition: &IndexDefinition) -> VectorResult<()> {
        self.check_online()?;
        definition.validate()?;

        let mut indexes = self.indexes.write().await;
        if indexes.contains_key(&definition.name) {
            return Err(VectorError::backend("memory", "Index already exists"));
        }
        indexes.insert(definition.name.clone(), definition.clone());
        Ok(())
    }

    async fn drop_index(&self, name: &str) -> VectorResult<()> {
        self.check_online()?;
        self.indexes
            .write()
            .await
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| VectorError::index_not_found(name))
    }

    async fn search(&self, index: &str, query: &SearchQuery) -> VectorResult<SearchResults> {
        self.check_online()?;
        query.validate()?;

        let definition = self
            .index_definition(index)
            .await
            .ok_or_else(|| VectorError::index_not_found(index))?;
        let params = *definition.vector_field(query.vector_field()).ok_or_else(|| {
            VectorError::invalid_query(format!(
                "index {index} has no vector field {}",
                query.vector_field()
            ))
        })?;
        if query.vector().data.len() != params.dimension {
            return Err(VectorError::invalid_dimension(
                params.dimension,
                query.vector().data.len(),
            ));
        }

        let docs = self.documents.read().await;
        let mut scored: Vec<(f32, &String, &StoredDocument)> = docs
            .iter()
            .filter(|(key, doc)| {
                key.starts_with(&definition.key_prefix) && doc.title_vector.len() == params.dimension
            })
            .map(|(key, doc)| {
                let stored = Vector::new(doc.title_vector.clone());
                (query.vector().distance(&stored, params.metric), key, doc)
            })
            .collect();

        scored.sort_by(|a, b| a.0.total_cmp(&b.0).then_with(|| a.1.cmp(b.1)));

        match query {
            SearchQuery::Knn(q) => scored.truncate(q.k),
            SearchQuery::Range(q) => scored.retain(|(score, _, _)| *score <= q.radius),
        }

        let total = scored.len();
        let page = query.page();
        let raw: Vec<RawDocument> = scored
            .into_iter()
            .skip(page.offset)
            .take(page.limit)
            .map(|(score, key, doc)| -> VectorResult<RawDocument> {
                Ok(RawDocument::new(key.clone())
                    .with_field(SCORE_ALIAS, score.to_string())
                    .with_field(JSON_ROOT_FIELD, serde_json::to_string(doc)?))
            })
            .collect::<VectorResult<_>>()?;

        Ok(SearchResults::new(total, format_hits(&raw)))
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
