//! Embedding provider trait and implementations
//!
//! This module turns text into the fixed-length vectors that documents are
//! indexed and queried with. Ingested vectors and query vectors must come
//! from the same model, or similarity scores are meaningless.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::ProviderError;

pub mod http;

pub use http::HttpEmbeddingProvider;

/// Dimension of `all-MiniLM-L6-v2` sentence embeddings
pub const DEFAULT_EMBEDDING_DIMENSION: usize = 384;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingRequest {
    pub text: String,
    pub model: Option<String>,
}

impl EmbeddingRequest {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            model: None,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingResponse {
    pub embedding: Vec<f32>,
    pub model: String,
    pub dimension: usize,
}

impl EmbeddingResponse {
    pub fn new(embedding: Vec<f32>, model: impl Into<String>) -> Self {
        let dimension = embedding.len();
        Self {
            embedding,
            model: model.into(),
            dimension,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchEmbeddingRequest {
    pub texts: Vec<String>,
    pub model: Option<String>,
}

impl BatchEmbeddingRequest {
    pub fn new(texts: Vec<String>) -> Self {
        Self { texts, model: None }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchEmbeddingResponse {
    pub embeddings: Vec<Vec<f32>>,
    pub model: String,
    pub dimension: usize,
}

#[async_trait]
pub trait EmbeddingProvider: Send + Sync + std::fmt::Debug {
    fn name(&self) -> &'static str;

    /// Length of every vector this provider produces
    fn dimension(&self) -> usize;

    async fn embed(&self, req: EmbeddingRequest) -> Result<EmbeddingResponse, ProviderError>;

    async fn embed_batch(&self, req: BatchEmbeddingRequest) -> Result<BatchEmbeddingResponse, ProviderError>;
}

/// Deterministic encoder for tests: the same text always maps to the same
/// unit-length vector. Fixed vectors can be registered per text, and one-off
/// responses queued ahead of everything else.
#[derive(Debug, Default)]
pub struct MockEmbeddingProvider {
    dimension: usize,
    fixed: Mutex<HashMap<String, Vec<f32>>>,
    queue: Mutex<VecDeque<Result<EmbeddingResponse, ProviderError>>>,
}

const MOCK_MODEL: &str = "mock-embedding-model";

impl MockEmbeddingProvider {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            fixed: Mutex::new(HashMap::new()),
            queue: Mutex::new(VecDeque::new()),
        }
    }

    /// Always answer `text` with `embedding`
    pub fn register(&self, text: impl Into<String>, embedding: Vec<f32>) {
        self.fixed
            .lock()
            .expect("mock embedding map poisoned")
            .insert(text.into(), embedding);
    }

    /// Answer the next `embed` call with `result`
    pub fn enqueue(&self, result: Result<EmbeddingResponse, ProviderError>) {
        self.queue
            .lock()
            .expect("mock embedding queue poisoned")
            .push_back(result);
    }

    fn embedding_for(&self, text: &str) -> Vec<f32> {
        if let Some(fixed) = self.fixed.lock().expect("mock embedding map poisoned").get(text) {
            return fixed.clone();
        }
        seeded_unit_vector(text, self.dimension)
    }
}

/// FNV-1a, stable across platforms and releases
fn text_seed(text: &str) -> u64 {
    text.bytes().fold(0xcbf2_9ce4_8422_2325, |hash, byte| {
        (hash ^ u64::from(byte)).wrapping_mul(0x0100_0000_01b3)
    })
}

fn seeded_unit_vector(text: &str, dimension: usize) -> Vec<f32> {
    let mut rng = StdRng::seed_from_u64(text_seed(text));
    let mut vector: Vec<f32> = (0..dimension).map(|_| rng.gen_range(-1.0..1.0)).collect();
    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        vector.iter_mut().for_each(|v| *v /= norm);
    }
    vector
}

#[async_trait]
impl EmbeddingProvider for MockEmbeddingProvider {
    fn name(&self) -> &'static str {
        "mock-embedding"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed(&self, req: EmbeddingRequest) -> Result<EmbeddingResponse, ProviderError> {
        let queued = self
            .queue
            .lock()
            .expect("mock embedding queue poisoned")
            .pop_front();
        if let Some(result) = queued {
            return result;
        }
        Ok(EmbeddingResponse::new(self.embedding_for(&req.text), MOCK_MODEL))
    }

    async fn embed_batch(&self, req: BatchEmbeddingRequest) -> Result<BatchEmbeddingResponse, ProviderError> {
        let embeddings = req.texts.iter().map(|text| self.embedding_for(text)).collect();
        Ok(BatchEmbeddingResponse {
            embeddings,
            model: MOCK_MODEL.to_string(),
            dimension: self.dimension,
        })
    }
}
