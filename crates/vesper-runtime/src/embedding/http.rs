//! HTTP sentence-embedding provider
//!
//! Talks to a Text Embeddings Inference compatible server hosting a
//! sentence-transformers model (`POST /embed`).

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, warn};

use crate::embedding::{
    BatchEmbeddingRequest, BatchEmbeddingResponse, EmbeddingProvider, EmbeddingRequest,
    EmbeddingResponse,
};
use crate::ProviderError;

#[derive(Debug)]
pub struct HttpEmbeddingProvider {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    default_model: String,
    dimension: usize,
    max_retries: u32,
    retry_base_delay: Duration,
}

impl HttpEmbeddingProvider {
    pub fn new(
        base_url: impl Into<String>,
        default_model: impl Into<String>,
        dimension: usize,
    ) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into(),
            api_key: None,
            default_model: default_model.into(),
            dimension,
            max_retries: 3,
            retry_base_delay: Duration::from_millis(200),
        })
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_retry_policy(mut self, max_retries: u32, retry_base_delay: Duration) -> Self {
        self.max_retries = max_retries;
        self.retry_base_delay = retry_base_delay;
        self
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    fn get_model(&self, req_model: Option<&String>) -> String {
        req_model
            .cloned()
            .unwrap_or_else(|| self.default_model.clone())
    }

    async fn embed_with_retry(&self, inputs: Vec<String>) -> Result<Vec<Vec<f32>>, ProviderError> {
        let body = EmbedRequestBody {
            inputs,
            normalize: true,
            truncate: true,
        };

        let mut last_error = None;
        for attempt in 0..=self.max_retries {
            match self.try_embed(&body).await {
                Ok(embeddings) => return Ok(embeddings),
                Err(err) if err.is_retriable() && attempt < self.max_retries => {
                    warn!(attempt, error = %err, "Embedding request failed, retrying");
                    last_error = Some(err.to_string());
                    tokio::time::sleep(backoff(self.retry_base_delay, attempt)).await;
                }
                Err(err) if err.is_retriable() => {
                    return Err(ProviderError::RetryExhausted {
                        attempts: attempt + 1,
                        last_error: err.to_string(),
                    });
                }
                Err(err) => return Err(err),
            }
        }

        Err(ProviderError::RetryExhausted {
            attempts: self.max_retries + 1,
            last_error: last_error.unwrap_or_else(|| "unknown retry error".to_string()),
        })
    }

    async fn try_embed(&self, body: &EmbedRequestBody) -> Result<Vec<Vec<f32>>, ProviderError> {
        let mut request = self.client.post(self.endpoint("/embed")).json(body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unable to read body>".to_string());
            return Err(ProviderError::HttpStatus {
                status: status.as_u16(),
                body,
            });
        }

        let embeddings: Vec<Vec<f32>> = response
            .json()
            .await
            .map_err(|e| ProviderError::Decode(e.to_string()))?;

        if embeddings.len() != body.inputs.len() {
            return Err(ProviderError::Decode(format!(
                "expected {} embeddings, got {}",
                body.inputs.len(),
                embeddings.len()
            )));
        }
        Ok(embeddings)
    }
}

#[derive(Debug, Serialize)]
struct EmbedRequestBody {
    inputs: Vec<String>,
    normalize: bool,
    truncate: bool,
}

fn backoff(base: Duration, attempt: u32) -> Duration {
    base.saturating_mul(1_u32 << attempt.min(16))
}

#[async_trait]
impl EmbeddingProvider for HttpEmbeddingProvider {
    fn name(&self) -> &'static str {
        "http-embedding"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed(&self, req: EmbeddingRequest) -> Result<EmbeddingResponse, ProviderError> {
        if req.text.trim().is_empty() {
            return Err(ProviderError::InvalidInput("text cannot be empty".to_string()));
        }
        let model = self.get_model(req.model.as_ref());

        let embedding = self
            .embed_with_retry(vec![req.text])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::Decode("No embedding data in response".to_string()))?;

        debug!(model = %model, dimension = embedding.len(), "Text embedded");
        Ok(EmbeddingResponse::new(embedding, model))
    }

    async fn embed_batch(&self, req: BatchEmbeddingRequest) -> Result<BatchEmbeddingResponse, ProviderError> {
        let model = self.get_model(req.model.as_ref());
        if req.texts.is_empty() {
            return Ok(BatchEmbeddingResponse {
                embeddings: Vec::new(),
                model,
                dimension: self.dimension,
            });
        }

        let embeddings = self.embed_with_retry(req.texts).await?;
        let dimension = embeddings.first().map_or(self.dimension, Vec::len);
        Ok(BatchEmbeddingResponse {
            embeddings,
            model,
            dimension,
        })
    }
}
