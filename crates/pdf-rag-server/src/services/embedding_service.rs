use anyhow::{Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::EmbeddingConfig;
use crate::utils::error::ApiError;
use crate::utils::limiters::Limiters;

/// Batched text → vector provider. Length- and order-preserving; the
/// engine never transforms inputs, so a given (model, text) pair embeds
/// identically across calls.
#[async_trait::async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ApiError>;
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, ApiError>;
    fn dimension(&self) -> usize;
    fn model_name(&self) -> &str;
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    input: &'a [String],
    model: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

/// OpenAI-style `/v1/embeddings` client with sub-batching and bounded
/// exponential backoff.
pub struct EmbeddingService {
    client: Client,
    base_url: String,
    model: String,
    dimension: usize,
    api_key: Option<String>,
    batch_size: usize,
    max_retries: usize,
    limiters: Arc<Limiters>,
}

impl EmbeddingService {
    pub fn new(config: EmbeddingConfig, limiters: Arc<Limiters>) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(config.timeout_seconds))
                .build()
                .unwrap_or_else(|_| Client::new()),
            base_url: config.base_url,
            model: config.model,
            dimension: config.dimension,
            api_key: config.api_key,
            batch_size: config.batch_size.max(1),
            max_retries: config.max_retries.max(1),
            limiters,
        }
    }

    /// One provider round trip for a sub-batch already within the size cap.
    async fn call_provider(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let url = format!("{}/v1/embeddings", self.base_url);
        let request = EmbeddingRequest {
            input: texts,
            model: &self.model,
        };

        let mut builder = self.client.post(&url);
        if let Some(key) = &self.api_key {
            builder = builder.header("Authorization", format!("Bearer {}", key));
        }

        let response = builder
            .json(&request)
            .send()
            .await
            .context("Failed to reach embedding server")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Embedding API error ({}): {}", status, body);
        }

        let body: EmbeddingResponse = response
            .json()
            .await
            .context("Failed to parse embedding response (expected OpenAI format)")?;

        if body.data.len() != texts.len() {
            anyhow::bail!(
                "Embedding count mismatch: sent {}, got {}",
                texts.len(),
                body.data.len()
            );
        }

        let mut data = body.data;
        data.sort_by_key(|d| d.index);

        let mut vectors = Vec::with_capacity(data.len());
        for item in data {
            if item.embedding.len() != self.dimension {
                anyhow::bail!(
                    "Embedding dimension mismatch: expected {}, got {}",
                    self.dimension,
                    item.embedding.len()
                );
            }
            vectors.push(item.embedding);
        }

        Ok(vectors)
    }

    async fn call_with_retry(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut last_err = None;

        for attempt in 0..self.max_retries {
            if attempt > 0 {
                let backoff = Duration::from_millis(500 * 2u64.pow(attempt as u32 - 1));
                warn!(
                    "Embedding attempt {}/{} failed, retrying in {:?}",
                    attempt, self.max_retries, backoff
                );
                tokio::time::sleep(backoff).await;
            }

            match self.call_provider(texts).await {
                Ok(vectors) => return Ok(vectors),
                Err(e) => last_err = Some(e),
            }
        }

        Err(last_err.unwrap_or_else(|| anyhow::anyhow!("embedding retries exhausted")))
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for EmbeddingService {
    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ApiError> {
        use futures::future::join_all;

        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!(
            "Embedding {} texts in sub-batches of {}",
            texts.len(),
            self.batch_size
        );

        // Sub-batches run concurrently under the embedding semaphore;
        // join_all keeps them in order.
        let futures: Vec<_> = texts
            .chunks(self.batch_size)
            .map(|batch| async move {
                let (_permit, wait) = Limiters::acquire_timed(
                    self.limiters.embedding.clone(),
                    self.limiters.acquire_timeout,
                    "embedding",
                )
                .await
                .map_err(|e| ApiError::EmbeddingUnavailable(e.to_string()))?;

                debug!(wait_ms = wait.as_millis() as u64, op = "embedding", "wait_queue");

                self.call_with_retry(batch)
                    .await
                    .map_err(|e| ApiError::EmbeddingUnavailable(e.to_string()))
            })
            .collect();

        let mut all = Vec::with_capacity(texts.len());
        for result in join_all(futures).await {
            all.extend(result?);
        }

        Ok(all)
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, ApiError> {
        let mut vectors = self.embed_documents(&[text.to_string()]).await?;
        vectors
            .pop()
            .ok_or_else(|| ApiError::EmbeddingUnavailable("empty embedding batch".to_string()))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
