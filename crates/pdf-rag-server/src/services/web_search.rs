use anyhow::{Context, Result};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::warn;

use crate::config::WebSearchConfig;
use crate::utils::error::ApiError;

/// Optional web search dependency. When disabled or failing, the engine
/// degrades to document-only answers.
#[async_trait::async_trait]
pub trait SearchProvider: Send + Sync {
    async fn search(&self, query: &str, k: usize) -> Result<Vec<SearchHit>, ApiError>;
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    results: Vec<SearchHit>,
}

pub struct WebSearchService {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    max_retries: usize,
}

impl WebSearchService {
    pub fn new(config: WebSearchConfig) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(config.timeout_seconds))
                .build()
                .unwrap_or_else(|_| Client::new()),
            base_url: config.base_url,
            api_key: config.api_key,
            max_retries: config.max_retries.max(1),
        }
    }

    async fn call_provider(&self, query: &str, k: usize) -> Result<Vec<SearchHit>> {
        let mut builder = self
            .client
            .get(&self.base_url)
            .query(&[("q", query), ("k", &k.to_string())]);
        if let Some(key) = &self.api_key {
            builder = builder.header("Authorization", format!("Bearer {}", key));
        }

        let response = builder.send().await.context("Failed to reach search server")?;

        if !response.status().is_success() {
            anyhow::bail!("Search API error ({})", response.status());
        }

        let body: SearchResponse = response
            .json()
            .await
            .context("Failed to parse search response")?;

        Ok(body.results.into_iter().take(k).collect())
    }
}

#[async_trait::async_trait]
impl SearchProvider for WebSearchService {
    async fn search(&self, query: &str, k: usize) -> Result<Vec<SearchHit>, ApiError> {
        let mut last_err = None;
        for attempt in 0..self.max_retries {
            if attempt > 0 {
                warn!("Search attempt {}/{} failed, retrying", attempt, self.max_retries);
            }
            match self.call_provider(query, k).await {
                Ok(hits) => return Ok(hits),
                Err(e) => last_err = Some(e),
            }
        }

        Err(ApiError::InternalError(
            last_err
                .map(|e| e.to_string())
                .unwrap_or_else(|| "search retries exhausted".to_string()),
        ))
    }
}
