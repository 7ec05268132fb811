use anyhow::{Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::ChatConfig;
use crate::utils::error::ApiError;
use crate::utils::limiters::Limiters;

/// One message of an LLM prompt. Distinct from the conversation-facing
/// `ChatMessage`: prompts carry a system role and no timestamps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptMessage {
    pub role: String,
    pub content: String,
}

impl PromptMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}

/// Chat LLM provider. All engine calls run at temperature 0 with a fixed
/// output budget; deterministic decoding is part of the contract.
#[async_trait::async_trait]
pub trait ChatProvider: Send + Sync {
    async fn complete(
        &self,
        messages: &[PromptMessage],
        max_tokens: usize,
    ) -> Result<String, ApiError>;
    fn model_name(&self) -> &str;
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [PromptMessage],
    max_tokens: usize,
    temperature: f32,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

/// OpenAI-style `/v1/chat/completions` client, non-streaming.
pub struct ChatService {
    client: Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
    max_retries: usize,
    limiters: Arc<Limiters>,
}

/// Engine-wide decoding temperature; never configurable.
pub const TEMPERATURE: f32 = 0.0;

impl ChatService {
    pub fn new(config: ChatConfig, limiters: Arc<Limiters>) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(config.timeout_seconds))
                .build()
                .unwrap_or_else(|_| Client::new()),
            base_url: config.base_url,
            model: config.model,
            api_key: config.api_key,
            max_retries: config.max_retries.max(1),
            limiters,
        }
    }

    async fn call_provider(&self, messages: &[PromptMessage], max_tokens: usize) -> Result<String> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        let request = ChatCompletionRequest {
            model: &self.model,
            messages,
            max_tokens,
            temperature: TEMPERATURE,
            stream: false,
        };

        let mut builder = self.client.post(&url);
        if let Some(key) = &self.api_key {
            builder = builder.header("Authorization", format!("Bearer {}", key));
        }

        let response = builder
            .json(&request)
            .send()
            .await
            .context("Failed to reach chat server")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Chat API error ({}): {}", status, body);
        }

        let body: ChatCompletionResponse = response
            .json()
            .await
            .context("Failed to parse chat completion response")?;

        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();

        if content.trim().is_empty() {
            anyhow::bail!("Chat completion was empty");
        }

        Ok(content)
    }
}

#[async_trait::async_trait]
impl ChatProvider for ChatService {
    async fn complete(
        &self,
        messages: &[PromptMessage],
        max_tokens: usize,
    ) -> Result<String, ApiError> {
        let (_permit, wait) = Limiters::acquire_timed(
            self.limiters.chat.clone(),
            self.limiters.acquire_timeout,
            "chat",
        )
        .await
        .map_err(|e| ApiError::AnswerUnavailable(e.to_string()))?;

        debug!(wait_ms = wait.as_millis() as u64, op = "chat", "wait_queue");

        let mut last_err = None;
        for attempt in 0..self.max_retries {
            if attempt > 0 {
                warn!(
                    "Chat attempt {}/{} failed, retrying",
                    attempt, self.max_retries
                );
                tokio::time::sleep(Duration::from_millis(500)).await;
            }

            match self.call_provider(messages, max_tokens).await {
                Ok(content) => return Ok(content),
                Err(e) => last_err = Some(e),
            }
        }

        Err(ApiError::AnswerUnavailable(
            last_err
                .map(|e| e.to_string())
                .unwrap_or_else(|| "chat retries exhausted".to_string()),
        ))
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
