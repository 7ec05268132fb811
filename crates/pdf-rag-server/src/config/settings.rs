use anyhow::Result;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Settings {
    pub server: ServerConfig,
    pub embedding: EmbeddingConfig,
    pub chat: ChatConfig,
    pub rag: RagConfig,
    pub chunking: ChunkingConfig,
    pub memory: MemoryConfig,
    pub index: IndexConfig,
    pub web_search: WebSearchConfig,
    pub limits: LimitsConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct EmbeddingConfig {
    pub model: String,
    pub base_url: String,
    pub dimension: usize,
    pub timeout_seconds: u64,
    pub max_retries: usize,
    /// Provider-side batch cap; larger document batches are split to fit.
    pub batch_size: usize,
    #[serde(default)]
    pub api_key: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ChatConfig {
    pub model: String,
    pub base_url: String,
    pub timeout_seconds: u64,
    pub max_retries: usize,
    pub max_tokens: usize,
    #[serde(default)]
    pub api_key: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RagConfig {
    pub top_k: usize,
    pub max_context_tokens: usize,
    /// Tier-2 LLM intent classification for ambiguous visualization
    /// questions. Off by default; a tier-1 miss then means "no viz".
    pub llm_intent: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ChunkingConfig {
    pub target_tokens: usize,
    pub min_tokens: usize,
    pub max_tokens: usize,
    pub overlap_tokens: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct MemoryConfig {
    pub max_messages: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct IndexConfig {
    pub path: PathBuf,
    pub pool_max_size: u32,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct WebSearchConfig {
    pub enabled: bool,
    pub base_url: String,
    pub timeout_seconds: u64,
    pub max_retries: usize,
    pub results: usize,
    #[serde(default)]
    pub api_key: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LimitsConfig {
    pub embedding_concurrency: usize,
    pub chat_concurrency: usize,
    pub index_search_concurrency: usize,
    pub acquire_timeout_ms: u64,
    pub logger_queue_capacity: usize,
    pub logger_batch_size: usize,
    pub logger_batch_timeout_ms: u64,
}

impl Settings {
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = Config::builder()
            .add_source(File::with_name("config/settings").required(true))
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let mut settings: Settings = config.try_deserialize()?;

        // Provider credential: config file wins, OPENAI_API_KEY fills gaps.
        let env_key = std::env::var("OPENAI_API_KEY").ok();
        if settings.embedding.api_key.is_none() {
            settings.embedding.api_key = env_key.clone();
        }
        if settings.chat.api_key.is_none() {
            settings.chat.api_key = env_key;
        }

        Ok(settings)
    }
}
