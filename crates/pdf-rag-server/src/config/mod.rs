pub mod settings;

pub use settings::{
    ChatConfig, ChunkingConfig, EmbeddingConfig, IndexConfig, LimitsConfig, MemoryConfig,
    RagConfig, ServerConfig, Settings, WebSearchConfig,
};
