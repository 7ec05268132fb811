pub mod answerer;
pub mod chat_service;
pub mod conversation_store;
pub mod embedding_service;
pub mod memory;
pub mod orchestrator;
pub mod retriever;
pub mod rewriter;
pub mod viz;
pub mod web_search;

pub use answerer::Answerer;
pub use chat_service::{ChatProvider, ChatService};
pub use conversation_store::ConversationStore;
pub use embedding_service::{EmbeddingProvider, EmbeddingService};
pub use memory::ConversationMemory;
pub use orchestrator::RagEngine;
pub use retriever::Retriever;
pub use rewriter::QuestionRewriter;
pub use viz::VizPipeline;
pub use web_search::{SearchProvider, WebSearchService};
