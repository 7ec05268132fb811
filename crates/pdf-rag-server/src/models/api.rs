use serde::{Deserialize, Serialize};

use crate::document::TableBlock;
use crate::models::message::ChatMessage;
use crate::models::viz::Visualization;

// ===== REQUEST MODELS =====

#[derive(Debug, Deserialize)]
pub struct IngestRequest {
    pub filename: String,
    /// Pages in document order; ordinals are assigned from position.
    pub pages: Vec<PageInput>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PageInput {
    pub text: String,
    #[serde(default)]
    pub tables: Vec<TableBlock>,
}

#[derive(Debug, Deserialize)]
pub struct AskRequest {
    pub question: String,
    #[serde(default)]
    pub conversation_id: Option<String>,
}

// ===== RESPONSE MODELS =====

#[derive(Debug, Serialize)]
pub struct IngestResponse {
    pub document_id: String,
    pub pages: usize,
    pub chunks: usize,
}

#[derive(Debug, Serialize)]
pub struct AskResponse {
    pub answer: String,
    pub conversation_id: String,
    /// `null` when the question did not ask for a visualization, or when a
    /// requested chart could not be produced.
    pub visualization: Option<Visualization>,
    pub chat_history: Vec<ChatMessage>,
}

#[derive(Debug, Serialize)]
pub struct ResetResponse {
    pub ok: bool,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub has_active_document: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_id: Option<String>,
    pub chunk_count: u64,
    pub embedder_model: String,
    pub chat_model: String,
    pub temperature: f32,
}
