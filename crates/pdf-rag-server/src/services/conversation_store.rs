use dashmap::DashMap;
use tracing::debug;

use crate::models::message::ChatMessage;

/// In-process conversation store: conversation id → full message list.
/// Opaque and optional per the engine contract; ask/ingest never depend on
/// it for correctness. It only feeds the `chat_history` snapshot.
pub struct ConversationStore {
    storage: DashMap<String, Vec<ChatMessage>>,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self {
            storage: DashMap::new(),
        }
    }

    pub fn append(&self, conversation_id: &str, message: ChatMessage) {
        self.storage
            .entry(conversation_id.to_string())
            .or_default()
            .push(message);
    }

    /// Messages of one conversation in arrival order; unknown ids are an
    /// empty conversation.
    pub fn history(&self, conversation_id: &str) -> Vec<ChatMessage> {
        self.storage
            .get(conversation_id)
            .map(|entry| entry.value().clone())
            .unwrap_or_default()
    }

    pub fn conversation_count(&self) -> usize {
        self.storage.len()
    }

    pub fn clear_all(&self) {
        let count = self.storage.len();
        self.storage.clear();
        if count > 0 {
            debug!("Cleared {} conversations", count);
        }
    }
}

impl Default for ConversationStore {
    fn default() -> Self {
        Self::new()
    }
}
