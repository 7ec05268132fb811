use parking_lot::Mutex;
use std::collections::VecDeque;
use tracing::debug;

use crate::models::message::{ChatMessage, Role};

/// Bounded in-process conversation buffer used only for reference
/// resolution. Messages here are never embedded, never indexed and never
/// persisted; past the cap the oldest entries evict FIFO.
pub struct ConversationMemory {
    messages: Mutex<VecDeque<ChatMessage>>,
    max_messages: usize,
}

impl ConversationMemory {
    pub fn new(max_messages: usize) -> Self {
        Self {
            messages: Mutex::new(VecDeque::with_capacity(max_messages.max(1))),
            max_messages: max_messages.max(1),
        }
    }

    pub fn append(&self, role: Role, content: impl Into<String>) {
        let message = match role {
            Role::User => ChatMessage::user(content),
            Role::Assistant => ChatMessage::assistant(content),
        };

        let mut messages = self.messages.lock();
        messages.push_back(message);
        while messages.len() > self.max_messages {
            messages.pop_front();
        }
    }

    /// Last `n` messages in arrival order.
    pub fn recent(&self, n: usize) -> Vec<ChatMessage> {
        let messages = self.messages.lock();
        let skip = messages.len().saturating_sub(n);
        messages.iter().skip(skip).cloned().collect()
    }

    pub fn snapshot(&self) -> Vec<ChatMessage> {
        self.messages.lock().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.messages.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.lock().is_empty()
    }

    pub fn clear(&self) {
        let mut messages = self.messages.lock();
        if !messages.is_empty() {
            debug!("Clearing {} memory messages", messages.len());
        }
        messages.clear();
    }
}
