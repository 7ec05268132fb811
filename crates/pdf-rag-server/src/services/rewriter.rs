use std::sync::Arc;
use tracing::{debug, warn};

use crate::models::message::ChatMessage;
use crate::services::chat_service::{ChatProvider, PromptMessage};

const REWRITE_MAX_TOKENS: usize = 200;

/// Expands an under-specified follow-up ("And Q2?") into a self-contained
/// retrieval query using the recent conversation tail.
pub struct QuestionRewriter {
    chat: Arc<dyn ChatProvider>,
}

impl QuestionRewriter {
    pub fn new(chat: Arc<dyn ChatProvider>) -> Self {
        Self { chat }
    }

    /// Never fails: an LLM error falls back to the raw question. With no
    /// memory the question passes through without any LLM call.
    pub async fn rewrite(&self, question: &str, recent: &[ChatMessage]) -> String {
        if recent.is_empty() {
            debug!("Memory empty, skipping rewrite");
            return question.to_string();
        }

        let mut transcript = String::new();
        for message in recent {
            transcript.push_str(message.role.as_str());
            transcript.push_str(": ");
            transcript.push_str(&message.content);
            transcript.push('\n');
        }

        let system = PromptMessage::system(
            "You rewrite the user's latest question into a single self-contained \
             question, resolving pronouns and references from the conversation. \
             If the question is already self-contained, return it unchanged. \
             Return only the rewritten question, nothing else.",
        );
        let user = PromptMessage::user(format!(
            "Conversation so far:\n{}\nLatest question: {}",
            transcript, question
        ));

        match self.chat.complete(&[system, user], REWRITE_MAX_TOKENS).await {
            Ok(rewritten) => {
                let rewritten = rewritten.trim().trim_matches('"').trim();
                if rewritten.is_empty() {
                    warn!("Rewriter returned empty output, using raw question");
                    question.to_string()
                } else {
                    debug!("Rewrote question: {} -> {}", question, rewritten);
                    rewritten.to_string()
                }
            }
            Err(e) => {
                warn!("Rewriter failed ({}), using raw question", e);
                question.to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::error::ApiError;
    use mockall::mock;
    use mockall::predicate::always;

    mock! {
        Chat {}

        #[async_trait::async_trait]
        impl ChatProvider for Chat {
            async fn complete(
                &self,
                messages: &[PromptMessage],
                max_tokens: usize,
            ) -> Result<String, ApiError>;
            fn model_name(&self) -> &str;
        }
    }

    #[tokio::test]
    async fn empty_memory_skips_llm() {
        let mut chat = MockChat::new();
        chat.expect_complete().times(0);

        let rewriter = QuestionRewriter::new(Arc::new(chat));
        let out = rewriter.rewrite("What was Q1 revenue?", &[]).await;
        assert_eq!(out, "What was Q1 revenue?");
    }

    #[tokio::test]
    async fn follow_up_is_expanded() {
        let mut chat = MockChat::new();
        chat.expect_complete()
            .with(always(), always())
            .returning(|_, _| Ok("What was Q2 revenue?".to_string()));

        let rewriter = QuestionRewriter::new(Arc::new(chat));
        let recent = vec![
            ChatMessage::user("What was Q1 revenue?"),
            ChatMessage::assistant("Q1 revenue was 100."),
        ];
        let out = rewriter.rewrite("And Q2?", &recent).await;
        assert_eq!(out, "What was Q2 revenue?");
    }

    #[tokio::test]
    async fn llm_failure_falls_back_to_raw_question() {
        let mut chat = MockChat::new();
        chat.expect_complete()
            .returning(|_, _| Err(ApiError::AnswerUnavailable("boom".to_string())));

        let rewriter = QuestionRewriter::new(Arc::new(chat));
        let recent = vec![ChatMessage::user("earlier")];
        let out = rewriter.rewrite("And Q2?", &recent).await;
        assert_eq!(out, "And Q2?");
    }

    #[tokio::test]
    async fn blank_rewrite_falls_back_to_raw_question() {
        let mut chat = MockChat::new();
        chat.expect_complete().returning(|_, _| Ok("  \"\"  ".to_string()));

        let rewriter = QuestionRewriter::new(Arc::new(chat));
        let recent = vec![ChatMessage::user("earlier")];
        let out = rewriter.rewrite("And Q2?", &recent).await;
        assert_eq!(out, "And Q2?");
    }
}
