use std::sync::Arc;
use tracing::{debug, info};

use crate::database::ScoredChunk;
use crate::document::tokenizer::TokenCounter;
use crate::models::message::ChatMessage;
use crate::services::chat_service::{ChatProvider, PromptMessage};
use crate::utils::error::ApiError;

/// The exact fallback when retrieved context does not support an answer.
pub const NOT_AVAILABLE: &str = "Not available in the uploaded document.";

/// How many trailing memory messages ride along for style and pronouns.
const MEMORY_TAIL: usize = 4;

/// Grounded answer generation over the retrieved context blocks.
pub struct Answerer {
    chat: Arc<dyn ChatProvider>,
    counter: Arc<dyn TokenCounter>,
    max_context_tokens: usize,
    max_answer_tokens: usize,
}

impl Answerer {
    pub fn new(
        chat: Arc<dyn ChatProvider>,
        counter: Arc<dyn TokenCounter>,
        max_context_tokens: usize,
        max_answer_tokens: usize,
    ) -> Self {
        Self {
            chat,
            counter,
            max_context_tokens,
            max_answer_tokens,
        }
    }

    /// Page-labeled context blocks, truncated to the token budget in
    /// retrieval order.
    pub fn build_context(&self, chunks: &[ScoredChunk]) -> String {
        let mut context = String::new();
        let mut used_tokens = 0usize;
        let mut included = 0usize;

        for chunk in chunks {
            let block = format!("[page {}] {}\n\n", chunk.page_number, chunk.content.trim());
            let block_tokens = self.counter.count(&block);
            if used_tokens + block_tokens > self.max_context_tokens && included > 0 {
                debug!("Context truncated after {} blocks", included);
                break;
            }
            context.push_str(&block);
            used_tokens += block_tokens;
            included += 1;
        }

        debug!(
            "Built context: {} blocks, ~{} tokens",
            included, used_tokens
        );
        context
    }

    /// Answer strictly from the prepared context. Empty context short-
    /// circuits to the exact not-available sentence without an LLM call.
    pub async fn answer(
        &self,
        question: &str,
        context: &str,
        memory_tail: &[ChatMessage],
    ) -> Result<String, ApiError> {
        if context.trim().is_empty() {
            info!("No context retrieved, returning not-available answer");
            return Ok(NOT_AVAILABLE.to_string());
        }

        let system = PromptMessage::system(format!(
            "You answer questions about an uploaded document. Rules:\n\
             - Answer only from the context blocks below; each block is \
             labeled with its page number.\n\
             - If the answer is not present in the context, reply with the \
             exact phrase \"{}\"\n\
             - Do not invent numbers; quote figures verbatim from the \
             context where precision matters.\n\
             - Preserve the units shown in the document.\n\n\
             Context:\n{}",
            NOT_AVAILABLE, context
        ));

        let mut messages = Vec::with_capacity(MEMORY_TAIL + 2);
        messages.push(system);
        let skip = memory_tail.len().saturating_sub(MEMORY_TAIL);
        for message in memory_tail.iter().skip(skip) {
            messages.push(PromptMessage {
                role: message.role.as_str().to_string(),
                content: message.content.clone(),
            });
        }
        messages.push(PromptMessage::user(question));

        let answer = self.chat.complete(&messages, self.max_answer_tokens).await?;
        Ok(answer.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::tokenizer::HeuristicCounter;
    use mockall::mock;

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

    fn chunk(page: u32, index: u32, content: &str) -> ScoredChunk {
        ScoredChunk {
            chunk_id: format!("c{}", index),
            document_id: "doc".to_string(),
            chunk_index: index,
            page_number: page,
            content_type: "prose".to_string(),
            content: content.to_string(),
            similarity: 0.9,
        }
    }

    #[tokio::test]
    async fn empty_context_short_circuits_without_llm() {
        let mut chat = MockChat::new();
        chat.expect_complete().times(0);

        let answerer = Answerer::new(Arc::new(chat), Arc::new(HeuristicCounter), 1000, 256);
        let answer = answerer.answer("What was Q3 revenue?", "", &[]).await.unwrap();
        assert_eq!(answer, NOT_AVAILABLE);
    }

    #[test]
    fn context_blocks_are_page_labeled() {
        let chat = MockChat::new();
        let answerer = Answerer::new(Arc::new(chat), Arc::new(HeuristicCounter), 1000, 256);

        let context = answerer.build_context(&[
            chunk(1, 0, "Q1 revenue was 100."),
            chunk(2, 1, "Q2 revenue was 115."),
        ]);
        assert!(context.contains("[page 1] Q1 revenue was 100."));
        assert!(context.contains("[page 2] Q2 revenue was 115."));
    }

    #[test]
    fn context_respects_token_budget() {
        let chat = MockChat::new();
        let answerer = Answerer::new(Arc::new(chat), Arc::new(HeuristicCounter), 20, 256);

        let big = "word ".repeat(50);
        let context = answerer.build_context(&[chunk(1, 0, &big), chunk(2, 1, &big)]);
        // First block always included, second dropped by the budget.
        assert!(context.contains("[page 1]"));
        assert!(!context.contains("[page 2]"));
    }

    #[tokio::test]
    async fn system_prompt_carries_grounding_rules() {
        let mut chat = MockChat::new();
        chat.expect_complete()
            .withf(|messages, _| {
                let system = &messages[0];
                system.role == "system"
                    && system.content.contains(NOT_AVAILABLE)
                    && system.content.contains("[page 1]")
            })
            .returning(|_, _| Ok("Q1 revenue was 100.".to_string()));

        let answerer = Answerer::new(Arc::new(chat), Arc::new(HeuristicCounter), 1000, 256);
        let context = answerer.build_context(&[chunk(1, 0, "Q1 revenue was 100.")]);
        let answer = answerer
            .answer("What was Q1 revenue?", &context, &[])
            .await
            .unwrap();
        assert!(answer.contains("100"));
    }
}
