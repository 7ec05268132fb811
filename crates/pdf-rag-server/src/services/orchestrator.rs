use parking_lot::RwLock;
use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::Settings;
use crate::database::Repository;
use crate::document::chunker::Chunker;
use crate::document::tokenizer::TokenCounter;
use crate::document::{Chunk, Page};
use crate::logging::{ActivityLog, ActivityLogger, ActivityType};
use crate::models::api::{AskResponse, IngestResponse, StatusResponse};
use crate::models::message::{ChatMessage, Role};
use crate::services::answerer::Answerer;
use crate::services::chat_service::{ChatProvider, TEMPERATURE};
use crate::services::conversation_store::ConversationStore;
use crate::services::embedding_service::EmbeddingProvider;
use crate::services::memory::ConversationMemory;
use crate::services::retriever::Retriever;
use crate::services::rewriter::QuestionRewriter;
use crate::services::viz::{VizOutcome, VizPipeline, NO_CHART_DATA};
use crate::services::web_search::SearchProvider;
use crate::utils::error::ApiError;
use crate::utils::limiters::Limiters;

/// The one document whose chunks are searchable. Published only after a
/// fully successful ingest.
#[derive(Debug, Clone)]
pub struct ActiveDocument {
    pub document_id: String,
    pub filename: String,
    pub page_count: usize,
    pub chunk_count: usize,
}

/// Public engine façade: ingest, ask, reset, status.
///
/// Ingest and reset hold the write side of the gate, so they are critical
/// sections; asks share the read side and run concurrently. The active
/// document id sits behind its own lock and flips atomically at commit.
pub struct RagEngine {
    repository: Arc<Repository>,
    embedder: Arc<dyn EmbeddingProvider>,
    chat: Arc<dyn ChatProvider>,
    web_search: Option<Arc<dyn SearchProvider>>,
    web_results: usize,
    chunker: Chunker,
    memory: ConversationMemory,
    conversations: ConversationStore,
    rewriter: QuestionRewriter,
    retriever: Retriever,
    answerer: Answerer,
    viz: VizPipeline,
    logger: ActivityLogger,
    active: RwLock<Option<ActiveDocument>>,
    ingest_gate: tokio::sync::RwLock<()>,
}

impl RagEngine {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        settings: &Settings,
        repository: Arc<Repository>,
        embedder: Arc<dyn EmbeddingProvider>,
        chat: Arc<dyn ChatProvider>,
        web_search: Option<Arc<dyn SearchProvider>>,
        counter: Arc<dyn TokenCounter>,
        limiters: Arc<Limiters>,
        logger: ActivityLogger,
    ) -> Self {
        Self {
            chunker: Chunker::new(settings.chunking.clone(), counter.clone()),
            memory: ConversationMemory::new(settings.memory.max_messages),
            conversations: ConversationStore::new(),
            rewriter: QuestionRewriter::new(chat.clone()),
            retriever: Retriever::new(
                repository.clone(),
                embedder.clone(),
                limiters,
                settings.rag.top_k,
            ),
            answerer: Answerer::new(
                chat.clone(),
                counter,
                settings.rag.max_context_tokens,
                settings.chat.max_tokens,
            ),
            viz: VizPipeline::new(chat.clone(), settings.rag.llm_intent),
            web_results: settings.web_search.results.max(1),
            repository,
            embedder,
            chat,
            web_search,
            logger,
            active: RwLock::new(None),
            ingest_gate: tokio::sync::RwLock::new(()),
        }
    }

    /// Install a new document as the sole active content. All-or-nothing:
    /// any failure after the reset leaves the index cleared and no active
    /// document, so the next ask fails with NoActiveDocument.
    pub async fn ingest(&self, pages: Vec<Page>, filename: &str) -> Result<IngestResponse, ApiError> {
        if pages.is_empty() {
            return Err(ApiError::InvalidInput("document has no pages".to_string()));
        }

        let started = Instant::now();
        let _gate = self.ingest_gate.write().await;

        let result = self.ingest_inner(&pages, filename).await;
        let elapsed = started.elapsed().as_millis() as i64;
        match &result {
            Ok(response) => {
                info!(
                    "Ingested '{}': {} pages, {} chunks",
                    filename, response.pages, response.chunks
                );
                self.logger.log(
                    ActivityLog::success(ActivityType::Ingest, elapsed)
                        .with_document(response.document_id.as_str()),
                );
            }
            Err(e) => {
                self.logger
                    .log(ActivityLog::error(ActivityType::Ingest, elapsed, e.to_string()));
            }
        }

        result
    }

    async fn ingest_inner(&self, pages: &[Page], filename: &str) -> Result<IngestResponse, ApiError> {
        let document_id = Uuid::new_v4().to_string();

        // Reset first: a full clear keeps document isolation trivial for a
        // single-active-document engine.
        *self.active.write() = None;
        self.repository.clear_chunks().await?;
        self.memory.clear();
        self.conversations.clear_all();

        let outcome: Result<usize, ApiError> = async {
            let chunks = self.chunker.chunk_document(&document_id, pages);
            if chunks.is_empty() {
                return Err(ApiError::InvalidInput(
                    "no extractable text in document".to_string(),
                ));
            }

            let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
            let embeddings = self.embedder.embed_documents(&texts).await?;

            let pairs: Vec<(Chunk, Vec<f32>)> = chunks.into_iter().zip(embeddings).collect();
            self.repository.insert_document_chunks(&pairs).await?;
            Ok(pairs.len())
        }
        .await;

        match outcome {
            Ok(chunk_count) => {
                *self.active.write() = Some(ActiveDocument {
                    document_id: document_id.clone(),
                    filename: filename.to_string(),
                    page_count: pages.len(),
                    chunk_count,
                });
                Ok(IngestResponse {
                    document_id,
                    pages: pages.len(),
                    chunks: chunk_count,
                })
            }
            Err(e) => {
                // Leave no half-indexed document behind.
                if let Err(cleanup) = self.repository.clear_chunks().await {
                    warn!("Post-failure index cleanup failed: {}", cleanup);
                }
                Err(e)
            }
        }
    }

    /// Answer one question against the active document.
    pub async fn ask(
        &self,
        question: &str,
        conversation_id: Option<String>,
    ) -> Result<AskResponse, ApiError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(ApiError::InvalidInput("question is empty".to_string()));
        }

        let started = Instant::now();
        let _gate = self.ingest_gate.read().await;

        let document_id = self
            .active
            .read()
            .as_ref()
            .map(|doc| doc.document_id.clone())
            .ok_or(ApiError::NoActiveDocument)?;

        let conversation_id = conversation_id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let result = self.ask_inner(question, &document_id, &conversation_id).await;
        let elapsed = started.elapsed().as_millis() as i64;
        match &result {
            Ok(_) => self.logger.log(
                ActivityLog::success(ActivityType::Ask, elapsed)
                    .with_document(document_id.as_str())
                    .with_conversation(conversation_id.as_str()),
            ),
            Err(e) => self.logger.log(
                ActivityLog::error(ActivityType::Ask, elapsed, e.to_string())
                    .with_document(document_id.as_str())
                    .with_conversation(conversation_id.as_str()),
            ),
        }

        result
    }

    async fn ask_inner(
        &self,
        question: &str,
        document_id: &str,
        conversation_id: &str,
    ) -> Result<AskResponse, ApiError> {
        let recent = self.memory.snapshot();

        let rewritten = self.rewriter.rewrite(question, &recent).await;
        let chunks = self.retriever.retrieve(&rewritten, document_id).await?;
        let mut context = self.answerer.build_context(&chunks);

        if let Some(search) = &self.web_search {
            match search.search(&rewritten, self.web_results).await {
                Ok(hits) if !hits.is_empty() => {
                    context.push_str("\nSupplementary web results:\n");
                    for hit in &hits {
                        let _ = writeln!(context, "- {} ({}): {}", hit.title, hit.url, hit.snippet);
                    }
                }
                Ok(_) => {}
                Err(e) => warn!("Web search unavailable ({}), document-only answer", e),
            }
        }

        // Answer text and visualization are independent; run them side by
        // side. The intent classifier reads the user's own phrasing.
        let (answer_result, viz_outcome) = tokio::join!(
            self.answerer.answer(&rewritten, &context, &recent),
            self.viz.run(question, &context),
        );

        let (answer, visualization) = match viz_outcome {
            VizOutcome::ChartUnavailable => (NO_CHART_DATA.to_string(), None),
            VizOutcome::Ready(viz) => (answer_result?, Some(viz)),
            VizOutcome::None => (answer_result?, None),
        };

        // Memory mutates only after the answer exists; a failed or
        // cancelled ask leaves no trace.
        self.memory.append(Role::User, question);
        self.memory.append(Role::Assistant, &answer);
        self.conversations
            .append(conversation_id, ChatMessage::user(question));
        self.conversations
            .append(conversation_id, ChatMessage::assistant(&answer));

        Ok(AskResponse {
            answer,
            conversation_id: conversation_id.to_string(),
            visualization,
            chat_history: self.conversations.history(conversation_id),
        })
    }

    /// Clear everything. Idempotent.
    pub async fn reset(&self) -> Result<(), ApiError> {
        let started = Instant::now();
        let _gate = self.ingest_gate.write().await;

        *self.active.write() = None;
        self.repository.clear_chunks().await?;
        self.memory.clear();
        self.conversations.clear_all();

        info!("Engine reset");
        self.logger.log(ActivityLog::success(
            ActivityType::Reset,
            started.elapsed().as_millis() as i64,
        ));
        Ok(())
    }

    pub async fn status(&self) -> Result<StatusResponse, ApiError> {
        let active = self.active.read().clone();
        let chunk_count = match &active {
            Some(doc) => self.repository.chunk_count(Some(&doc.document_id)).await?,
            None => 0,
        };

        Ok(StatusResponse {
            has_active_document: active.is_some(),
            document_id: active.as_ref().map(|doc| doc.document_id.clone()),
            chunk_count,
            embedder_model: self.embedder.model_name().to_string(),
            chat_model: self.chat.model_name().to_string(),
            temperature: TEMPERATURE,
        })
    }

    /// In-process memory size; used by the integration suite to observe
    /// the ingest-time reset.
    pub fn memory_len(&self) -> usize {
        self.memory.len()
    }

    /// Readiness probe: is the index database reachable.
    pub async fn ping(&self) -> Result<(), ApiError> {
        self.repository.ping().await
    }
}
