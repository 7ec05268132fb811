use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::database::{Repository, ScoredChunk};
use crate::services::embedding_service::EmbeddingProvider;
use crate::utils::error::ApiError;
use crate::utils::limiters::Limiters;

const SEARCH_TIMEOUT_SECS: u64 = 15;

/// Query → top-k scored chunks of the active document. Every search
/// carries the document filter; re-ranking is out of scope.
pub struct Retriever {
    repository: Arc<Repository>,
    embedder: Arc<dyn EmbeddingProvider>,
    limiters: Arc<Limiters>,
    top_k: usize,
}

impl Retriever {
    pub fn new(
        repository: Arc<Repository>,
        embedder: Arc<dyn EmbeddingProvider>,
        limiters: Arc<Limiters>,
        top_k: usize,
    ) -> Self {
        Self {
            repository,
            embedder,
            limiters,
            top_k: top_k.max(1),
        }
    }

    pub async fn retrieve(
        &self,
        query: &str,
        document_id: &str,
    ) -> Result<Vec<ScoredChunk>, ApiError> {
        info!("Retrieving context for query: {}", query);

        let query_embedding = self.embedder.embed_query(query).await?;

        let (_permit, wait) = Limiters::acquire_timed(
            self.limiters.index_search.clone(),
            self.limiters.acquire_timeout,
            "index_search",
        )
        .await
        .map_err(|e| ApiError::IndexUnavailable(e.to_string()))?;

        debug!(wait_ms = wait.as_millis() as u64, op = "index_search", "wait_queue");

        let exec_start = Instant::now();
        let search_future = self
            .repository
            .search_chunks(&query_embedding, self.top_k, document_id);

        let chunks = match tokio::time::timeout(
            std::time::Duration::from_secs(SEARCH_TIMEOUT_SECS),
            search_future,
        )
        .await
        {
            Ok(Ok(chunks)) => chunks,
            Ok(Err(e)) => {
                warn!("Vector search failed: {}", e);
                return Err(e);
            }
            Err(_) => {
                warn!("Vector search timeout after {}s", SEARCH_TIMEOUT_SECS);
                return Err(ApiError::IndexUnavailable("Search timeout".to_string()));
            }
        };

        debug!(
            exec_ms = exec_start.elapsed().as_millis() as u64,
            op = "index_search",
            "exec"
        );
        debug!("Retrieved {} chunks", chunks.len());

        Ok(chunks)
    }
}
