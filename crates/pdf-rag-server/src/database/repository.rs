use serde::{Deserialize, Serialize};
use sqlx::QueryBuilder;
use std::cmp::Ordering;
use std::path::Path;
use tracing::{debug, warn};

use super::models::{embedding_from_blob, embedding_to_blob, ChunkRow, ScoredChunk};
use super::DbPool;
use crate::document::Chunk;
use crate::logging::types::ActivityLog;
use crate::utils::error::ApiError;
use crate::utils::similarity::cosine_similarity;

/// Side-car metadata recording which embedder produced the stored vectors.
/// A mismatch on open means the index is unusable and gets cleared.
const META_FILE: &str = "index_meta.json";

#[derive(Debug, Serialize, Deserialize, PartialEq)]
struct IndexMeta {
    embedding_model: String,
    dimension: usize,
}

pub struct Repository {
    pool: DbPool,
}

impl Repository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn init_schema(&self) -> Result<(), ApiError> {
        sqlx::query(
            r#"CREATE TABLE IF NOT EXISTS rag_document_chunks (
                chunk_id     TEXT PRIMARY KEY,
                document_id  TEXT NOT NULL,
                chunk_index  INTEGER NOT NULL,
                page_number  INTEGER NOT NULL,
                content_type TEXT NOT NULL,
                content      TEXT NOT NULL,
                token_count  INTEGER NOT NULL,
                embedding    BLOB NOT NULL,
                created_at   TEXT NOT NULL DEFAULT (datetime('now'))
            )"#,
        )
        .execute(self.pool.get_pool())
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_chunks_document
             ON rag_document_chunks(document_id)",
        )
        .execute(self.pool.get_pool())
        .await?;

        sqlx::query(
            r#"CREATE TABLE IF NOT EXISTS activity_logs (
                log_id          INTEGER PRIMARY KEY AUTOINCREMENT,
                activity_type   TEXT NOT NULL,
                activity_status TEXT NOT NULL,
                document_id     TEXT,
                conversation_id TEXT,
                detail          TEXT,
                duration_ms     INTEGER NOT NULL,
                created_at      TEXT NOT NULL
            )"#,
        )
        .execute(self.pool.get_pool())
        .await?;

        Ok(())
    }

    /// Enforce embedder consistency: stored vectors must come from the
    /// configured model + dimension. On mismatch the index is cleared and
    /// the side-car rewritten; the caller simply re-ingests.
    pub async fn ensure_embedder_meta(
        &self,
        index_dir: &Path,
        model: &str,
        dimension: usize,
    ) -> Result<(), ApiError> {
        let meta_path = index_dir.join(META_FILE);
        let current = IndexMeta {
            embedding_model: model.to_string(),
            dimension,
        };

        if let Ok(raw) = tokio::fs::read_to_string(&meta_path).await {
            match serde_json::from_str::<IndexMeta>(&raw) {
                Ok(stored) if stored == current => return Ok(()),
                Ok(stored) => {
                    warn!(
                        "Embedder changed ({}/{} -> {}/{}), clearing index",
                        stored.embedding_model, stored.dimension, model, dimension
                    );
                    self.clear_chunks().await?;
                }
                Err(e) => {
                    warn!("Unreadable index side-car, clearing index: {}", e);
                    self.clear_chunks().await?;
                }
            }
        }

        let raw = serde_json::to_string_pretty(&current)
            .map_err(|e| ApiError::InternalError(e.to_string()))?;
        tokio::fs::write(&meta_path, raw)
            .await
            .map_err(|e| ApiError::IndexUnavailable(format!("Cannot write side-car: {}", e)))?;

        Ok(())
    }

    /// Insert chunks with their embeddings; idempotent by chunk id.
    pub async fn insert_document_chunks(
        &self,
        chunks: &[(Chunk, Vec<f32>)],
    ) -> Result<(), ApiError> {
        let mut transaction = self.pool.get_pool().begin().await?;

        for (chunk, embedding) in chunks {
            sqlx::query(
                r#"INSERT INTO rag_document_chunks
                   (chunk_id, document_id, chunk_index, page_number,
                    content_type, content, token_count, embedding)
                   VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                   ON CONFLICT(chunk_id) DO UPDATE SET
                     document_id = excluded.document_id,
                     chunk_index = excluded.chunk_index,
                     page_number = excluded.page_number,
                     content_type = excluded.content_type,
                     content = excluded.content,
                     token_count = excluded.token_count,
                     embedding = excluded.embedding"#,
            )
            .bind(&chunk.id)
            .bind(&chunk.document_id)
            .bind(chunk.chunk_index as i64)
            .bind(chunk.page_number as i64)
            .bind(chunk.content_type.as_str())
            .bind(&chunk.text)
            .bind(chunk.token_count as i64)
            .bind(embedding_to_blob(embedding))
            .execute(&mut *transaction)
            .await?;
        }

        transaction.commit().await?;
        debug!("Inserted {} chunks", chunks.len());

        Ok(())
    }

    /// Top-k cosine search over one document's chunks. Scores descend; ties
    /// break on ascending chunk_index.
    pub async fn search_chunks(
        &self,
        query_embedding: &[f32],
        k: usize,
        document_id: &str,
    ) -> Result<Vec<ScoredChunk>, ApiError> {
        let rows = sqlx::query_as::<_, ChunkRow>(
            r#"SELECT chunk_id, document_id, chunk_index, page_number,
                      content_type, content, token_count, embedding
               FROM rag_document_chunks
               WHERE document_id = ?1"#,
        )
        .bind(document_id)
        .fetch_all(self.pool.get_pool())
        .await?;

        let mut scored: Vec<ScoredChunk> = rows
            .into_iter()
            .filter_map(|row| {
                let embedding = embedding_from_blob(&row.embedding);
                if embedding.len() != query_embedding.len() {
                    warn!("Skipping chunk {} with stale dimension", row.chunk_id);
                    return None;
                }
                let similarity = cosine_similarity(query_embedding, &embedding);
                Some(ScoredChunk {
                    chunk_id: row.chunk_id,
                    document_id: row.document_id,
                    chunk_index: row.chunk_index as u32,
                    page_number: row.page_number as u32,
                    content_type: row.content_type,
                    content: row.content,
                    similarity,
                })
            })
            .collect();

        scored.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(Ordering::Equal)
                .then(a.chunk_index.cmp(&b.chunk_index))
        });
        scored.truncate(k);

        debug!("Found {} chunks for document {}", scored.len(), document_id);
        Ok(scored)
    }

    pub async fn delete_document(&self, document_id: &str) -> Result<u64, ApiError> {
        let result = sqlx::query("DELETE FROM rag_document_chunks WHERE document_id = ?1")
            .bind(document_id)
            .execute(self.pool.get_pool())
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn clear_chunks(&self) -> Result<(), ApiError> {
        sqlx::query("DELETE FROM rag_document_chunks")
            .execute(self.pool.get_pool())
            .await?;
        Ok(())
    }

    pub async fn chunk_count(&self, document_id: Option<&str>) -> Result<u64, ApiError> {
        let count: i64 = match document_id {
            Some(id) => {
                sqlx::query_scalar(
                    "SELECT COUNT(*) FROM rag_document_chunks WHERE document_id = ?1",
                )
                .bind(id)
                .fetch_one(self.pool.get_pool())
                .await?
            }
            None => {
                sqlx::query_scalar("SELECT COUNT(*) FROM rag_document_chunks")
                    .fetch_one(self.pool.get_pool())
                    .await?
            }
        };
        Ok(count as u64)
    }

    pub async fn ping(&self) -> Result<(), ApiError> {
        sqlx::query_scalar::<_, i64>("SELECT 1")
            .fetch_one(self.pool.get_pool())
            .await?;
        Ok(())
    }

    /// Bulk insert of activity rows; used by the background logger worker.
    pub async fn insert_activity_batch(&self, logs: &[ActivityLog]) -> Result<usize, ApiError> {
        if logs.is_empty() {
            return Ok(0);
        }

        let mut query_builder = QueryBuilder::new(
            "INSERT INTO activity_logs (activity_type, activity_status, document_id, \
             conversation_id, detail, duration_ms, created_at) ",
        );

        query_builder.push_values(logs, |mut b, log| {
            b.push_bind(log.activity_type.as_str())
                .push_bind(log.status.as_str())
                .push_bind(&log.document_id)
                .push_bind(&log.conversation_id)
                .push_bind(&log.detail)
                .push_bind(log.duration_ms)
                .push_bind(log.created_at.to_rfc3339());
        });

        let result = query_builder.build().execute(self.pool.get_pool()).await?;
        Ok(result.rows_affected() as usize)
    }
}
