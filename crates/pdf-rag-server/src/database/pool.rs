use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use tracing::info;

use crate::config::IndexConfig;
use crate::utils::error::ApiError;

/// The index database file inside `index.path`.
const DB_FILE: &str = "chunks.db";

#[derive(Clone)]
pub struct DbPool {
    pool: SqlitePool,
}

impl DbPool {
    /// Open (or create) the index database under the configured directory.
    pub async fn new(config: &IndexConfig) -> Result<Self, ApiError> {
        tokio::fs::create_dir_all(&config.path).await.map_err(|e| {
            ApiError::IndexUnavailable(format!(
                "Cannot create index directory {}: {}",
                config.path.display(),
                e
            ))
        })?;

        let db_path = config.path.join(DB_FILE);
        let options = SqliteConnectOptions::new()
            .filename(&db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.pool_max_size.max(1))
            .connect_with(options)
            .await
            .map_err(|e| ApiError::IndexUnavailable(e.to_string()))?;

        info!("Index database open at {}", db_path.display());
        Ok(Self { pool })
    }

    pub fn get_pool(&self) -> &SqlitePool {
        &self.pool
    }
}
