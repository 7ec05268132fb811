use flume::{bounded, Receiver, Sender};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use super::types::ActivityLog;
use crate::database::Repository;

/// Logger configuration
#[derive(Debug, Clone)]
pub struct LoggerConfig {
    /// Queue capacity (max logs in memory before drops)
    pub queue_capacity: usize,

    /// Batch size for database inserts
    pub batch_size: usize,

    /// Max wait time before flushing a partial batch (milliseconds)
    pub batch_timeout_ms: u64,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 10_000,
            batch_size: 100,
            batch_timeout_ms: 1000,
        }
    }
}

/// Async activity logger: engine operations enqueue, a background worker
/// batches rows into the index database. Never blocks the caller.
#[derive(Clone)]
pub struct ActivityLogger {
    sender: Sender<ActivityLog>,
}

impl ActivityLogger {
    pub fn new(repository: Arc<Repository>, config: LoggerConfig) -> Self {
        let (sender, receiver) = bounded(config.queue_capacity);

        info!(
            "Activity logger: queue={}, batch={}, timeout={}ms",
            config.queue_capacity, config.batch_size, config.batch_timeout_ms
        );

        tokio::spawn(async move {
            Self::worker_loop(repository, receiver, config).await;
        });

        Self { sender }
    }

    /// Fire-and-forget; a full queue drops the entry with a warning.
    pub fn log(&self, activity: ActivityLog) {
        if let Err(e) = self.sender.try_send(activity) {
            warn!("Dropped activity log (queue full?): {}", e);
        }
    }

    pub fn queue_len(&self) -> usize {
        self.sender.len()
    }

    pub fn is_queue_full(&self) -> bool {
        self.sender.is_full()
    }

    async fn worker_loop(
        repository: Arc<Repository>,
        receiver: Receiver<ActivityLog>,
        config: LoggerConfig,
    ) {
        let mut batch: Vec<ActivityLog> = Vec::with_capacity(config.batch_size);
        let batch_timeout = Duration::from_millis(config.batch_timeout_ms);

        loop {
            let deadline = tokio::time::Instant::now() + batch_timeout;

            while batch.len() < config.batch_size {
                match tokio::time::timeout_at(deadline, receiver.recv_async()).await {
                    Ok(Ok(log)) => batch.push(log),
                    Ok(Err(_)) => {
                        // Channel closed: flush and exit.
                        Self::flush(&repository, &mut batch).await;
                        info!("Activity logger worker shutting down");
                        return;
                    }
                    Err(_) => break,
                }
            }

            Self::flush(&repository, &mut batch).await;
        }
    }

    async fn flush(repository: &Repository, batch: &mut Vec<ActivityLog>) {
        if batch.is_empty() {
            return;
        }
        match repository.insert_activity_batch(batch).await {
            Ok(inserted) => debug!("Flushed {} activity logs", inserted),
            Err(e) => error!("Failed to flush activity batch: {}", e),
        }
        batch.clear();
    }
}
