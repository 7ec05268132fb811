pub mod models;
pub mod pool;
pub mod repository;

pub use models::{ChunkRow, ScoredChunk};
pub use pool::DbPool;
pub use repository::Repository;
