use std::sync::Arc;

use crate::services::RagEngine;

/// Application state shared across handlers. The engine is a plain value
/// built once at boot and threaded through the router; nothing global.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<RagEngine>,
}
