use axum::{extract::State, Json};
use tracing::info;

use crate::models::api::{ResetResponse, StatusResponse};
use crate::state::AppState;
use crate::utils::error::ApiError;

/// Clear index, memory and active document.
/// DELETE /api/reset
pub async fn reset_handler(State(state): State<AppState>) -> Result<Json<ResetResponse>, ApiError> {
    info!("Reset request");
    state.engine.reset().await?;
    Ok(Json(ResetResponse { ok: true }))
}

/// Engine status snapshot.
/// GET /api/status
pub async fn status_handler(
    State(state): State<AppState>,
) -> Result<Json<StatusResponse>, ApiError> {
    let status = state.engine.status().await?;
    Ok(Json(status))
}
