use axum::{extract::State, Json};
use tracing::info;

use crate::models::api::{AskRequest, AskResponse};
use crate::state::AppState;
use crate::utils::error::ApiError;

/// Ask a question against the active document.
/// POST /api/ask
pub async fn ask_handler(
    State(state): State<AppState>,
    Json(request): Json<AskRequest>,
) -> Result<Json<AskResponse>, ApiError> {
    if request.question.trim().is_empty() {
        return Err(ApiError::InvalidInput("question is empty".to_string()));
    }

    info!("Ask request: {}", request.question);

    let response = state
        .engine
        .ask(&request.question, request.conversation_id)
        .await?;
    Ok(Json(response))
}
