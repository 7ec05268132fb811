use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("No active document: upload a document before asking")]
    NoActiveDocument,

    #[error("Embedding provider unavailable: {0}")]
    EmbeddingUnavailable(String),

    #[error("Answer generation unavailable: {0}")]
    AnswerUnavailable(String),

    #[error("Index unavailable: {0}")]
    IndexUnavailable(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        ApiError::IndexUnavailable(err.to_string())
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match self {
            ApiError::InvalidInput(msg) => {
                tracing::warn!("Invalid input: {}", msg);
                (StatusCode::BAD_REQUEST, "InvalidInput", msg)
            }
            ApiError::NoActiveDocument => {
                tracing::warn!("Ask without an active document");
                (
                    StatusCode::CONFLICT,
                    "NoActiveDocument",
                    "No active document: upload a document before asking".to_string(),
                )
            }
            ApiError::EmbeddingUnavailable(msg) => {
                tracing::error!("Embedding provider unavailable: {}", msg);
                (StatusCode::SERVICE_UNAVAILABLE, "EmbeddingUnavailable", msg)
            }
            ApiError::AnswerUnavailable(msg) => {
                tracing::error!("Answer generation unavailable: {}", msg);
                (StatusCode::SERVICE_UNAVAILABLE, "AnswerUnavailable", msg)
            }
            ApiError::IndexUnavailable(msg) => {
                tracing::error!("Index unavailable: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "IndexUnavailable", msg)
            }
            ApiError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "InternalError", msg)
            }
        };

        let body = Json(ErrorResponse {
            error: error_type.to_string(),
            message,
        });

        (status, body).into_response()
    }
}
