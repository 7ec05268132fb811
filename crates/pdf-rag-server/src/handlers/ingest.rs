use axum::{
    extract::{Multipart, State},
    Json,
};
use tracing::info;

use crate::document::extractor::PdfExtractor;
use crate::document::Page;
use crate::models::api::{IngestRequest, IngestResponse};
use crate::state::AppState;
use crate::utils::error::ApiError;

/// Ingest pre-extracted pages.
/// POST /api/ingest
pub async fn ingest_handler(
    State(state): State<AppState>,
    Json(request): Json<IngestRequest>,
) -> Result<Json<IngestResponse>, ApiError> {
    info!(
        "Ingest request: {} ({} pages)",
        request.filename,
        request.pages.len()
    );

    if request.filename.trim().is_empty() {
        return Err(ApiError::InvalidInput("filename is required".to_string()));
    }

    let pages: Vec<Page> = request
        .pages
        .into_iter()
        .enumerate()
        .map(|(i, page)| Page {
            page_number: (i + 1) as u32,
            text: page.text,
            tables: page.tables,
        })
        .collect();

    let response = state.engine.ingest(pages, &request.filename).await?;
    Ok(Json(response))
}

/// Upload a raw PDF; extraction happens server-side.
/// POST /api/upload
pub async fn upload_handler(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<IngestResponse>, ApiError> {
    let mut file_data: Option<Vec<u8>> = None;
    let mut filename: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::InvalidInput(format!("Failed to read field: {}", e)))?
    {
        let field_name = field.name().unwrap_or("").to_string();

        match field_name.as_str() {
            "file" => {
                filename = field.file_name().map(|s| s.to_string());
                file_data = Some(
                    field
                        .bytes()
                        .await
                        .map_err(|e| ApiError::InvalidInput(format!("Failed to read file: {}", e)))?
                        .to_vec(),
                );
            }
            "filename" => {
                filename = Some(
                    field
                        .text()
                        .await
                        .map_err(|e| ApiError::InvalidInput(format!("Invalid filename: {}", e)))?,
                );
            }
            _ => {}
        }
    }

    let file_data = file_data.ok_or_else(|| ApiError::InvalidInput("file required".to_string()))?;
    let filename = filename.unwrap_or_else(|| "document.pdf".to_string());

    info!("Upload request: {} ({} bytes)", filename, file_data.len());

    let pages = PdfExtractor::extract(&file_data)?;
    let response = state.engine.ingest(pages, &filename).await?;
    Ok(Json(response))
}
