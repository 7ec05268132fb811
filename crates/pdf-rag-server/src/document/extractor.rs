use lopdf::Document;
use tracing::{debug, warn};

use crate::document::Page;
use crate::utils::error::ApiError;

/// Bundled PDF extractor: bytes → ordered pages of text.
///
/// The engine only depends on the `extract(bytes) → pages` shape, so a
/// richer OCR-capable extractor can replace this without touching ingest.
/// Table blocks are not recovered from raw PDFs; callers that already have
/// structured tables submit them through the JSON ingest route.
pub struct PdfExtractor;

impl PdfExtractor {
    pub fn extract(bytes: &[u8]) -> Result<Vec<Page>, ApiError> {
        let doc = Document::load_mem(bytes)
            .map_err(|e| ApiError::InvalidInput(format!("Not a readable PDF: {}", e)))?;

        let page_ids = doc.get_pages();
        if page_ids.is_empty() {
            return Err(ApiError::InvalidInput("PDF contains no pages".to_string()));
        }

        let mut pages = Vec::with_capacity(page_ids.len());
        for (&page_number, _) in &page_ids {
            let text = match doc.extract_text(&[page_number]) {
                Ok(text) => text,
                Err(e) => {
                    warn!("Text extraction failed for page {}: {}", page_number, e);
                    String::new()
                }
            };
            pages.push(Page {
                page_number,
                text,
                tables: Vec::new(),
            });
        }

        debug!("Extracted {} pages from PDF", pages.len());
        Ok(pages)
    }
}
