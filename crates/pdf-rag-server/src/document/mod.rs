pub mod chunker;
pub mod extractor;
pub mod tokenizer;

use serde::{Deserialize, Serialize};

/// One extracted page as delivered by the PDF extractor (or the ingest
/// endpoint). The engine never persists raw pages.
#[derive(Debug, Clone)]
pub struct Page {
    pub page_number: u32,
    pub text: String,
    pub tables: Vec<TableBlock>,
}

/// A table block extracted alongside page text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableBlock {
    #[serde(default)]
    pub headers: Vec<String>,
    #[serde(default)]
    pub rows: Vec<Vec<String>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
    Prose,
    Table,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Prose => "prose",
            ContentType::Table => "table",
        }
    }
}

/// The retrievable unit: a token-bounded slice of one page.
#[derive(Debug, Clone)]
pub struct Chunk {
    pub id: String,
    pub document_id: String,
    pub page_number: u32,
    pub chunk_index: u32,
    pub content_type: ContentType,
    pub text: String,
    pub token_count: usize,
}
