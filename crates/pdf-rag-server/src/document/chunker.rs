use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::ChunkingConfig;
use crate::document::tokenizer::TokenCounter;
use crate::document::{Chunk, ContentType, Page, TableBlock};

/// Splits pages into ordered, token-bounded chunks.
///
/// Prose chunks stay within [min_tokens, max_tokens] except the final chunk
/// of a page, prefer closing on paragraph then sentence boundaries, and
/// share `overlap_tokens` of tail text with their successor on the same
/// page. Table blocks become their own chunks and never overlap.
pub struct Chunker {
    config: ChunkingConfig,
    counter: Arc<dyn TokenCounter>,
}

/// A sentence-or-smaller piece of page text awaiting packing.
struct Unit {
    text: String,
    ends_paragraph: bool,
}

impl Chunker {
    pub fn new(mut config: ChunkingConfig, counter: Arc<dyn TokenCounter>) -> Self {
        // Overlap at or above the floor would re-queue forever.
        config.overlap_tokens = config.overlap_tokens.min(config.min_tokens / 2);
        Self { config, counter }
    }

    /// Chunk a whole document. Empty input yields zero chunks; a page with
    /// no extractable content is skipped with a warning.
    pub fn chunk_document(&self, document_id: &str, pages: &[Page]) -> Vec<Chunk> {
        let mut chunks = Vec::new();
        let mut next_index = 0u32;

        for page in pages {
            let has_text = !page.text.trim().is_empty();
            if !has_text && page.tables.is_empty() {
                warn!("Page {} has no extractable content, skipping", page.page_number);
                continue;
            }

            if has_text {
                for (text, tokens) in self.split_page_text(&page.text) {
                    chunks.push(self.make_chunk(
                        document_id,
                        page.page_number,
                        &mut next_index,
                        ContentType::Prose,
                        text,
                        tokens,
                    ));
                }
            }

            for table in &page.tables {
                for (text, tokens) in self.split_table(table) {
                    chunks.push(self.make_chunk(
                        document_id,
                        page.page_number,
                        &mut next_index,
                        ContentType::Table,
                        text,
                        tokens,
                    ));
                }
            }
        }

        debug!("Chunked {} pages into {} chunks", pages.len(), chunks.len());
        chunks
    }

    fn make_chunk(
        &self,
        document_id: &str,
        page_number: u32,
        next_index: &mut u32,
        content_type: ContentType,
        text: String,
        token_count: usize,
    ) -> Chunk {
        let chunk = Chunk {
            id: Uuid::new_v4().to_string(),
            document_id: document_id.to_string(),
            page_number,
            chunk_index: *next_index,
            content_type,
            text,
            token_count,
        };
        *next_index += 1;
        chunk
    }

    /// Pack one page of prose into bounded chunks.
    fn split_page_text(&self, text: &str) -> Vec<(String, usize)> {
        let mut queue: VecDeque<Unit> = self.units(text);
        let mut out: Vec<(String, usize)> = Vec::new();
        let mut cur = String::new();
        let mut cur_tokens = 0usize;

        while let Some(unit) = queue.pop_front() {
            let candidate = join(&cur, &unit.text);
            let candidate_tokens = self.counter.count(&candidate);

            if cur.is_empty() || candidate_tokens <= self.config.max_tokens {
                let ends_paragraph = unit.ends_paragraph;
                cur = candidate;
                cur_tokens = candidate_tokens;

                // Prefer a paragraph boundary once the target is reached.
                if cur_tokens >= self.config.target_tokens && ends_paragraph {
                    self.close_chunk(&mut out, &mut cur, &mut cur_tokens, !queue.is_empty());
                }
                continue;
            }

            // Unit does not fit. Close here if the chunk is already legal,
            // otherwise borrow words from the unit to reach the floor.
            if cur_tokens >= self.config.min_tokens {
                queue.push_front(unit);
            } else {
                let leftover = self.fill_to_floor(&mut cur, &mut cur_tokens, unit);
                if let Some(rest) = leftover {
                    queue.push_front(rest);
                }
            }
            self.close_chunk(&mut out, &mut cur, &mut cur_tokens, !queue.is_empty());
        }

        if !cur.trim().is_empty() {
            out.push((cur, cur_tokens));
        }

        out
    }

    fn close_chunk(
        &self,
        out: &mut Vec<(String, usize)>,
        cur: &mut String,
        cur_tokens: &mut usize,
        more_to_come: bool,
    ) {
        if cur.trim().is_empty() {
            return;
        }
        let closed = std::mem::take(cur);
        out.push((closed.clone(), *cur_tokens));
        *cur_tokens = 0;

        if more_to_come && self.config.overlap_tokens > 0 {
            let tail = self.overlap_tail(&closed);
            *cur_tokens = self.counter.count(&tail);
            *cur = tail;
        }
    }

    /// Move whole words from `unit` into `cur` until the floor is met.
    /// Returns the unconsumed remainder, if any.
    fn fill_to_floor(&self, cur: &mut String, cur_tokens: &mut usize, unit: Unit) -> Option<Unit> {
        let words: Vec<&str> = unit.text.split_whitespace().collect();
        let mut taken = 0usize;

        for word in &words {
            if *cur_tokens >= self.config.min_tokens {
                break;
            }
            let candidate = join(cur, word);
            let candidate_tokens = self.counter.count(&candidate);
            if candidate_tokens > self.config.max_tokens {
                break;
            }
            *cur = candidate;
            *cur_tokens = candidate_tokens;
            taken += 1;
        }

        if taken == words.len() {
            return None;
        }
        Some(Unit {
            text: words[taken..].join(" "),
            ends_paragraph: unit.ends_paragraph,
        })
    }

    /// Last words of `text` amounting to roughly `overlap_tokens` tokens.
    fn overlap_tail(&self, text: &str) -> String {
        let words: Vec<&str> = text.split_whitespace().collect();
        let mut tail_words: VecDeque<&str> = VecDeque::new();

        for word in words.iter().rev() {
            tail_words.push_front(word);
            let tail: Vec<&str> = tail_words.iter().copied().collect();
            if self.counter.count(&tail.join(" ")) >= self.config.overlap_tokens {
                break;
            }
        }

        tail_words.into_iter().collect::<Vec<_>>().join(" ")
    }

    /// Decompose page text into sentence units, each within max_tokens.
    fn units(&self, text: &str) -> VecDeque<Unit> {
        let mut units = VecDeque::new();

        for paragraph in split_paragraphs(text) {
            let sentences = split_sentences(paragraph);
            let last = sentences.len().saturating_sub(1);
            for (i, sentence) in sentences.into_iter().enumerate() {
                let tokens = self.counter.count(&sentence);
                let ends_paragraph = i == last;
                if tokens <= self.config.max_tokens {
                    units.push_back(Unit {
                        text: sentence,
                        ends_paragraph,
                    });
                } else {
                    // Whitespace-level hard cut; a token is never split.
                    let pieces = self.pack_words(&sentence);
                    let last_piece = pieces.len().saturating_sub(1);
                    for (j, (text, _tokens)) in pieces.into_iter().enumerate() {
                        units.push_back(Unit {
                            text,
                            ends_paragraph: ends_paragraph && j == last_piece,
                        });
                    }
                }
            }
        }

        units
    }

    /// Greedily pack words of an oversized sentence into max_tokens pieces.
    fn pack_words(&self, sentence: &str) -> Vec<(String, usize)> {
        let mut pieces = Vec::new();
        let mut cur = String::new();
        let mut cur_tokens = 0usize;

        for word in sentence.split_whitespace() {
            let candidate = join(&cur, word);
            let candidate_tokens = self.counter.count(&candidate);
            if !cur.is_empty() && candidate_tokens > self.config.max_tokens {
                pieces.push((std::mem::take(&mut cur), cur_tokens));
                cur = word.to_string();
                cur_tokens = self.counter.count(word);
            } else {
                cur = candidate;
                cur_tokens = candidate_tokens;
            }
        }
        if !cur.is_empty() {
            pieces.push((cur, cur_tokens));
        }

        pieces
    }

    /// Serialize a table block: pipe-delimited header row plus data rows.
    /// Kept whole when it fits, otherwise split on row boundaries with the
    /// header repeated per piece.
    fn split_table(&self, table: &TableBlock) -> Vec<(String, usize)> {
        let header_line = table.headers.join(" | ");
        let whole = serialize_rows(&header_line, &table.rows);
        let whole_tokens = self.counter.count(&whole);
        if whole_tokens <= self.config.max_tokens {
            if whole.trim().is_empty() {
                return Vec::new();
            }
            return vec![(whole, whole_tokens)];
        }

        let mut pieces = Vec::new();
        let mut rows: Vec<Vec<String>> = Vec::new();

        for row in &table.rows {
            let single = serialize_rows(&header_line, std::slice::from_ref(row));
            if self.counter.count(&single) > self.config.max_tokens {
                // One row alone busts the ceiling: flush what we have and
                // fall back to a whitespace hard cut, as for prose.
                if !rows.is_empty() {
                    let text = serialize_rows(&header_line, &rows);
                    let tokens = self.counter.count(&text);
                    pieces.push((text, tokens));
                    rows.clear();
                }
                pieces.extend(self.pack_words(&single));
                continue;
            }

            rows.push(row.clone());
            let text = serialize_rows(&header_line, &rows);
            if self.counter.count(&text) > self.config.max_tokens && rows.len() > 1 {
                rows.pop();
                let text = serialize_rows(&header_line, &rows);
                let tokens = self.counter.count(&text);
                pieces.push((text, tokens));
                rows = vec![row.clone()];
            }
        }
        if !rows.is_empty() {
            let text = serialize_rows(&header_line, &rows);
            let tokens = self.counter.count(&text);
            pieces.push((text, tokens));
        }

        pieces
    }
}

fn join(cur: &str, next: &str) -> String {
    if cur.is_empty() {
        next.to_string()
    } else {
        format!("{} {}", cur, next)
    }
}

fn serialize_rows(header_line: &str, rows: &[Vec<String>]) -> String {
    let mut lines = Vec::with_capacity(rows.len() + 1);
    if !header_line.is_empty() {
        lines.push(header_line.to_string());
    }
    for row in rows {
        lines.push(row.join(" | "));
    }
    lines.join("\n")
}

fn split_paragraphs(text: &str) -> Vec<&str> {
    text.split("\n\n")
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect()
}

/// Sentence boundaries: terminal punctuation followed by whitespace, or a
/// line break.
fn split_sentences(paragraph: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut cur = String::new();
    let mut chars = paragraph.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '\n' {
            if !cur.trim().is_empty() {
                sentences.push(cur.trim().to_string());
            }
            cur = String::new();
            continue;
        }
        cur.push(ch);
        if matches!(ch, '.' | '!' | '?') {
            let boundary = chars.peek().map(|c| c.is_whitespace()).unwrap_or(true);
            if boundary && !cur.trim().is_empty() {
                sentences.push(cur.trim().to_string());
                cur = String::new();
            }
        }
    }
    if !cur.trim().is_empty() {
        sentences.push(cur.trim().to_string());
    }

    sentences
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::tokenizer::HeuristicCounter;

    fn chunker(target: usize, min: usize, max: usize, overlap: usize) -> Chunker {
        Chunker::new(
            ChunkingConfig {
                target_tokens: target,
                min_tokens: min,
                max_tokens: max,
                overlap_tokens: overlap,
            },
            Arc::new(HeuristicCounter),
        )
    }

    fn page(number: u32, text: &str) -> Page {
        Page {
            page_number: number,
            text: text.to_string(),
            tables: Vec::new(),
        }
    }

    fn long_text(sentences: usize) -> String {
        (0..sentences)
            .map(|i| format!("Sentence number {} carries a handful of ordinary words.", i))
            .collect::<Vec<_>>()
            .join(" ")
    }

    #[test]
    fn empty_input_yields_zero_chunks() {
        let c = chunker(40, 25, 60, 8);
        assert!(c.chunk_document("doc", &[]).is_empty());
    }

    #[test]
    fn blank_page_is_skipped() {
        let c = chunker(40, 25, 60, 8);
        let pages = vec![page(1, "   \n "), page(2, &long_text(3))];
        let chunks = c.chunk_document("doc", &pages);
        assert!(!chunks.is_empty());
        assert!(chunks.iter().all(|ch| ch.page_number == 2));
    }

    #[test]
    fn chunk_token_counts_stay_within_bounds() {
        let c = chunker(40, 25, 60, 8);
        let chunks = c.chunk_document("doc", &[page(1, &long_text(30))]);
        assert!(chunks.len() > 1);

        let counter = HeuristicCounter;
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.token_count, counter.count(&chunk.text));
            assert!(chunk.token_count <= 60, "chunk {} over ceiling", i);
            if i + 1 < chunks.len() {
                assert!(chunk.token_count >= 25, "chunk {} under floor", i);
            }
        }
    }

    #[test]
    fn consecutive_prose_chunks_overlap() {
        let c = chunker(40, 25, 60, 8);
        let chunks = c.chunk_document("doc", &[page(1, &long_text(30))]);
        assert!(chunks.len() > 1);

        for pair in chunks.windows(2) {
            let prev_words: Vec<&str> = pair[0].text.split_whitespace().collect();
            let next_first = pair[1].text.split_whitespace().next().unwrap();
            assert!(
                prev_words.contains(&next_first),
                "no shared overlap between consecutive chunks"
            );
        }
    }

    #[test]
    fn chunk_indices_are_sequential() {
        let c = chunker(40, 25, 60, 8);
        let pages = vec![page(1, &long_text(12)), page(2, &long_text(12))];
        let chunks = c.chunk_document("doc", &pages);
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.chunk_index, i as u32);
            assert_eq!(chunk.document_id, "doc");
        }
    }

    #[test]
    fn small_table_is_one_whole_chunk() {
        let c = chunker(40, 25, 60, 8);
        let table = TableBlock {
            headers: vec!["Account".into(), "Debit".into(), "Credit".into()],
            rows: vec![
                vec!["Cash".into(), "100".into(), "0".into()],
                vec!["Revenue".into(), "0".into(), "100".into()],
            ],
        };
        let pages = vec![Page {
            page_number: 1,
            text: String::new(),
            tables: vec![table],
        }];
        let chunks = c.chunk_document("doc", &pages);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].content_type, ContentType::Table);
        assert_eq!(
            chunks[0].text,
            "Account | Debit | Credit\nCash | 100 | 0\nRevenue | 0 | 100"
        );
    }

    #[test]
    fn giant_single_row_is_hard_split_within_ceiling() {
        let c = chunker(40, 25, 60, 8);
        let giant_cell = (0..120)
            .map(|i| format!("word{}", i))
            .collect::<Vec<_>>()
            .join(" ");
        let table = TableBlock {
            headers: vec!["Name".into(), "Description".into()],
            rows: vec![
                vec!["Everything".into(), giant_cell],
                vec!["Cash".into(), "100".into()],
            ],
        };
        let pages = vec![Page {
            page_number: 1,
            text: String::new(),
            tables: vec![table],
        }];
        let chunks = c.chunk_document("doc", &pages);
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.token_count <= 60, "table chunk over ceiling");
            assert_eq!(chunk.content_type, ContentType::Table);
        }
    }

    #[test]
    fn oversized_table_splits_on_row_boundaries() {
        let c = chunker(40, 25, 60, 8);
        let rows: Vec<Vec<String>> = (0..40)
            .map(|i| vec![format!("Account line item {}", i), format!("{}", i * 10)])
            .collect();
        let table = TableBlock {
            headers: vec!["Account".into(), "Balance".into()],
            rows,
        };
        let pages = vec![Page {
            page_number: 1,
            text: String::new(),
            tables: vec![table],
        }];
        let chunks = c.chunk_document("doc", &pages);
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.text.starts_with("Account | Balance\n"));
            assert!(chunk.token_count <= 60);
            assert_eq!(chunk.content_type, ContentType::Table);
        }
    }
}
