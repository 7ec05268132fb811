use sqlx::FromRow;

/// Raw chunk row as stored; the embedding travels as a little-endian f32
/// BLOB so the file stays portable across platforms.
#[derive(Debug, Clone, FromRow)]
pub struct ChunkRow {
    pub chunk_id: String,
    pub document_id: String,
    pub chunk_index: i64,
    pub page_number: i64,
    pub content_type: String,
    pub content: String,
    pub token_count: i64,
    pub embedding: Vec<u8>,
}

/// A retrieved chunk with its similarity score attached.
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    pub chunk_id: String,
    pub document_id: String,
    pub chunk_index: u32,
    pub page_number: u32,
    pub content_type: String,
    pub content: String,
    pub similarity: f32,
}

pub fn embedding_to_blob(vector: &[f32]) -> Vec<u8> {
    let mut blob = Vec::with_capacity(vector.len() * 4);
    for value in vector {
        blob.extend_from_slice(&value.to_le_bytes());
    }
    blob
}

pub fn embedding_from_blob(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|bytes| f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedding_blob_round_trip() {
        let vector = vec![0.0f32, -1.5, 3.25, f32::MIN_POSITIVE];
        let blob = embedding_to_blob(&vector);
        assert_eq!(blob.len(), 16);
        assert_eq!(embedding_from_blob(&blob), vector);
    }

    #[test]
    fn truncated_blob_drops_partial_floats() {
        let blob = embedding_to_blob(&[1.0, 2.0]);
        assert_eq!(embedding_from_blob(&blob[..6]), vec![1.0]);
    }
}
