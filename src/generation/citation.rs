//! Source-list extraction: the unique, order-preserving list of filenames
//! behind a query's retrieved chunks.

use crate::vector_store::SearchResult;

/// Unique filenames in first-seen order, highest-similarity chunk first
/// since `results` is already ranked.
pub fn extract_sources(results: &[SearchResult]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut sources = Vec::new();
    for result in results {
        let filename = &result.chunk.metadata.filename;
        if seen.insert(filename.clone()) {
            sources.push(filename.clone());
        }
    }
    sources
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Chunk, ChunkMetadata, FileType};
    use chrono::Utc;

    fn hit(filename: &str, chunk_index: u32, similarity: f32) -> SearchResult {
        SearchResult {
            chunk: Chunk {
                chunk_id: format!("{filename}:{chunk_index}"),
                text: "text".into(),
                embedding: vec![],
                metadata: ChunkMetadata {
                    document_id: filename.into(),
                    filename: filename.into(),
                    file_type: FileType::Txt,
                    file_size: 10,
                    chunk_index,
                    total_chunks: 1,
                    uploaded_at: Utc::now(),
                },
            },
            similarity,
        }
    }

    #[test]
    fn dedupes_while_preserving_rank_order() {
        let results = vec![hit("a.txt", 0, 0.9), hit("b.txt", 0, 0.8), hit("a.txt", 1, 0.7)];
        assert_eq!(extract_sources(&results), vec!["a.txt", "b.txt"]);
    }
}
