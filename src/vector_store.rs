//! Persistent chunk storage and cosine-similarity search.
//!
//! Backed by an embedded key-value database rather than a separate vector
//! database service: at the corpus's target scale (single-tenant, personal
//! or team-sized document collections) brute-force cosine scoring over all
//! stored chunks is fast enough, and it avoids taking on an external
//! process dependency just to hold vectors.

use std::path::Path;
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use redb::{Database, ReadableTable, TableDefinition};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::{Chunk, DocumentSummary, StatsResponse};

const CHUNKS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("chunks");
const DOC_INDEX_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("doc_chunk_ids");
const HEADER_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("header");
const HEADER_KEY: &str = "header";

#[derive(Debug, Serialize, Deserialize)]
struct CollectionHeader {
    embedding_model: String,
    dimension: usize,
    created_at: DateTime<Utc>,
}

/// A scored search hit.
#[derive(Debug, Clone)]
pub struct SearchResult {
    pub chunk: Chunk,
    pub similarity: f32,
}

/// Embedded, persistent store of chunks with document-scoped replace and
/// cosine-similarity search. A `document_id -> [chunk_id]` index is kept
/// alongside the chunk table so delete and re-ingest don't require a full
/// table scan.
pub struct VectorStore {
    db: Database,
    embedding_model: String,
    // Guards the read-modify-write sequence in `upsert`/`delete_document`;
    // redb serializes writers internally, but the index update and the
    // chunk table update must appear atomic to concurrent readers.
    write_lock: RwLock<()>,
}

impl VectorStore {
    /// Open (creating if absent) the store at `path`. The embedding model
    /// identity is written to a header record the first time the store is
    /// opened; every later open checks it, so a configuration change that
    /// points at a different embedding model is caught at startup rather
    /// than silently corrupting search quality.
    pub fn open(path: &Path, embedding_model: &str, dimension: usize) -> Result<Self> {
        let db = Database::create(path).map_err(|e| Error::vector_store(e.to_string()))?;

        let write_txn = db.begin_write().map_err(|e| Error::vector_store(e.to_string()))?;
        {
            let mut header_table = write_txn
                .open_table(HEADER_TABLE)
                .map_err(|e| Error::vector_store(e.to_string()))?;

            match header_table
                .get(HEADER_KEY)
                .map_err(|e| Error::vector_store(e.to_string()))?
            {
                Some(existing) => {
                    let header: CollectionHeader = serde_json::from_slice(existing.value())?;
                    if header.embedding_model != embedding_model || header.dimension != dimension {
                        return Err(Error::EmbeddingModelMismatch {
                            stored: header.embedding_model,
                            configured: embedding_model.to_string(),
                        });
                    }
                }
                None => {
                    let header = CollectionHeader {
                        embedding_model: embedding_model.to_string(),
                        dimension,
                        created_at: Utc::now(),
                    };
                    let bytes = serde_json::to_vec(&header)?;
                    header_table
                        .insert(HEADER_KEY, bytes.as_slice())
                        .map_err(|e| Error::vector_store(e.to_string()))?;
                }
            }

            // Ensure the other tables exist even before the first insert,
            // so `list_documents`/`stats` on a fresh store don't error.
            write_txn
                .open_table(CHUNKS_TABLE)
                .map_err(|e| Error::vector_store(e.to_string()))?;
            write_txn
                .open_table(DOC_INDEX_TABLE)
                .map_err(|e| Error::vector_store(e.to_string()))?;
        }
        write_txn.commit().map_err(|e| Error::vector_store(e.to_string()))?;

        Ok(Self {
            db,
            embedding_model: embedding_model.to_string(),
            write_lock: RwLock::new(()),
        })
    }

    /// Replace all chunks belonging to `document_id` with `chunks`. Chunks
    /// must already carry their final `chunk_id`/`metadata`.
    pub fn upsert(&self, document_id: &str, chunks: &[Chunk]) -> Result<()> {
        let _guard = self.write_lock.write().unwrap();
        let write_txn = self.db.begin_write().map_err(|e| Error::vector_store(e.to_string()))?;
        {
            let mut chunks_table = write_txn
                .open_table(CHUNKS_TABLE)
                .map_err(|e| Error::vector_store(e.to_string()))?;
            let mut doc_index = write_txn
                .open_table(DOC_INDEX_TABLE)
                .map_err(|e| Error::vector_store(e.to_string()))?;

            if let Some(existing) = doc_index
                .get(document_id)
                .map_err(|e| Error::vector_store(e.to_string()))?
            {
                let old_ids: Vec<String> = serde_json::from_slice(existing.value())?;
                drop(existing);
                for chunk_id in &old_ids {
                    chunks_table
                        .remove(chunk_id.as_str())
                        .map_err(|e| Error::vector_store(e.to_string()))?;
                }
            }

            let mut new_ids = Vec::with_capacity(chunks.len());
            for chunk in chunks {
                let bytes = serde_json::to_vec(chunk)?;
                chunks_table
                    .insert(chunk.chunk_id.as_str(), bytes.as_slice())
                    .map_err(|e| Error::vector_store(e.to_string()))?;
                new_ids.push(chunk.chunk_id.clone());
            }

            let index_bytes = serde_json::to_vec(&new_ids)?;
            doc_index
                .insert(document_id, index_bytes.as_slice())
                .map_err(|e| Error::vector_store(e.to_string()))?;
        }
        write_txn.commit().map_err(|e| Error::vector_store(e.to_string()))?;
        Ok(())
    }

    /// Delete every chunk belonging to `document_id`. Returns the number of
    /// chunks removed (0 if the document did not exist — callers that need
    /// to distinguish "not found" map that themselves).
    pub fn delete_document(&self, document_id: &str) -> Result<usize> {
        let _guard = self.write_lock.write().unwrap();
        let write_txn = self.db.begin_write().map_err(|e| Error::vector_store(e.to_string()))?;
        let removed;
        {
            let mut chunks_table = write_txn
                .open_table(CHUNKS_TABLE)
                .map_err(|e| Error::vector_store(e.to_string()))?;
            let mut doc_index = write_txn
                .open_table(DOC_INDEX_TABLE)
                .map_err(|e| Error::vector_store(e.to_string()))?;

            let chunk_ids: Vec<String> = match doc_index
                .get(document_id)
                .map_err(|e| Error::vector_store(e.to_string()))?
            {
                Some(existing) => serde_json::from_slice(existing.value())?,
                None => Vec::new(),
            };

            for chunk_id in &chunk_ids {
                chunks_table
                    .remove(chunk_id.as_str())
                    .map_err(|e| Error::vector_store(e.to_string()))?;
            }
            doc_index
                .remove(document_id)
                .map_err(|e| Error::vector_store(e.to_string()))?;
            removed = chunk_ids.len();
        }
        write_txn.commit().map_err(|e| Error::vector_store(e.to_string()))?;
        Ok(removed)
    }

    /// Top-`k` chunks by cosine similarity to `embedding`. Ties are broken
    /// lexicographically by `chunk_id` so results are deterministic across
    /// runs and across stores with identical content.
    pub fn query(&self, embedding: &[f32], k: usize) -> Result<Vec<SearchResult>> {
        let read_txn = self.db.begin_read().map_err(|e| Error::vector_store(e.to_string()))?;
        let chunks_table = read_txn
            .open_table(CHUNKS_TABLE)
            .map_err(|e| Error::vector_store(e.to_string()))?;

        let mut scored: Vec<SearchResult> = Vec::new();
        for entry in chunks_table.iter().map_err(|e| Error::vector_store(e.to_string()))? {
            let (_, value) = entry.map_err(|e| Error::vector_store(e.to_string()))?;
            let chunk: Chunk = serde_json::from_slice(value.value())?;
            let similarity = cosine_similarity(embedding, &chunk.embedding);
            scored.push(SearchResult { chunk, similarity });
        }

        scored.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.chunk.chunk_id.cmp(&b.chunk.chunk_id))
        });
        scored.truncate(k);
        Ok(scored)
    }

    /// One summary per distinct document, newest upload first.
    pub fn list_documents(&self) -> Result<Vec<DocumentSummary>> {
        let read_txn = self.db.begin_read().map_err(|e| Error::vector_store(e.to_string()))?;
        let doc_index = read_txn
            .open_table(DOC_INDEX_TABLE)
            .map_err(|e| Error::vector_store(e.to_string()))?;
        let chunks_table = read_txn
            .open_table(CHUNKS_TABLE)
            .map_err(|e| Error::vector_store(e.to_string()))?;

        let mut summaries = Vec::new();
        for entry in doc_index.iter().map_err(|e| Error::vector_store(e.to_string()))? {
            let (document_id, chunk_ids) = entry.map_err(|e| Error::vector_store(e.to_string()))?;
            let chunk_ids: Vec<String> = serde_json::from_slice(chunk_ids.value())?;
            let Some(first_id) = chunk_ids.first() else {
                continue;
            };
            let Some(raw) = chunks_table
                .get(first_id.as_str())
                .map_err(|e| Error::vector_store(e.to_string()))?
            else {
                continue;
            };
            let chunk: Chunk = serde_json::from_slice(raw.value())?;
            summaries.push(DocumentSummary {
                document_id: document_id.value().to_string(),
                filename: chunk.metadata.filename,
                file_type: chunk.metadata.file_type,
                file_size: chunk.metadata.file_size,
                chunk_count: chunk.metadata.total_chunks,
                uploaded_at: chunk.metadata.uploaded_at,
            });
        }

        summaries.sort_by(|a, b| b.uploaded_at.cmp(&a.uploaded_at));
        Ok(summaries)
    }

    pub fn stats(&self) -> Result<StatsResponse> {
        let read_txn = self.db.begin_read().map_err(|e| Error::vector_store(e.to_string()))?;
        let doc_index = read_txn
            .open_table(DOC_INDEX_TABLE)
            .map_err(|e| Error::vector_store(e.to_string()))?;
        let chunks_table = read_txn
            .open_table(CHUNKS_TABLE)
            .map_err(|e| Error::vector_store(e.to_string()))?;

        Ok(StatsResponse {
            total_documents: doc_index.len().map_err(|e| Error::vector_store(e.to_string()))?,
            total_chunks: chunks_table.len().map_err(|e| Error::vector_store(e.to_string()))?,
            embedding_model: self.embedding_model.clone(),
        })
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ChunkMetadata, FileType};
    use chrono::Utc;

    fn chunk(document_id: &str, ordinal: u32, embedding: Vec<f32>) -> Chunk {
        Chunk {
            chunk_id: Chunk::id_for(document_id, ordinal),
            text: format!("chunk {ordinal} of {document_id}"),
            embedding,
            metadata: ChunkMetadata {
                document_id: document_id.to_string(),
                filename: format!("{document_id}.txt"),
                file_type: FileType::Txt,
                file_size: 100,
                chunk_index: ordinal,
                total_chunks: ordinal + 1,
                uploaded_at: Utc::now(),
            },
        }
    }

    fn open_store(dir: &tempfile::TempDir, dimension: usize) -> VectorStore {
        VectorStore::open(&dir.path().join("store.redb"), "nomic-embed-text", dimension).unwrap()
    }

    #[test]
    fn query_ranks_by_cosine_similarity_with_lexicographic_tiebreak() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir, 3);

        store
            .upsert(
                "doc-a",
                &[
                    chunk("doc-a", 0, vec![1.0, 0.0, 0.0]),
                    chunk("doc-a", 1, vec![0.0, 1.0, 0.0]),
                ],
            )
            .unwrap();

        let hits = store.query(&[1.0, 0.0, 0.0], 2).unwrap();
        assert_eq!(hits[0].chunk.chunk_id, "doc-a:0");
        assert!(hits[0].similarity > hits[1].similarity);
    }

    #[test]
    fn upsert_replaces_prior_chunks_for_the_same_document() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir, 3);

        store
            .upsert("doc-a", &[chunk("doc-a", 0, vec![1.0, 0.0, 0.0])])
            .unwrap();
        store
            .upsert("doc-a", &[chunk("doc-a", 0, vec![0.0, 1.0, 0.0])])
            .unwrap();

        let stats = store.stats().unwrap();
        assert_eq!(stats.total_chunks, 1);
    }

    #[test]
    fn delete_document_removes_its_chunks_and_reports_count() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir, 3);

        store
            .upsert(
                "doc-a",
                &[
                    chunk("doc-a", 0, vec![1.0, 0.0, 0.0]),
                    chunk("doc-a", 1, vec![0.0, 1.0, 0.0]),
                ],
            )
            .unwrap();

        let removed = store.delete_document("doc-a").unwrap();
        assert_eq!(removed, 2);
        assert_eq!(store.stats().unwrap().total_chunks, 0);
    }

    #[test]
    fn reopening_with_a_different_embedding_model_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.redb");
        {
            let _store = VectorStore::open(&path, "nomic-embed-text", 768).unwrap();
        }
        let err = VectorStore::open(&path, "other-model", 768).unwrap_err();
        assert!(matches!(err, Error::EmbeddingModelMismatch { .. }));
    }

    #[test]
    fn list_documents_sorts_newest_first() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir, 3);

        let mut older = chunk("doc-old", 0, vec![1.0, 0.0, 0.0]);
        older.metadata.uploaded_at = Utc::now() - chrono::Duration::days(1);
        store.upsert("doc-old", &[older]).unwrap();
        store
            .upsert("doc-new", &[chunk("doc-new", 0, vec![0.0, 1.0, 0.0])])
            .unwrap();

        let docs = store.list_documents().unwrap();
        assert_eq!(docs[0].document_id, "doc-new");
        assert_eq!(docs[1].document_id, "doc-old");
    }
}
