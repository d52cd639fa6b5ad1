//! Response types for the HTTP surface

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::document::FileType;

/// Summary returned from ingestion and from `GET /admin/documents`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentSummary {
    pub document_id: String,
    pub filename: String,
    pub file_type: FileType,
    pub file_size: u64,
    pub chunk_count: u32,
    pub uploaded_at: DateTime<Utc>,
}

/// Body of `POST /ingest`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestResponse {
    pub success: bool,
    pub document: DocumentSummary,
}

/// Body of `POST /chat`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResponse {
    pub response: String,
    pub sources: Vec<String>,
}

/// Body of `GET /admin/stats`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsResponse {
    pub total_documents: u64,
    pub total_chunks: u64,
    pub embedding_model: String,
}
