//! Admin document management: list, delete, and store-wide statistics.
//! These routes sit behind the admin-auth middleware layered in
//! `server::mod`.

use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;

use crate::error::Result;
use crate::server::state::AppState;
use crate::types::{DocumentSummary, StatsResponse};

#[derive(Debug, Serialize)]
pub struct DocumentListResponse {
    documents: Vec<DocumentSummary>,
    total_count: usize,
}

pub async fn list_documents(State(state): State<AppState>) -> Result<Json<DocumentListResponse>> {
    let documents = state.orchestrator.list_documents()?;
    let total_count = documents.len();
    Ok(Json(DocumentListResponse { documents, total_count }))
}

#[derive(Debug, Serialize)]
pub struct DeleteDocumentResponse {
    success: bool,
    deleted_chunks: usize,
    message: String,
}

pub async fn delete_document(
    State(state): State<AppState>,
    Path(document_id): Path<String>,
) -> Result<Json<DeleteDocumentResponse>> {
    let result = state.orchestrator.delete_document(&document_id)?;
    let message = if result.deleted_chunks > 0 {
        format!(
            "deleted {} chunks for document {}",
            result.deleted_chunks, document_id
        )
    } else {
        format!("document {} had no chunks to delete", document_id)
    };

    Ok(Json(DeleteDocumentResponse {
        success: true,
        deleted_chunks: result.deleted_chunks,
        message,
    }))
}

pub async fn stats(State(state): State<AppState>) -> Result<Json<StatsResponse>> {
    Ok(Json(state.orchestrator.stats()?))
}
