//! Document ingestion endpoint: accepts one file as multipart form data.

use axum::extract::{Multipart, State};
use axum::Json;

use crate::error::{Error, Result};
use crate::server::state::AppState;
use crate::types::IngestResponse;

pub async fn ingest(State(state): State<AppState>, mut multipart: Multipart) -> Result<Json<IngestResponse>> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| Error::internal(format!("malformed multipart body: {e}")))?
    {
        let Some(filename) = field.file_name().map(|s| s.to_string()) else {
            continue;
        };
        let bytes = field
            .bytes()
            .await
            .map_err(|e| Error::internal(format!("failed to read upload body: {e}")))?;

        let document = state.orchestrator.ingest(&filename, &bytes).await?;
        return Ok(Json(IngestResponse {
            success: true,
            document,
        }));
    }

    Err(Error::internal("multipart body carried no file part"))
}
