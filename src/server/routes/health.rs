//! Liveness/readiness probe.

use axum::extract::State;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::server::state::AppState;

#[derive(Debug, Serialize)]
struct ServiceStatus {
    llm: &'static str,
    vector_store: &'static str,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    timestamp: DateTime<Utc>,
    services: ServiceStatus,
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let (llm_ok, vector_store_ok) = state.orchestrator.health().await;
    Json(HealthResponse {
        status: if llm_ok && vector_store_ok { "healthy" } else { "degraded" },
        version: env!("CARGO_PKG_VERSION"),
        timestamp: Utc::now(),
        services: ServiceStatus {
            llm: if llm_ok { "connected" } else { "disconnected" },
            vector_store: if vector_store_ok { "connected" } else { "disconnected" },
        },
    })
}
