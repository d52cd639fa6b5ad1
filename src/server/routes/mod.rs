//! HTTP route registration.

pub mod admin;
pub mod chat;
pub mod health;
pub mod ingest;

use axum::extract::DefaultBodyLimit;
use axum::middleware;
use axum::routing::{delete, get, post};
use axum::Router;

use crate::server::auth::require_admin;
use crate::server::state::AppState;

/// Routes with no auth requirement.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .route("/chat", post(chat::chat))
        .route("/chat/stream", post(chat::chat_stream))
}

/// Routes gated by the `X-Admin-Key` middleware.
pub fn admin_routes(state: AppState, max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .route(
            "/ingest",
            post(ingest::ingest).layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
        .route("/admin/documents", get(admin::list_documents))
        .route("/admin/documents/:document_id", delete(admin::delete_document))
        .route("/admin/stats", get(admin::stats))
        .layer(middleware::from_fn_with_state(state, require_admin))
}
