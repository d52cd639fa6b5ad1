//! HTTP server assembly: router, middleware stack, and the bind/serve loop.

pub mod auth;
pub mod routes;
pub mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::HeaderValue;
use axum::Router;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::orchestrator::RagOrchestrator;
use state::AppState;

pub struct RagServer {
    config: Arc<Config>,
    state: AppState,
}

impl RagServer {
    pub fn new(orchestrator: Arc<RagOrchestrator>, config: Arc<Config>) -> Self {
        let state = AppState::new(orchestrator, config.clone());
        Self { config, state }
    }

    fn build_router(&self) -> Router {
        let origins: Vec<HeaderValue> = self
            .config
            .cors_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();
        let cors = CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(tower_http::cors::Any)
            .allow_headers(tower_http::cors::Any);

        // Axum's body-limit extractor runs before any handler, so it must
        // stay above the configured upload ceiling: otherwise an oversized
        // upload is rejected by axum's own plain-text response instead of
        // reaching `DocumentLoader::validate`, which is what produces the
        // sanitized `too_large` error body. The margin absorbs multipart
        // boundary/header overhead around the file part.
        const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;
        let body_limit_bytes = self.config.max_file_size_bytes() as usize + MULTIPART_OVERHEAD_BYTES;

        Router::new()
            .merge(routes::public_routes())
            .merge(routes::admin_routes(self.state.clone(), body_limit_bytes))
            .with_state(self.state.clone())
            .layer(TraceLayer::new_for_http())
            .layer(CompressionLayer::new())
            .layer(cors)
    }

    pub async fn start(self) -> Result<()> {
        let addr: SocketAddr = format!("{}:{}", self.config.host, self.config.port)
            .parse()
            .map_err(|e| Error::Config(format!("invalid HOST/PORT: {}", e)))?;

        let router = self.build_router();

        tracing::info!("listening on http://{}", addr);

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| Error::Config(format!("failed to bind {}: {}", addr, e)))?;

        axum::serve(listener, router)
            .await
            .map_err(|e| Error::internal(format!("server error: {}", e)))?;

        Ok(())
    }
}
