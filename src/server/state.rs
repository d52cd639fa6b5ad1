//! Shared application state handed to every HTTP handler.

use std::sync::Arc;

use crate::config::Config;
use crate::orchestrator::RagOrchestrator;

/// Cheaply cloneable handle to the application container. Holds no
/// mutable state of its own — everything mutable lives behind the
/// orchestrator's own internally-synchronized components.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<RagOrchestrator>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(orchestrator: Arc<RagOrchestrator>, config: Arc<Config>) -> Self {
        Self { orchestrator, config }
    }
}
