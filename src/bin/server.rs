//! corpus-rag server binary.

use std::sync::Arc;

use corpus_rag::config::Config;
use corpus_rag::providers::{EmbeddingService, OllamaEmbedder, OllamaLlmClient};
use corpus_rag::server::RagServer;
use corpus_rag::vector_store::VectorStore;
use corpus_rag::RagOrchestrator;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "corpus_rag=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Arc::new(Config::from_env()?);
    tracing::info!(
        llm_model = %config.llm_model,
        embedding_model = %config.embedding_model,
        chunk_size = config.chunk_size,
        "configuration loaded"
    );

    std::fs::create_dir_all(&config.vector_store_dir)?;
    std::fs::create_dir_all(&config.upload_dir)?;

    let embedder = OllamaEmbedder::new(
        config.llm_base_url.clone(),
        config.embedding_model.clone(),
        config.embedding_dimension,
        config.request_timeout,
    );
    let embeddings = Arc::new(EmbeddingService::new(Arc::new(embedder)));

    let store_path = config.vector_store_dir.join(format!("{}.redb", config.collection_name));
    let vector_store = Arc::new(VectorStore::open(
        &store_path,
        &config.embedding_model,
        config.embedding_dimension,
    )?);

    let llm = Arc::new(OllamaLlmClient::new(
        config.llm_base_url.clone(),
        config.request_timeout,
        config.inter_chunk_timeout,
    ));

    let orchestrator = Arc::new(RagOrchestrator::new(
        embeddings,
        vector_store,
        llm,
        config.clone(),
    ));

    tracing::info!("warming up embedding service and model daemon...");
    orchestrator.warm_up().await?;
    tracing::info!("ready");

    let server = RagServer::new(orchestrator, config);
    server.start().await?;

    Ok(())
}
