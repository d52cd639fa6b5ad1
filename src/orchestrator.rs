//! The central component: owns ingestion, query answering, and admin
//! operations. The only component the HTTP layer talks to.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures_util::{Stream, StreamExt};
use tracing::{error, info, warn};

use crate::chunking::chunk_text;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::generation::{extract_sources, PromptBuilder};
use crate::providers::{EmbeddingService, GenerationOptions, LlmClient};
use crate::types::{Chunk, ChunkMetadata, ChatMessage, DocumentSummary, StatsResponse};
use crate::vector_store::VectorStore;

/// Result of a delete operation, per the admin API contract.
#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct DeleteResult {
    pub deleted_chunks: usize,
}

/// One event of an in-progress answer stream.
pub enum AnswerEvent {
    Token(String),
    Done { sources: Vec<String> },
}

pub type AnswerStream = std::pin::Pin<Box<dyn Stream<Item = Result<AnswerEvent>> + Send>>;

/// Owns references to the embedding service, vector store, and LLM client,
/// plus the active configuration. Constructed once at startup and shared
/// behind an `Arc` — this is the application container the HTTP layer's
/// handlers close over, replacing the module-level singletons of the
/// system this component is descended from.
pub struct RagOrchestrator {
    embeddings: Arc<EmbeddingService>,
    vector_store: Arc<VectorStore>,
    llm: Arc<dyn LlmClient>,
    config: Arc<Config>,
}

impl RagOrchestrator {
    pub fn new(
        embeddings: Arc<EmbeddingService>,
        vector_store: Arc<VectorStore>,
        llm: Arc<dyn LlmClient>,
        config: Arc<Config>,
    ) -> Self {
        Self {
            embeddings,
            vector_store,
            llm,
            config,
        }
    }

    /// Pay embedding-model and LLM-daemon startup costs eagerly, so
    /// failures surface before the process accepts traffic.
    pub async fn warm_up(&self) -> Result<()> {
        self.embeddings.warm_up().await?;
        if !self.llm.ping().await {
            return Err(Error::LlmUnreachable(
                "model daemon failed health check at warm-up".to_string(),
            ));
        }
        Ok(())
    }

    /// Parse, chunk, embed, and index an uploaded document. Re-ingesting
    /// the same `(filename, content)` pair replaces the prior chunks rather
    /// than duplicating them, because `document_id` is content-addressed.
    pub async fn ingest(&self, filename: &str, bytes: &[u8]) -> Result<DocumentSummary> {
        let file_type = crate::loader::DocumentLoader::validate(
            filename,
            bytes.len() as u64,
            &self.config.allowed_extensions,
            self.config.max_file_size_bytes(),
        )?;

        let owned_filename = filename.to_string();
        let owned_bytes = bytes.to_vec();
        let parsed = tokio::task::spawn_blocking(move || {
            crate::loader::DocumentLoader::parse(&owned_filename, &owned_bytes)
        })
        .await
        .map_err(|e| Error::internal(format!("parse task panicked: {e}")))??;
        debug_assert_eq!(parsed.file_type, file_type);

        let pieces = chunk_text(&parsed.text, self.config.chunk_size, self.config.chunk_overlap);
        if pieces.is_empty() {
            return Err(Error::parse_failed(filename, "document produced no chunks"));
        }

        let embeddings = self.embeddings.embed_batch(&pieces).await?;
        let uploaded_at = Utc::now();
        let total_chunks = pieces.len() as u32;

        let chunks: Vec<Chunk> = pieces
            .into_iter()
            .zip(embeddings)
            .enumerate()
            .map(|(ordinal, (text, embedding))| Chunk {
                chunk_id: Chunk::id_for(&parsed.document_id, ordinal as u32),
                text,
                embedding,
                metadata: ChunkMetadata {
                    document_id: parsed.document_id.clone(),
                    filename: filename.to_string(),
                    file_type,
                    file_size: bytes.len() as u64,
                    chunk_index: ordinal as u32,
                    total_chunks,
                    uploaded_at,
                },
            })
            .collect();

        if let Err(e) = self.vector_store.upsert(&parsed.document_id, &chunks) {
            if e.is_dependency_failure() {
                error!(document_id = %parsed.document_id, error = %e, "upsert failed, compensating with delete");
                if let Err(cleanup_err) = self.vector_store.delete_document(&parsed.document_id) {
                    warn!(error = %cleanup_err, "compensating delete also failed");
                }
            }
            return Err(e);
        }

        info!(document_id = %parsed.document_id, filename, chunk_count = total_chunks, "ingested document");

        Ok(DocumentSummary {
            document_id: parsed.document_id,
            filename: filename.to_string(),
            file_type,
            file_size: bytes.len() as u64,
            chunk_count: total_chunks,
            uploaded_at,
        })
    }

    /// Embed the query, retrieve context, compose a prompt, and return a
    /// stream of answer events. The source list is computed up front and
    /// delivered once, in the terminal event.
    pub async fn answer_stream(&self, query: &str, history: &[ChatMessage]) -> Result<AnswerStream> {
        let trimmed = query.trim();
        if trimmed.is_empty() {
            return Err(Error::QueryEmpty);
        }

        let query_embedding = self.embeddings.embed(trimmed).await?;
        let hits = self.vector_store.query(&query_embedding, self.config.top_k_results)?;

        let context = PromptBuilder::build_context(&hits);
        let sources = extract_sources(&hits);

        let messages = PromptBuilder::build_messages(
            trimmed,
            &context,
            history,
            self.config.history_budget_tokens * 4,
        );

        let options = GenerationOptions::new(&self.config.llm_model);
        let token_stream = self.llm.stream(&messages, &options).await?;

        let stream = async_stream::stream! {
            futures_util::pin_mut!(token_stream);
            while let Some(item) = token_stream.next().await {
                match item {
                    Ok(token) => yield Ok(AnswerEvent::Token(token)),
                    Err(e) => {
                        yield Err(e);
                        return;
                    }
                }
            }
            yield Ok(AnswerEvent::Done { sources });
        };

        Ok(Box::pin(stream))
    }

    /// Non-streaming variant used by tests and by any caller that wants a
    /// complete answer rather than incremental tokens.
    pub async fn answer(&self, query: &str, history: &[ChatMessage]) -> Result<(String, Vec<String>)> {
        let mut stream = self.answer_stream(query, history).await?;
        let mut answer = String::new();
        let mut sources = Vec::new();

        while let Some(event) = stream.next().await {
            match event? {
                AnswerEvent::Token(token) => answer.push_str(&token),
                AnswerEvent::Done { sources: s } => sources = s,
            }
        }

        Ok((answer, sources))
    }

    pub fn list_documents(&self) -> Result<Vec<DocumentSummary>> {
        self.vector_store.list_documents()
    }

    pub fn delete_document(&self, document_id: &str) -> Result<DeleteResult> {
        let deleted_chunks = self.vector_store.delete_document(document_id)?;
        Ok(DeleteResult { deleted_chunks })
    }

    pub fn stats(&self) -> Result<StatsResponse> {
        self.vector_store.stats()
    }

    pub fn inter_chunk_timeout(&self) -> Duration {
        self.config.inter_chunk_timeout
    }

    /// `(llm_reachable, vector_store_reachable)` for `/health`.
    pub async fn health(&self) -> (bool, bool) {
        let llm_ok = self.llm.ping().await;
        let vector_store_ok = self.vector_store.stats().is_ok();
        (llm_ok, vector_store_ok)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::embedding::EmbeddingProvider;
    use crate::providers::llm::{Message, TokenStream};
    use async_trait::async_trait;

    struct FakeEmbedder;
    #[async_trait]
    impl EmbeddingProvider for FakeEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            Ok(vec![text.len() as f32, 1.0, 0.0])
        }
        fn dimension(&self) -> usize {
            3
        }
        async fn health_check(&self) -> Result<bool> {
            Ok(true)
        }
    }

    struct FakeLlm;
    #[async_trait]
    impl LlmClient for FakeLlm {
        async fn complete(&self, _messages: &[Message], _options: &GenerationOptions) -> Result<String> {
            Ok("answer".to_string())
        }
        async fn stream(&self, _messages: &[Message], _options: &GenerationOptions) -> Result<TokenStream> {
            let tokens = vec![Ok("hel".to_string()), Ok("lo".to_string())];
            Ok(Box::pin(futures_util::stream::iter(tokens)))
        }
        async fn list_models(&self) -> Result<Vec<String>> {
            Ok(vec!["fake".to_string()])
        }
        async fn ping(&self) -> bool {
            true
        }
    }

    fn make_orchestrator(dir: &tempfile::TempDir) -> RagOrchestrator {
        let embeddings = Arc::new(EmbeddingService::new(Arc::new(FakeEmbedder)));
        let vector_store = Arc::new(
            VectorStore::open(&dir.path().join("store.redb"), "fake-model", 3).unwrap(),
        );
        let llm: Arc<dyn LlmClient> = Arc::new(FakeLlm);
        std::env::set_var("ADMIN_API_KEY", "0123456789abcdef");
        let config = Arc::new(Config::from_env().unwrap());
        RagOrchestrator::new(embeddings, vector_store, llm, config)
    }

    #[tokio::test]
    async fn ingest_then_answer_returns_sources() {
        let dir = tempfile::tempdir().unwrap();
        let orchestrator = make_orchestrator(&dir);

        orchestrator
            .ingest("notes.txt", b"Rust is a systems programming language.")
            .await
            .unwrap();

        let (answer, sources) = orchestrator.answer("what is rust?", &[]).await.unwrap();
        assert_eq!(answer, "hello");
        assert_eq!(sources, vec!["notes.txt".to_string()]);
    }

    #[tokio::test]
    async fn empty_query_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let orchestrator = make_orchestrator(&dir);
        let err = orchestrator.answer("   ", &[]).await.unwrap_err();
        assert!(matches!(err, Error::QueryEmpty));
    }

    #[tokio::test]
    async fn reingesting_same_content_does_not_duplicate_chunks() {
        let dir = tempfile::tempdir().unwrap();
        let orchestrator = make_orchestrator(&dir);

        orchestrator.ingest("a.txt", b"hello world").await.unwrap();
        orchestrator.ingest("a.txt", b"hello world").await.unwrap();

        let stats = orchestrator.stats().unwrap();
        assert_eq!(stats.total_documents, 1);
    }

    #[tokio::test]
    async fn delete_document_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let orchestrator = make_orchestrator(&dir);

        let result = orchestrator.delete_document("missing").unwrap();
        assert_eq!(result.deleted_chunks, 0);
    }
}
