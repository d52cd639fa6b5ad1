//! Deterministic text-to-vector embedding, backed by the local model
//! daemon's embedding endpoint.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::error::{Error, Result};

/// Narrow provider contract so tests can substitute a fake without a live
/// daemon (see the redesign note on module-level singletons).
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Order-preserving batch embedding. The default sequential
    /// implementation is overridden by [`OllamaEmbedder`] to fan requests
    /// out concurrently.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for text in texts {
            embeddings.push(self.embed(text).await?);
        }
        Ok(embeddings)
    }

    fn dimension(&self) -> usize;

    async fn health_check(&self) -> Result<bool>;
}

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embedding: Vec<f32>,
}

/// Embedding provider against an Ollama-compatible `/api/embeddings`
/// endpoint. Batch fan-out is bounded so a large ingestion job cannot
/// open unbounded concurrent connections to the daemon.
pub struct OllamaEmbedder {
    client: reqwest::Client,
    base_url: String,
    model: String,
    dimension: usize,
    max_concurrency: usize,
}

const MAX_EMBED_CONCURRENCY: usize = 8;

impl OllamaEmbedder {
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        dimension: usize,
        timeout: Duration,
    ) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .expect("reqwest client builds"),
            base_url: base_url.into(),
            model: model.into(),
            dimension,
            max_concurrency: MAX_EMBED_CONCURRENCY,
        }
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let url = format!("{}/api/embeddings", self.base_url.trim_end_matches('/'));
        let response = self
            .client
            .post(&url)
            .json(&EmbedRequest {
                model: &self.model,
                prompt: text,
            })
            .send()
            .await
            .map_err(|e| Error::embedding(format!("request to {} failed: {}", url, e)))?;

        if !response.status().is_success() {
            return Err(Error::embedding(format!(
                "embedding daemon returned {}",
                response.status()
            )));
        }

        let parsed: EmbedResponse = response
            .json()
            .await
            .map_err(|e| Error::embedding(format!("invalid embedding response: {}", e)))?;

        if parsed.embedding.len() != self.dimension {
            return Err(Error::embedding(format!(
                "embedding dimension mismatch: expected {}, got {}",
                self.dimension,
                parsed.embedding.len()
            )));
        }

        Ok(parsed.embedding)
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        use futures::stream::{self, StreamExt};

        let results: Vec<(usize, Result<Vec<f32>>)> = stream::iter(texts.iter().enumerate())
            .map(|(idx, text)| async move { (idx, self.embed(text).await) })
            .buffer_unordered(self.max_concurrency)
            .collect()
            .await;

        let ordered: std::collections::BTreeMap<usize, Result<Vec<f32>>> =
            results.into_iter().collect();
        ordered.into_values().collect()
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn health_check(&self) -> Result<bool> {
        match self.embed("ping").await {
            Ok(_) => Ok(true),
            Err(_) => Ok(false),
        }
    }
}

/// Process-wide embedding singleton. The model is addressed lazily: the
/// first call to `embed`/`embed_batch` reaches the daemon, but
/// [`warm_up`](Self::warm_up) lets the host pay that cost eagerly at
/// startup instead of in the first request.
pub struct EmbeddingService {
    provider: Arc<dyn EmbeddingProvider>,
}

impl EmbeddingService {
    pub fn new(provider: Arc<dyn EmbeddingProvider>) -> Self {
        Self { provider }
    }

    pub async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.provider.embed(text).await
    }

    pub async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.provider.embed_batch(texts).await
    }

    pub fn dimension(&self) -> usize {
        self.provider.dimension()
    }

    /// Pay the model-load cost at startup. Failure here is fatal to the
    /// process, per the lifecycle contract.
    pub async fn warm_up(&self) -> Result<()> {
        if !self.provider.health_check().await? {
            return Err(Error::embedding(
                "embedding daemon failed health check at warm-up",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeProvider {
        dimension: usize,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl EmbeddingProvider for FakeProvider {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![text.len() as f32; self.dimension])
        }

        fn dimension(&self) -> usize {
            self.dimension
        }

        async fn health_check(&self) -> Result<bool> {
            Ok(true)
        }
    }

    #[tokio::test]
    async fn embed_batch_preserves_order() {
        let provider = Arc::new(FakeProvider {
            dimension: 4,
            calls: AtomicUsize::new(0),
        });
        let service = EmbeddingService::new(provider);
        let texts = vec!["a".to_string(), "bb".to_string(), "ccc".to_string()];
        let vectors = service.embed_batch(&texts).await.unwrap();
        assert_eq!(vectors[0][0], 1.0);
        assert_eq!(vectors[1][0], 2.0);
        assert_eq!(vectors[2][0], 3.0);
    }

    #[tokio::test]
    async fn warm_up_fails_when_health_check_fails() {
        struct DeadProvider;
        #[async_trait]
        impl EmbeddingProvider for DeadProvider {
            async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
                Err(Error::embedding("unreachable"))
            }
            fn dimension(&self) -> usize {
                4
            }
            async fn health_check(&self) -> Result<bool> {
                Ok(false)
            }
        }

        let service = EmbeddingService::new(Arc::new(DeadProvider));
        assert!(service.warm_up().await.is_err());
    }
}
