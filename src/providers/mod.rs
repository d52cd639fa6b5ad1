//! Provider abstractions for embeddings and LLM access. Both are narrow
//! async traits so tests can substitute fakes without a live model daemon.

pub mod embedding;
pub mod llm;

pub use embedding::{EmbeddingProvider, EmbeddingService, OllamaEmbedder};
pub use llm::{GenerationOptions, LlmClient, Message, OllamaLlmClient, Role, TokenStream};
