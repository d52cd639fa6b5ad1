//! corpus-rag: a self-hosted retrieval-augmented generation backend.
//!
//! Ingests PDF/DOCX/Markdown/plain-text documents, chunks and embeds them
//! against a local model daemon, and answers questions over the indexed
//! corpus with streamed, citation-backed responses.

pub mod chunking;
pub mod config;
pub mod error;
pub mod generation;
pub mod loader;
pub mod orchestrator;
pub mod providers;
pub mod server;
pub mod types;
pub mod vector_store;

pub use config::Config;
pub use error::{Error, Result};
pub use orchestrator::RagOrchestrator;
