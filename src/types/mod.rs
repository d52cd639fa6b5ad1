//! Core types shared across the ingestion and query paths.

pub mod document;
pub mod query;
pub mod response;

pub use document::{Chunk, ChunkMetadata, FileType};
pub use query::{ChatMessage, ChatRole, QueryRequest};
pub use response::{DocumentSummary, IngestResponse, QueryResponse, StatsResponse};
