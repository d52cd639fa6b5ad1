//! Document and chunk types with source tracking for citations

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Allow-listed file formats this loader knows how to parse.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Pdf,
    Docx,
    Txt,
    Markdown,
}

impl FileType {
    /// Detect a file type from its extension (without the leading dot).
    /// Returns `None` for anything not on the allow-list.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "pdf" => Some(Self::Pdf),
            "docx" => Some(Self::Docx),
            "txt" | "text" => Some(Self::Txt),
            "md" | "markdown" => Some(Self::Markdown),
            _ => None,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Docx => "docx",
            Self::Txt => "txt",
            Self::Markdown => "md",
        }
    }
}

/// Per-chunk metadata carried alongside the embedding and text in the
/// vector store. `file_type` and `file_size` are carried here (rather than
/// looked up elsewhere) because the VectorStore is the sole persistent
/// record of a document: `list_documents()` reconstructs a `DocumentSummary`
/// per distinct `document_id` entirely from chunk metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub document_id: String,
    pub filename: String,
    pub file_type: FileType,
    pub file_size: u64,
    pub chunk_index: u32,
    pub total_chunks: u32,
    pub uploaded_at: DateTime<Utc>,
}

/// The unit of retrieval. `chunk_id` is always `<document_id>:<ordinal>` so
/// re-ingesting a document replaces its chunks rather than accumulating
/// duplicates (see [`crate::orchestrator`]).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub chunk_id: String,
    pub text: String,
    pub embedding: Vec<f32>,
    pub metadata: ChunkMetadata,
}

impl Chunk {
    pub fn id_for(document_id: &str, ordinal: u32) -> String {
        format!("{}:{}", document_id, ordinal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_allow_listed_extensions() {
        assert_eq!(FileType::from_extension("PDF"), Some(FileType::Pdf));
        assert_eq!(FileType::from_extension("md"), Some(FileType::Markdown));
        assert_eq!(FileType::from_extension("exe"), None);
    }

    #[test]
    fn chunk_id_is_document_id_colon_ordinal() {
        assert_eq!(Chunk::id_for("abc123", 4), "abc123:4");
    }
}
