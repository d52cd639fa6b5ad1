//! Chat request types

use serde::{Deserialize, Serialize};

/// A single turn of caller-supplied chat history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

/// Body of `POST /chat` and `POST /chat/stream`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRequest {
    pub message: String,
    #[serde(default)]
    pub history: Vec<ChatMessage>,
}

impl QueryRequest {
    pub const MAX_MESSAGE_CHARS: usize = 4000;

    /// Validate the message length bound from the HTTP surface (§6.1).
    /// Emptiness is checked by the orchestrator, which also treats
    /// whitespace-only input as empty.
    pub fn is_within_length_bound(&self) -> bool {
        let len = self.message.chars().count();
        len >= 1 && len <= Self::MAX_MESSAGE_CHARS
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_overlong_message() {
        let req = QueryRequest {
            message: "a".repeat(4001),
            history: vec![],
        };
        assert!(!req.is_within_length_bound());
    }

    #[test]
    fn accepts_message_at_bound() {
        let req = QueryRequest {
            message: "a".repeat(4000),
            history: vec![],
        };
        assert!(req.is_within_length_bound());
    }
}
