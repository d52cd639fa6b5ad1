//! Prompt composition: turns retrieved chunks and chat history into the
//! message list handed to the LLM client.

use crate::providers::llm::{Message, Role};
use crate::types::ChatMessage;
use crate::vector_store::SearchResult;

const SYSTEM_PROMPT: &str = "You are a document-grounded assistant. Answer using only the \
information given in the CONTEXT section below. If the context does not contain the answer, \
say plainly that the information is not available in the provided documents. Do not use \
outside knowledge and do not speculate beyond what the context states.";

pub struct PromptBuilder;

impl PromptBuilder {
    /// Concatenate retrieved chunks into a single context block, each
    /// labeled with its source filename and chunk index.
    pub fn build_context(results: &[SearchResult]) -> String {
        let mut context = String::new();
        for result in results {
            context.push_str(&format!(
                "[{} #{}]\n{}\n\n",
                result.chunk.metadata.filename, result.chunk.metadata.chunk_index, result.chunk.text
            ));
        }
        context
    }

    /// Build the full message list: system prompt, history truncated to fit
    /// `history_budget_chars`, then a user message carrying context plus
    /// the query.
    pub fn build_messages(
        query: &str,
        context: &str,
        history: &[ChatMessage],
        history_budget_chars: usize,
    ) -> Vec<Message> {
        let mut messages = vec![Message {
            role: Role::System,
            content: SYSTEM_PROMPT.to_string(),
        }];

        messages.extend(truncate_history(history, history_budget_chars));

        let user_content = if context.trim().is_empty() {
            format!("No relevant context was found in the documents.\n\nQUESTION: {query}")
        } else {
            format!("CONTEXT:\n{context}\nQUESTION: {query}")
        };

        messages.push(Message {
            role: Role::User,
            content: user_content,
        });

        messages
    }
}

/// Drop the oldest history turns until the remaining ones fit the budget.
/// The budget is an approximation (`chars / 4`, no tokenizer dependency) so
/// it is expressed here directly in characters.
fn truncate_history(history: &[ChatMessage], budget_chars: usize) -> Vec<Message> {
    let mut kept: Vec<&ChatMessage> = Vec::new();
    let mut used = 0usize;

    for turn in history.iter().rev() {
        let cost = turn.content.len();
        if used + cost > budget_chars && !kept.is_empty() {
            break;
        }
        used += cost;
        kept.push(turn);
    }

    kept.reverse();
    kept.into_iter()
        .map(|turn| Message {
            role: match turn.role {
                crate::types::ChatRole::System => Role::System,
                crate::types::ChatRole::User => Role::User,
                crate::types::ChatRole::Assistant => Role::Assistant,
            },
            content: turn.content.clone(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ChatRole;

    #[test]
    fn empty_context_still_asks_the_question() {
        let messages = PromptBuilder::build_messages("what is this?", "", &[], 1000);
        let user = messages.last().unwrap();
        assert!(user.content.contains("what is this?"));
        assert!(user.content.contains("No relevant context"));
    }

    #[test]
    fn history_is_truncated_from_the_oldest_end() {
        let history = vec![
            ChatMessage { role: ChatRole::User, content: "a".repeat(50) },
            ChatMessage { role: ChatRole::Assistant, content: "b".repeat(50) },
            ChatMessage { role: ChatRole::User, content: "c".repeat(50) },
        ];
        let messages = PromptBuilder::build_messages("q", "ctx", &history, 80);
        // system + the most recent turn that fits + final user message
        assert!(messages.len() < 1 + history.len() + 1);
        assert!(messages.iter().any(|m| m.content.starts_with("ccccc")));
        assert!(!messages.iter().any(|m| m.content.starts_with("aaaaa")));
    }
}
