//! Thin HTTP client to a local Ollama-compatible model daemon, supporting
//! both full completion and token streaming.

use async_trait::async_trait;
use futures_util::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::pin::Pin;
use std::time::Duration;

use crate::error::{Error, Result};

/// One turn of a chat prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

/// Generation knobs, named directly after the configuration table.
#[derive(Debug, Clone)]
pub struct GenerationOptions {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub repeat_penalty: f32,
}

impl GenerationOptions {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            temperature: 0.3,
            max_tokens: 512,
            repeat_penalty: 1.2,
        }
    }
}

/// A single fragment of a streaming completion.
pub type TokenStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// Narrow contract the orchestrator depends on, so tests can supply a fake
/// client without a live daemon.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, messages: &[Message], options: &GenerationOptions) -> Result<String>;
    async fn stream(&self, messages: &[Message], options: &GenerationOptions) -> Result<TokenStream>;
    async fn list_models(&self) -> Result<Vec<String>>;
    async fn ping(&self) -> bool;
}

#[derive(Debug, Serialize)]
struct OllamaChatRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    stream: bool,
    options: OllamaOptions,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    temperature: f32,
    num_predict: u32,
    repeat_penalty: f32,
}

#[derive(Debug, Deserialize)]
struct OllamaChatLine {
    message: OllamaMessageFragment,
    done: bool,
}

#[derive(Debug, Deserialize)]
struct OllamaMessageFragment {
    #[serde(default)]
    content: String,
}

#[derive(Debug, Deserialize)]
struct OllamaTagsResponse {
    models: Vec<OllamaModelInfo>,
}

#[derive(Debug, Deserialize)]
struct OllamaModelInfo {
    name: String,
}

/// `LlmClient` implementation against an Ollama-compatible `/api/chat`
/// endpoint. One long-lived `reqwest::Client` is shared across calls
/// (connection pooling), owned by the process for its lifetime.
pub struct OllamaLlmClient {
    client: reqwest::Client,
    base_url: String,
    request_timeout: Duration,
    inter_chunk_timeout: Duration,
}

impl OllamaLlmClient {
    pub fn new(base_url: impl Into<String>, request_timeout: Duration, inter_chunk_timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::builder()
                .build()
                .expect("reqwest client builds"),
            base_url: base_url.into(),
            request_timeout,
            inter_chunk_timeout,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }
}

#[async_trait]
impl LlmClient for OllamaLlmClient {
    async fn complete(&self, messages: &[Message], options: &GenerationOptions) -> Result<String> {
        let body = OllamaChatRequest {
            model: &options.model,
            messages,
            stream: false,
            options: OllamaOptions {
                temperature: options.temperature,
                num_predict: options.max_tokens,
                repeat_penalty: options.repeat_penalty,
            },
        };

        let response = tokio::time::timeout(
            self.request_timeout,
            self.client.post(self.url("/api/chat")).json(&body).send(),
        )
        .await
        .map_err(|_| Error::LlmTimeout)?
        .map_err(|e| Error::LlmUnreachable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Error::LlmUnreachable(format!(
                "model daemon returned {}",
                response.status()
            )));
        }

        let line: OllamaChatLine = tokio::time::timeout(self.request_timeout, response.json())
            .await
            .map_err(|_| Error::LlmTimeout)?
            .map_err(|e| Error::LlmUnreachable(format!("invalid response: {}", e)))?;

        Ok(line.message.content)
    }

    async fn stream(&self, messages: &[Message], options: &GenerationOptions) -> Result<TokenStream> {
        let body = OllamaChatRequest {
            model: &options.model,
            messages,
            stream: true,
            options: OllamaOptions {
                temperature: options.temperature,
                num_predict: options.max_tokens,
                repeat_penalty: options.repeat_penalty,
            },
        };

        let response = tokio::time::timeout(
            self.request_timeout,
            self.client.post(self.url("/api/chat")).json(&body).send(),
        )
        .await
        .map_err(|_| Error::LlmTimeout)?
        .map_err(|e| Error::LlmUnreachable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Error::LlmUnreachable(format!(
                "model daemon returned {}",
                response.status()
            )));
        }

        let inter_chunk_timeout = self.inter_chunk_timeout;
        let mut byte_stream = response.bytes_stream();
        let mut buffer = Vec::new();

        let stream = async_stream::stream! {
            loop {
                let next = tokio::time::timeout(inter_chunk_timeout, byte_stream.next()).await;
                let chunk = match next {
                    Ok(Some(Ok(chunk))) => chunk,
                    Ok(Some(Err(e))) => {
                        yield Err(Error::LlmUnreachable(e.to_string()));
                        return;
                    }
                    Ok(None) => return,
                    Err(_) => {
                        yield Err(Error::LlmTimeout);
                        return;
                    }
                };

                buffer.extend_from_slice(&chunk);
                while let Some(newline_pos) = buffer.iter().position(|&b| b == b'\n') {
                    let line: Vec<u8> = buffer.drain(..=newline_pos).collect();
                    let line = &line[..line.len() - 1];
                    if line.is_empty() {
                        continue;
                    }
                    match serde_json::from_slice::<OllamaChatLine>(line) {
                        Ok(parsed) => {
                            if !parsed.message.content.is_empty() {
                                yield Ok(parsed.message.content);
                            }
                            if parsed.done {
                                return;
                            }
                        }
                        Err(e) => {
                            yield Err(Error::LlmUnreachable(format!("malformed stream line: {}", e)));
                            return;
                        }
                    }
                }
            }
        };

        Ok(Box::pin(stream))
    }

    async fn list_models(&self) -> Result<Vec<String>> {
        let response = self
            .client
            .get(self.url("/api/tags"))
            .send()
            .await
            .map_err(|e| Error::LlmUnreachable(e.to_string()))?;

        let parsed: OllamaTagsResponse = response
            .json()
            .await
            .map_err(|e| Error::LlmUnreachable(format!("invalid tags response: {}", e)))?;

        Ok(parsed.models.into_iter().map(|m| m.name).collect())
    }

    async fn ping(&self) -> bool {
        self.client
            .get(self.url("/api/tags"))
            .timeout(Duration::from_secs(5))
            .send()
            .await
            .map(|r| r.status().is_success())
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generation_options_defaults_match_configuration_table() {
        let opts = GenerationOptions::new("llama3.1");
        assert_eq!(opts.temperature, 0.3);
        assert_eq!(opts.max_tokens, 512);
        assert_eq!(opts.repeat_penalty, 1.2);
    }
}
