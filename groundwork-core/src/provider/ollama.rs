//! Ollama provider implementation.
//!
//! Talks to the Ollama HTTP API. Chat responses are streamed as NDJSON and
//! accumulated into a single [`ChatResponse`].

use super::types::*;
use async_trait::async_trait;

use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

const NAME: &str = "ollama";

/// Ollama HTTP API provider.
#[derive(Debug, Clone)]
pub struct OllamaProvider {
    base_url: String,
    http_client: reqwest::Client,
}

impl OllamaProvider {
    /// Creates a new Ollama provider for the given base URL.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProviderError::from_reqwest(NAME, e))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http_client,
        })
    }
}

#[async_trait]
impl Provider for OllamaProvider {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse> {
        let url = format!("{}/api/chat", self.base_url);

        let ollama_request = OllamaChatRequest {
            model: request.model.clone(),
            messages: request
                .messages
                .iter()
                .map(|m| OllamaMessage {
                    role: m.role.clone(),
                    content: m.content.clone(),
                })
                .collect(),
            options: {
                let mut opts = HashMap::new();
                opts.insert("temperature".to_string(), serde_json::json!(request.temperature));
                Some(opts)
            },
            stream: true,
        };

        let response = self
            .http_client
            .post(&url)
            .json(&ollama_request)
            .send()
            .await
            .map_err(|e| ProviderError::from_reqwest(NAME, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Api {
                provider: NAME,
                status: status.as_u16(),
                body,
            });
        }

        let mut stream = response.bytes_stream();
        let mut buffer = Vec::new();
        let mut content = String::new();
        let mut model = request.model;

        while let Some(chunk_result) = stream.next().await {
            let chunk = chunk_result.map_err(|e| ProviderError::from_reqwest(NAME, e))?;
            buffer.extend_from_slice(&chunk);

            while let Some(newline_pos) = buffer.iter().position(|&b| b == b'\n') {
                let line = buffer.drain(..=newline_pos).collect::<Vec<_>>();
                if line.len() <= 1 {
                    continue;
                }
                accumulate_line(&line[..line.len() - 1], &mut content, &mut model)?;
            }
        }
        if !buffer.is_empty() {
            accumulate_line(&buffer, &mut content, &mut model)?;
        }

        debug!(model = %model, chars = content.len(), "Ollama chat completed");
        if content.is_empty() {
            return Err(ProviderError::EmptyResponse(NAME));
        }

        Ok(ChatResponse {
            model,
            message: Message::assistant(content),
        })
    }

    async fn embed(&self, texts: &[String], model: &str) -> Result<Vec<Vec<f32>>> {
        let url = format!("{}/api/embed", self.base_url);

        let embed_request = OllamaEmbedRequest {
            model: model.to_string(),
            input: texts.to_vec(),
        };

        let response = self
            .http_client
            .post(&url)
            .json(&embed_request)
            .send()
            .await
            .map_err(|e| ProviderError::from_reqwest(NAME, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Api {
                provider: NAME,
                status: status.as_u16(),
                body,
            });
        }

        let embed_response = response
            .json::<OllamaEmbedResponse>()
            .await
            .map_err(|e| ProviderError::from_reqwest(NAME, e))?;

        if embed_response.embeddings.is_empty() && !texts.is_empty() {
            return Err(ProviderError::EmptyResponse(NAME));
        }
        Ok(embed_response.embeddings)
    }
}

/// Parses one NDJSON line of a streamed chat response.
fn accumulate_line(line: &[u8], content: &mut String, model: &mut String) -> Result<()> {
    let line_str = String::from_utf8_lossy(line);
    if line_str.trim().is_empty() {
        return Ok(());
    }

    let chunk: OllamaChatResponse =
        serde_json::from_str(&line_str).map_err(|e| ProviderError::Decode {
            provider: NAME,
            message: e.to_string(),
        })?;

    if let Some(error) = chunk.error {
        return Err(ProviderError::Api {
            provider: NAME,
            status: 200,
            body: error,
        });
    }
    if let Some(message) = chunk.message {
        content.push_str(&message.content);
    }
    if let Some(m) = chunk.model {
        *model = m;
    }
    Ok(())
}

// Ollama-specific request/response types (internal)

#[derive(Debug, Clone, Serialize, Deserialize)]
struct OllamaChatRequest {
    model: String,
    messages: Vec<OllamaMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<HashMap<String, serde_json::Value>>,
    stream: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct OllamaMessage {
    role: String,
    content: String,
}

#[derive(Debug, Clone, Deserialize)]
struct OllamaChatResponse {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    message: Option<OllamaMessage>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
struct OllamaEmbedRequest {
    model: String,
    input: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct OllamaEmbedResponse {
    #[serde(default)]
    embeddings: Vec<Vec<f32>>,
}
