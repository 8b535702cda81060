//! LLM provider abstraction layer.
//!
//! This module defines a common interface for different hosted LLM backends
//! (OpenAI-compatible, Ollama) to provide chat completions and embeddings.

mod types;
pub mod ollama;
pub mod openai;

// Re-export common types
pub use types::{ChatRequest, ChatResponse, Message, Provider, ProviderError, Result};

// Re-export provider implementations
pub use ollama::OllamaProvider;
pub use openai::OpenAiProvider;

use crate::config::{Config, ProviderKind};
use std::sync::Arc;
use std::time::Duration;

/// Builds the provider selected by `llm.provider`.
///
/// The OpenAI API key is read from the environment variable named by
/// `llm.api_key_env`; a missing key is not an error so that keyless
/// OpenAI-compatible servers keep working.
pub fn create_provider(config: &Config) -> Result<Arc<dyn Provider>> {
    let timeout = Duration::from_secs(config.llm.timeout_secs);
    match config.llm.provider {
        ProviderKind::OpenAi => {
            let api_key = std::env::var(&config.llm.api_key_env)
                .ok()
                .filter(|key| !key.is_empty());
            if api_key.is_none() {
                tracing::warn!(
                    env = %config.llm.api_key_env,
                    "No API key set, sending unauthenticated requests"
                );
            }
            Ok(Arc::new(OpenAiProvider::new(&config.llm.base_url, api_key, timeout)?))
        }
        ProviderKind::Ollama => Ok(Arc::new(OllamaProvider::new(&config.llm.base_url, timeout)?)),
    }
}
