//! Deterministic provider for integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use groundwork_core::provider::{ChatRequest, ChatResponse, Message, Provider, ProviderError, Result};
use groundwork_core::Config;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

pub const DIM: usize = 256;

/// Embeds text as a hashed bag of lowercase words.
///
/// Identical texts get identical vectors; chat either replies with a fixed
/// cited sentence or fails with a 503.
pub struct MockProvider {
    pub chat_calls: AtomicUsize,
    pub embed_calls: AtomicUsize,
    fail_chat: bool,
    poison: Option<String>,
}

impl MockProvider {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::build(false, None))
    }

    /// Chat always fails.
    pub fn failing_chat() -> Arc<Self> {
        Arc::new(Self::build(true, None))
    }

    /// Embedding fails for any batch containing `word`.
    pub fn poisoned(word: &str) -> Arc<Self> {
        Arc::new(Self::build(false, Some(word.to_string())))
    }

    fn build(fail_chat: bool, poison: Option<String>) -> Self {
        Self {
            chat_calls: AtomicUsize::new(0),
            embed_calls: AtomicUsize::new(0),
            fail_chat,
            poison,
        }
    }

    pub fn chat_calls(&self) -> usize {
        self.chat_calls.load(Ordering::SeqCst)
    }

    pub fn embed_calls(&self) -> usize {
        self.embed_calls.load(Ordering::SeqCst)
    }
}

pub fn embed_text(text: &str) -> Vec<f32> {
    let mut vector = vec![0.0; DIM];
    for word in text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
    {
        let mut hasher = DefaultHasher::new();
        word.to_lowercase().hash(&mut hasher);
        vector[(hasher.finish() % DIM as u64) as usize] += 1.0;
    }
    vector
}

#[async_trait]
impl Provider for MockProvider {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse> {
        self.chat_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_chat {
            return Err(ProviderError::Api {
                provider: "mock",
                status: 503,
                body: "service unavailable".to_string(),
            });
        }
        Ok(ChatResponse {
            model: request.model,
            message: Message::assistant("According to the sources [1]."),
        })
    }

    async fn embed(&self, texts: &[String], _model: &str) -> Result<Vec<Vec<f32>>> {
        self.embed_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(poison) = &self.poison {
            if texts.iter().any(|t| t.contains(poison.as_str())) {
                return Err(ProviderError::Api {
                    provider: "mock",
                    status: 500,
                    body: format!("cannot embed {poison}"),
                });
            }
        }
        Ok(texts.iter().map(|t| embed_text(t)).collect())
    }
}

/// Defaults with the mock's embedding width and small chunks.
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.rag.embedding_dim = Some(DIM);
    config.rag.chunk_size = 32;
    config.rag.min_chunk_chars = 40;
    config.rag.batch_size = 4;
    config
}

/// `count` distinct sentences, long enough to span several chunks.
pub fn long_document(tag: &str, count: usize) -> String {
    (0..count)
        .map(|i| format!("Paragraph {i} of {tag} talks about {tag}topic{i} and {tag}detail{i}."))
        .collect::<Vec<_>>()
        .join(" ")
}
