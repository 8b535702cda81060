//! Conversation entry points.
//!
//! `ChatManager` owns the configuration, the provider, and the RAG engine, and
//! exposes the two ways of talking to the model:
//!
//! ```text
//! ask:   query → retrieve top_k chunks → synthesize → Answer
//! chat:  message → provider (system prompt + message) → String
//! ```
//!
//! Only the completion step of `ask` degrades on failure. A retrieval error
//! (for example the query cannot be embedded) is returned to the caller.

use super::synthesis::{synthesize, Answer, SynthesisOptions};
use crate::config::Config;
use crate::provider::{ChatRequest, Message, Provider, ProviderError};
use crate::rag::{RagEngine, RagError};
use std::sync::Arc;
use tracing::{debug, info};

/// Manages question answering and plain chat against one provider.
///
/// # Examples
///
/// ```no_run
/// use groundwork_core::{provider, ChatManager, Config};
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::load_or_default();
/// let provider = provider::create_provider(&config)?;
/// let manager = ChatManager::new(config, provider);
///
/// manager.rag().ingest_file("README.md".as_ref()).await?;
/// let answer = manager.ask("What does this project do?").await?;
/// println!("{}", answer.text);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct ChatManager {
    config: Config,
    provider: Arc<dyn Provider>,
    rag: RagEngine,
}

impl ChatManager {
    /// Creates a manager with an empty in-memory knowledge base.
    pub fn new(config: Config, provider: Arc<dyn Provider>) -> Self {
        let rag = RagEngine::new(&config, provider.clone());
        Self {
            config,
            provider,
            rag,
        }
    }

    /// Replaces the RAG engine, e.g. to share one knowledge base.
    pub fn with_rag(mut self, rag: RagEngine) -> Self {
        self.rag = rag;
        self
    }

    pub fn rag(&self) -> &RagEngine {
        &self.rag
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Answers `query` from the knowledge base.
    ///
    /// Retrieves `storage.top_k` chunks and synthesizes a cited answer. An
    /// empty knowledge base yields the fixed "no relevant information" answer
    /// without any provider call.
    ///
    /// # Errors
    ///
    /// Returns [`RagError`] if the query is blank or cannot be embedded, or
    /// if its embedding has a different dimension from the stored chunks.
    /// Completion failures never error; see [`synthesize`].
    pub async fn ask(&self, query: &str) -> Result<Answer, RagError> {
        let retrieved = self.rag.retrieve(query, self.config.storage.top_k).await?;
        debug!(retrieved = retrieved.len(), "Retrieved context for question");

        let chunks: Vec<_> = retrieved.into_iter().map(|scored| scored.chunk).collect();
        let options = SynthesisOptions {
            model: &self.config.llm.model,
            temperature: self.config.llm.temperature,
            preamble: &self.config.system_prompt,
        };
        let answer = synthesize(self.provider.as_ref(), query, &chunks, &options).await;

        info!(kind = ?answer.kind, sources = answer.sources.len(), "Question answered");
        Ok(answer)
    }

    /// Sends one message to the model, without retrieval.
    pub async fn chat(&self, message: &str) -> Result<String, ProviderError> {
        let mut messages = Vec::with_capacity(2);
        if !self.config.system_prompt.trim().is_empty() {
            messages.push(Message::system(&self.config.system_prompt));
        }
        messages.push(Message::user(message));

        let request = ChatRequest::new(&self.config.llm.model, messages)
            .with_temperature(self.config.llm.temperature);

        debug!(provider = self.provider.name(), model = %self.config.llm.model, "Sending chat request");
        let response = self.provider.chat(request).await?;
        Ok(response.message.content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::{AnswerKind, NO_RELEVANT_INFORMATION};
    use crate::provider::ChatResponse;
    use crate::rag::IngestRequest;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Embeds every text as a fixed unit vector and echoes the last message.
    struct Echo {
        chat_calls: AtomicUsize,
        fail_chat: bool,
    }

    impl Echo {
        fn new(fail_chat: bool) -> Arc<Self> {
            Arc::new(Self {
                chat_calls: AtomicUsize::new(0),
                fail_chat,
            })
        }
    }

    #[async_trait]
    impl Provider for Echo {
        fn name(&self) -> &'static str {
            "echo"
        }

        async fn chat(&self, request: ChatRequest) -> crate::provider::Result<ChatResponse> {
            self.chat_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_chat {
                return Err(ProviderError::EmptyResponse("echo"));
            }
            let last = request.messages.last().map(|m| m.content.clone()).unwrap_or_default();
            Ok(ChatResponse {
                model: request.model,
                message: Message::assistant(format!("echo: {last}")),
            })
        }

        async fn embed(&self, texts: &[String], _model: &str) -> crate::provider::Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|_| vec![1.0, 0.0]).collect())
        }
    }

    fn config() -> Config {
        let mut config = Config::default();
        config.rag.embedding_dim = Some(2);
        config
    }

    #[tokio::test]
    async fn test_ask_empty_knowledge_base() {
        let provider = Echo::new(false);
        let manager = ChatManager::new(config(), provider.clone());

        let answer = manager.ask("anything there?").await.unwrap();
        assert_eq!(answer.kind, AnswerKind::NoContext);
        assert_eq!(answer.text, NO_RELEVANT_INFORMATION);
        assert_eq!(provider.chat_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_ask_grounded() {
        let provider = Echo::new(false);
        let manager = ChatManager::new(config(), provider.clone());
        manager
            .rag()
            .ingest(IngestRequest::new("Groundwork answers questions about documents.").with_document_id("intro"))
            .await
            .unwrap();

        let answer = manager.ask("What does it do?").await.unwrap();
        assert_eq!(answer.kind, AnswerKind::Grounded);
        assert!(answer.text.starts_with("echo: What does it do?"));
        assert!(answer.text.ends_with("Sources:\n- intro"));
        assert_eq!(provider.chat_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_ask_blank_query_is_invalid() {
        let manager = ChatManager::new(config(), Echo::new(false));
        let err = manager.ask("   ").await.unwrap_err();
        assert!(matches!(err, RagError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn test_chat_returns_reply() {
        let manager = ChatManager::new(config(), Echo::new(false));
        assert_eq!(manager.chat("hi").await.unwrap(), "echo: hi");
    }

    #[tokio::test]
    async fn test_chat_failure_is_explicit() {
        let manager = ChatManager::new(config(), Echo::new(true));
        let err = manager.chat("hi").await.unwrap_err();
        assert!(matches!(err, ProviderError::EmptyResponse("echo")));
    }
}
