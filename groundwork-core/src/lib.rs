//! groundwork-core - Retrieval-augmented generation engine
//!
//! Provides the components for answering questions from your own documents:
//! - LLM provider abstraction (OpenAI-compatible APIs, Ollama)
//! - RAG: chunking, embedding, in-memory vector search
//! - Grounded answer synthesis with citations
//! - Configuration management
//! - Unix socket server and client
//!
//! ## Primary API
//!
//! Embed the engine through [`ChatManager`], or run it behind [`Server`] and
//! talk to it with [`server::Client`].

pub mod chat;
pub mod config;
pub mod models;
pub mod patterns;
pub mod provider;
pub mod rag;
pub mod server;

pub use chat::{Answer, AnswerKind, ChatManager};
pub use config::{Config, ConfigError, IndexerConfig};
pub use rag::{RagEngine, RagError};
pub use server::Server;

pub use provider::{ChatRequest, ChatResponse, Message, Provider, ProviderError};
