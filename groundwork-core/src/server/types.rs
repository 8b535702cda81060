use crate::rag::DocumentSummary;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestType {
    /// Plain chat, no retrieval.
    Chat,
    /// Retrieval plus grounded answer.
    Ask,
    Ingest,
    Search,
    Stats,
    Reset,
}

/// Request from client to server, sent as one JSON line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    #[serde(rename = "type")]
    pub request_type: RequestType,

    /// Message, question, query, or document text depending on the type.
    #[serde(default)]
    pub content: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_id: Option<String>,

    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_results: Option<usize>,
}

impl Request {
    pub fn new(request_type: RequestType, content: impl Into<String>) -> Self {
        Self {
            request_type,
            content: content.into(),
            document_id: None,
            metadata: HashMap::new(),
            max_results: None,
        }
    }

    pub fn chat(message: impl Into<String>) -> Self {
        Self::new(RequestType::Chat, message)
    }

    pub fn ask(question: impl Into<String>) -> Self {
        Self::new(RequestType::Ask, question)
    }

    pub fn ingest(text: impl Into<String>) -> Self {
        Self::new(RequestType::Ingest, text)
    }

    pub fn search(query: impl Into<String>, max_results: Option<usize>) -> Self {
        Self {
            max_results,
            ..Self::new(RequestType::Search, query)
        }
    }

    pub fn stats() -> Self {
        Self::new(RequestType::Stats, "")
    }

    pub fn reset() -> Self {
        Self::new(RequestType::Reset, "")
    }

    pub fn with_document_id(mut self, id: impl Into<String>) -> Self {
        self.document_id = Some(id.into());
        self
    }

    pub fn with_metadata(mut self, metadata: HashMap<String, String>) -> Self {
        self.metadata = metadata;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkType {
    Done,
    Error,
}

/// Machine-readable cause attached to some `error` frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// The document id is already in the knowledge base.
    DuplicateDocument,
    /// The text yielded nothing that could be embedded.
    Extraction,
    InvalidRequest,
}

/// Response frame sent to the client.
///
/// A `done` frame carries the JSON-encoded payload in `content`; an `error`
/// frame carries the message in `error` and, when known, its `code`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamChunk {
    #[serde(rename = "type")]
    pub chunk_type: ChunkType,
    #[serde(default)]
    pub content: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<ErrorCode>,
}

impl StreamChunk {
    pub fn done(content: impl Into<String>) -> Self {
        Self {
            chunk_type: ChunkType::Done,
            content: content.into(),
            error: None,
            code: None,
        }
    }

    pub fn error(error: impl Into<String>) -> Self {
        Self {
            chunk_type: ChunkType::Error,
            content: String::new(),
            error: Some(error.into()),
            code: None,
        }
    }

    pub fn with_code(mut self, code: Option<ErrorCode>) -> Self {
        self.code = code;
        self
    }

    /// Serializes `payload` into a `done` frame.
    pub fn done_json<T: Serialize>(payload: &T) -> Self {
        match serde_json::to_string(payload) {
            Ok(json) => Self::done(json),
            Err(e) => Self::error(format!("Failed to encode response: {e}")),
        }
    }
}

/// Payload of a `chat` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatReply {
    pub reply: String,
}

/// Payload of a `stats` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    pub chunk_count: usize,
    pub documents: Vec<DocumentSummary>,
}

/// Payload of a `reset` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResetReport {
    pub removed_chunks: usize,
}
