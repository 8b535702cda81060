use super::types::{ChatReply, ErrorCode, Request, RequestType, ResetReport, Stats, StreamChunk};
use crate::chat::ChatManager;
use crate::rag::{DocumentError, IngestRequest, RagError};
use tracing::{debug, warn};

fn error_code(err: &RagError) -> Option<ErrorCode> {
    match err {
        RagError::DuplicateDocument(_) => Some(ErrorCode::DuplicateDocument),
        RagError::DocumentProcessing {
            source: DocumentError::Extraction(_),
            ..
        } => Some(ErrorCode::Extraction),
        RagError::InvalidRequest(_) => Some(ErrorCode::InvalidRequest),
        _ => None,
    }
}

/// Routes requests to the chat manager and its knowledge base.
pub struct RequestHandler {
    manager: ChatManager,
}

impl RequestHandler {
    pub fn new(manager: ChatManager) -> Self {
        Self { manager }
    }

    /// Handles one request and produces its single response frame.
    pub async fn handle(&self, request: Request) -> StreamChunk {
        debug!(request_type = ?request.request_type, "Handling request");
        let response = match request.request_type {
            RequestType::Chat => self.handle_chat(request).await,
            RequestType::Ask => self.handle_ask(request).await,
            RequestType::Ingest => self.handle_ingest(request).await,
            RequestType::Search => self.handle_search(request).await,
            RequestType::Stats => self.handle_stats().await,
            RequestType::Reset => self.handle_reset().await,
        };

        if let Some(error) = &response.error {
            warn!(error = %error, "Request failed");
        }
        response
    }

    async fn handle_chat(&self, request: Request) -> StreamChunk {
        match self.manager.chat(&request.content).await {
            Ok(reply) => StreamChunk::done_json(&ChatReply { reply }),
            Err(e) => StreamChunk::error(format!("Chat failed: {e}")),
        }
    }

    async fn handle_ask(&self, request: Request) -> StreamChunk {
        match self.manager.ask(&request.content).await {
            Ok(answer) => StreamChunk::done_json(&answer),
            Err(e) => StreamChunk::error(format!("Failed to answer: {e}")).with_code(error_code(&e)),
        }
    }

    async fn handle_ingest(&self, request: Request) -> StreamChunk {
        let ingest = IngestRequest {
            text: request.content,
            document_id: request.document_id,
            metadata: request.metadata,
        };
        match self.manager.rag().ingest(ingest).await {
            Ok(report) => StreamChunk::done_json(&report),
            Err(e) => StreamChunk::error(format!("Failed to ingest: {e}")).with_code(error_code(&e)),
        }
    }

    async fn handle_search(&self, request: Request) -> StreamChunk {
        let max_results = request
            .max_results
            .unwrap_or(self.manager.config().storage.top_k);
        match self.manager.rag().search(&request.content, max_results).await {
            Ok(hits) => StreamChunk::done_json(&hits),
            Err(e) => StreamChunk::error(format!("Search failed: {e}")).with_code(error_code(&e)),
        }
    }

    async fn handle_stats(&self) -> StreamChunk {
        let rag = self.manager.rag();
        StreamChunk::done_json(&Stats {
            chunk_count: rag.count().await,
            documents: rag.documents().await,
        })
    }

    async fn handle_reset(&self) -> StreamChunk {
        let removed_chunks = self.manager.rag().clear().await;
        StreamChunk::done_json(&ResetReport { removed_chunks })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::{Answer, AnswerKind};
    use crate::config::Config;
    use crate::provider::{ChatRequest, ChatResponse, Provider, ProviderError};
    use crate::rag::{IngestReport, SearchHit};
    use crate::server::types::ChunkType;
    use async_trait::async_trait;
    use std::sync::Arc;

    /// Embeds by counting vowels and consonants; chat is always down.
    struct Offline;

    #[async_trait]
    impl Provider for Offline {
        fn name(&self) -> &'static str {
            "offline"
        }

        async fn chat(&self, _request: ChatRequest) -> crate::provider::Result<ChatResponse> {
            Err(ProviderError::Api {
                provider: "offline",
                status: 503,
                body: "unavailable".to_string(),
            })
        }

        async fn embed(&self, texts: &[String], _model: &str) -> crate::provider::Result<Vec<Vec<f32>>> {
            Ok(texts
                .iter()
                .map(|t| {
                    let vowels = t.chars().filter(|c| "aeiou".contains(*c)).count() as f32;
                    let others = t.chars().filter(|c| c.is_alphabetic()).count() as f32 - vowels;
                    vec![vowels, others, 1.0]
                })
                .collect())
        }
    }

    fn handler() -> RequestHandler {
        let mut config = Config::default();
        config.rag.embedding_dim = Some(3);
        RequestHandler::new(ChatManager::new(config, Arc::new(Offline)))
    }

    fn payload<T: serde::de::DeserializeOwned>(chunk: StreamChunk) -> T {
        assert_eq!(chunk.chunk_type, ChunkType::Done, "unexpected error: {:?}", chunk.error);
        serde_json::from_str(&chunk.content).unwrap()
    }

    #[tokio::test]
    async fn test_ingest_search_stats_reset() {
        let handler = handler();

        let report: IngestReport = payload(
            handler
                .handle(Request::ingest("The quick brown fox jumps over the lazy dog.").with_document_id("fox"))
                .await,
        );
        assert_eq!(report, IngestReport { document_id: "fox".into(), chunk_count: 1 });

        let hits: Vec<SearchHit> = payload(handler.handle(Request::search("fox", Some(5))).await);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "fox#0");

        let stats: Stats = payload(handler.handle(Request::stats()).await);
        assert_eq!(stats.chunk_count, 1);
        assert_eq!(stats.documents[0].document_id, "fox");

        let reset: ResetReport = payload(handler.handle(Request::reset()).await);
        assert_eq!(reset.removed_chunks, 1);
        let stats: Stats = payload(handler.handle(Request::stats()).await);
        assert_eq!(stats.chunk_count, 0);
    }

    #[tokio::test]
    async fn test_duplicate_ingest_is_error_frame() {
        let handler = handler();
        let request = Request::ingest("Some text worth keeping around.").with_document_id("dup");
        handler.handle(request.clone()).await;

        let response = handler.handle(request).await;
        assert_eq!(response.chunk_type, ChunkType::Error);
        assert_eq!(response.code, Some(ErrorCode::DuplicateDocument));
        assert!(response.error.unwrap().contains("already exists"));
    }

    #[tokio::test]
    async fn test_ingest_error_codes() {
        let handler = handler();
        let response = handler.handle(Request::ingest("ok").with_document_id("tiny")).await;
        assert_eq!(response.code, Some(ErrorCode::Extraction));

        let response = handler.handle(Request::search("q", Some(0))).await;
        assert_eq!(response.code, Some(ErrorCode::InvalidRequest));
    }

    #[tokio::test]
    async fn test_ask_degrades_when_chat_fails() {
        let handler = handler();
        handler
            .handle(Request::ingest("Paris is the capital of France.").with_document_id("geo"))
            .await;

        let answer: Answer = payload(handler.handle(Request::ask("capital of France?")).await);
        assert!(matches!(answer.kind, AnswerKind::Fallback { .. }));
        assert_eq!(answer.text, "Paris is the capital of France.");
    }

    #[tokio::test]
    async fn test_chat_failure_is_error_frame() {
        let response = handler().handle(Request::chat("hello")).await;
        assert_eq!(response.chunk_type, ChunkType::Error);
        assert!(response.error.unwrap().contains("503"));
    }

    #[tokio::test]
    async fn test_search_zero_results_rejected() {
        let response = handler().handle(Request::search("q", Some(0))).await;
        assert_eq!(response.chunk_type, ChunkType::Error);
    }
}
