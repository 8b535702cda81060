mod common;

use common::{long_document, test_config, MockProvider};
use groundwork_core::chat::{AnswerKind, NO_RELEVANT_INFORMATION};
use groundwork_core::rag::{
    chunk_text, ChunkingPolicy, DocumentError, IngestRequest, RagEngine, RagError,
    DOCUMENT_ID_METADATA_KEY, FILENAME_METADATA_KEY,
};
use async_trait::async_trait;
use groundwork_core::provider::{self, ChatRequest, ChatResponse, Message, Provider};
use groundwork_core::rag::StoreError;
use groundwork_core::ChatManager;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[tokio::test]
async fn exact_chunk_text_ranks_first() {
    let config = test_config();
    let engine = RagEngine::new(&config, MockProvider::new());

    let docs = [("alpha", long_document("alpha", 12)), ("beta", long_document("beta", 12))];
    for (id, text) in &docs {
        engine
            .ingest(IngestRequest::new(text.clone()).with_document_id(*id))
            .await
            .unwrap();
    }

    let policy = ChunkingPolicy::from(&config.rag);
    for (id, text) in &docs {
        let chunks = chunk_text(text, &policy);
        assert!(chunks.len() > 1, "expected {id} to span several chunks");

        for (i, chunk) in chunks.iter().enumerate() {
            let hits = engine.search(chunk, 3).await.unwrap();
            assert_eq!(hits[0].id, format!("{id}#{i}"));
            assert!((hits[0].score - 1.0).abs() < 1e-5, "score was {}", hits[0].score);
            assert_eq!(hits[0].text, *chunk);
        }
    }
}

#[tokio::test]
async fn max_results_caps_hits() {
    let engine = RagEngine::new(&test_config(), MockProvider::new());
    let report = engine
        .ingest(IngestRequest::new(long_document("gamma", 30)))
        .await
        .unwrap();
    assert!(report.chunk_count > 5);

    for k in [1, 3, 5] {
        assert_eq!(engine.search("gamma paragraph", k).await.unwrap().len(), k);
    }
    let all = engine.search("gamma paragraph", 1000).await.unwrap();
    assert_eq!(all.len(), report.chunk_count);
    assert!(all.windows(2).all(|w| w[0].score >= w[1].score));
}

#[tokio::test]
async fn empty_store_returns_nothing_without_provider_calls() {
    let provider = MockProvider::new();
    let manager = ChatManager::new(test_config(), provider.clone());

    assert!(manager.rag().search("anything", 4).await.unwrap().is_empty());

    let answer = manager.ask("anything").await.unwrap();
    assert_eq!(answer.text, NO_RELEVANT_INFORMATION);
    assert_eq!(answer.kind, AnswerKind::NoContext);
    assert_eq!(provider.embed_calls(), 0);
    assert_eq!(provider.chat_calls(), 0);
}

#[tokio::test]
async fn same_text_under_two_ids_is_stored_twice() {
    let engine = RagEngine::new(&test_config(), MockProvider::new());
    let text = "Ferris is the unofficial mascot of the Rust language.";

    engine.ingest(IngestRequest::new(text).with_document_id("first")).await.unwrap();
    engine.ingest(IngestRequest::new(text).with_document_id("second")).await.unwrap();

    assert_eq!(engine.count().await, 2);
    let docs: Vec<_> = engine.documents().await.into_iter().map(|d| d.document_id).collect();
    assert_eq!(docs, vec!["first", "second"]);

    let hits = engine.search(text, 2).await.unwrap();
    assert_eq!(hits[0].id, "first#0");
    assert_eq!(hits[1].id, "second#0");
    assert_eq!(hits[0].score, hits[1].score);
    assert_eq!(hits[1].metadata.get(DOCUMENT_ID_METADATA_KEY).unwrap(), "second");
}

#[tokio::test]
async fn duplicate_document_id_is_rejected() {
    let engine = RagEngine::new(&test_config(), MockProvider::new());
    engine
        .ingest(IngestRequest::new("Original content here.").with_document_id("doc"))
        .await
        .unwrap();

    let err = engine
        .ingest(IngestRequest::new("Replacement content here.").with_document_id("doc"))
        .await
        .unwrap_err();
    assert!(matches!(err, RagError::DuplicateDocument(ref id) if id == "doc"));
    assert_eq!(engine.count().await, 1);
}

#[tokio::test]
async fn failed_embedding_leaves_no_partial_document() {
    let engine = RagEngine::new(&test_config(), MockProvider::poisoned("alphatopic9"));
    engine
        .ingest(IngestRequest::new("A harmless note that embeds fine.").with_document_id("ok"))
        .await
        .unwrap();

    // Chunks before the poisoned one embed successfully in earlier batches.
    let err = engine
        .ingest(IngestRequest::new(long_document("alpha", 12)).with_document_id("bad"))
        .await
        .unwrap_err();
    match err {
        RagError::DocumentProcessing { document_id, source } => {
            assert_eq!(document_id, "bad");
            assert!(matches!(source, DocumentError::Embedding(_)));
        }
        other => panic!("expected document processing error, got {other:?}"),
    }

    assert_eq!(engine.count().await, 1);
    let docs = engine.documents().await;
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].document_id, "ok");
}

#[tokio::test]
async fn text_too_short_to_embed_is_a_processing_error() {
    let provider = MockProvider::new();
    let engine = RagEngine::new(&test_config(), provider.clone());

    let err = engine.ingest(IngestRequest::new("hi")).await.unwrap_err();
    assert!(matches!(
        err,
        RagError::DocumentProcessing { source: DocumentError::Extraction(_), .. }
    ));
    assert_eq!(provider.embed_calls(), 0);
}

#[tokio::test]
async fn invalid_search_requests() {
    let engine = RagEngine::new(&test_config(), MockProvider::new());
    assert!(matches!(engine.search("q", 0).await, Err(RagError::InvalidRequest(_))));
    assert!(matches!(engine.search("  ", 3).await, Err(RagError::InvalidRequest(_))));
}

#[tokio::test]
async fn generated_document_ids_are_unique() {
    let engine = RagEngine::new(&test_config(), MockProvider::new());
    let a = engine.ingest(IngestRequest::new("Some first text.")).await.unwrap();
    let b = engine.ingest(IngestRequest::new("Some first text.")).await.unwrap();
    assert_ne!(a.document_id, b.document_id);
    assert_eq!(engine.count().await, 2);
}

#[tokio::test]
async fn synthesis_failure_degrades_to_retrieved_text() {
    let provider = MockProvider::failing_chat();
    let manager = ChatManager::new(test_config(), provider.clone());
    manager
        .rag()
        .ingest(
            IngestRequest::new("The lighthouse keeper lights the lamp at dusk.")
                .with_document_id("keeper")
                .with_metadata(FILENAME_METADATA_KEY, "keeper.txt"),
        )
        .await
        .unwrap();

    let answer = manager.ask("When is the lamp lit?").await.unwrap();
    assert_eq!(provider.chat_calls(), 1);
    assert_eq!(answer.text, "The lighthouse keeper lights the lamp at dusk.");
    assert!(matches!(answer.kind, AnswerKind::Fallback { ref reason } if reason.contains("503")));
    assert_eq!(answer.sources, vec!["keeper.txt"]);
}

#[tokio::test]
async fn grounded_answer_lists_sources() {
    let manager = ChatManager::new(test_config(), MockProvider::new());
    manager
        .rag()
        .ingest(
            IngestRequest::new("Tide tables predict high water twice a day.")
                .with_document_id("tides")
                .with_metadata(FILENAME_METADATA_KEY, "tides.md"),
        )
        .await
        .unwrap();

    let answer = manager.ask("How often is high water?").await.unwrap();
    assert_eq!(answer.kind, AnswerKind::Grounded);
    assert_eq!(answer.text, "According to the sources [1].\n\nSources:\n- tides.md");
}

#[tokio::test]
async fn concurrent_ingestion() {
    let engine = Arc::new(RagEngine::new(&test_config(), MockProvider::new()));

    let tasks: Vec<_> = (0..16)
        .map(|i| {
            let engine = Arc::clone(&engine);
            tokio::spawn(async move {
                engine
                    .ingest(IngestRequest::new(format!("Document number {i} has its own words.")))
                    .await
            })
        })
        .collect();
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    assert_eq!(engine.count().await, 16);
    assert_eq!(engine.documents().await.len(), 16);
}

/// Embeds the first batch at width 3 and every later one at width 2.
struct Narrowing {
    calls: AtomicUsize,
}

#[async_trait]
impl Provider for Narrowing {
    fn name(&self) -> &'static str {
        "narrowing"
    }

    async fn chat(&self, request: ChatRequest) -> provider::Result<ChatResponse> {
        Ok(ChatResponse {
            model: request.model,
            message: Message::assistant("answered"),
        })
    }

    async fn embed(&self, texts: &[String], _model: &str) -> provider::Result<Vec<Vec<f32>>> {
        let width = if self.calls.fetch_add(1, Ordering::SeqCst) == 0 { 3 } else { 2 };
        Ok(texts.iter().map(|_| vec![1.0; width]).collect())
    }
}

#[tokio::test]
async fn query_of_another_dimension_is_rejected() {
    let mut config = test_config();
    config.rag.embedding_dim = None;
    config.rag.embedding_model = "unregistered-embedder".to_string();
    let manager = ChatManager::new(config, Arc::new(Narrowing { calls: AtomicUsize::new(0) }));

    manager
        .rag()
        .ingest(IngestRequest::new("Cats sleep for most of the day.").with_document_id("cats"))
        .await
        .unwrap();

    let err = manager.rag().search("dogs", 3).await.unwrap_err();
    assert!(matches!(
        err,
        RagError::Store(StoreError::QueryDimensionMismatch { expected: 3, actual: 2 })
    ));
    assert!(manager.ask("dogs").await.is_err());
}
