//! Retrieval Augmented Generation (RAG) system.
//!
//! This module implements the retrieval half of the pipeline: documents go
//! in, ranked chunks come out. Answer generation lives in [`crate::chat`].
//!
//! # Architecture
//!
//! - [`RagEngine`]: orchestrates ingestion and search
//! - [`embedder`]: converts text to vector embeddings via the provider
//! - [`store`]: vector storage with brute-force cosine similarity search
//! - [`indexer`]: text chunking and directory walking
//! - [`extract`]: turning uploaded bytes into text
//!
//! # How It Works
//!
//! 1. **Ingestion**:
//!    - Text is split into chunks (≈512 tokens, preferring sentence ends)
//!    - Every chunk is embedded, in batches
//!    - All chunks of the document are appended to the store in one write
//!
//! 2. **Retrieval**:
//!    - The query is embedded with the same model
//!    - Every stored chunk is scored by cosine similarity
//!    - The top `max_results` chunks are returned

pub mod embedder;
pub mod extract;
pub mod indexer;
pub mod store;
mod types;

pub use embedder::{Embedder, EmbeddingError};
pub use extract::ExtractionError;
pub use indexer::{chunk_text, ChunkingPolicy};
pub use store::{cosine_similarity, InMemoryStore, StoreError, VectorStore};
pub use types::{
    Chunk, DocumentSummary, IngestReport, IngestRequest, ScoredChunk, SearchHit,
    CHUNK_INDEX_METADATA_KEY, DOCUMENT_ID_METADATA_KEY, FILENAME_METADATA_KEY, ID_METADATA_KEY,
};

use crate::config::{Config, IndexerConfig};
use crate::provider::Provider;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// The cause of a failed document ingestion.
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error(transparent)]
    Embedding(#[from] EmbeddingError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Error)]
pub enum RagError {
    /// Ingestion failed; nothing of the document was stored.
    #[error("Failed to process document {document_id}: {source}")]
    DocumentProcessing {
        document_id: String,
        #[source]
        source: DocumentError,
    },

    #[error("Document {0} already exists")]
    DuplicateDocument(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Failed to embed query: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Failed to read directory {path}: {source}")]
    Directory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, RagError>;

fn document_error(document_id: &str, source: impl Into<DocumentError>) -> RagError {
    RagError::DocumentProcessing {
        document_id: document_id.to_string(),
        source: source.into(),
    }
}

/// A file left out of a directory ingestion, and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: String,
}

/// Outcome of [`RagEngine::ingest_directory`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryReport {
    pub ingested: Vec<IngestReport>,
    pub skipped: Vec<SkippedFile>,
}

/// Ties together the embedder, vector store, and chunking policy.
///
/// # Thread Safety
///
/// The engine is `Clone` and can be shared across tasks. The store is held
/// as `Arc<dyn VectorStore>` and handles its own locking.
#[derive(Clone)]
pub struct RagEngine {
    embedder: Embedder,
    store: Arc<dyn VectorStore>,
    policy: ChunkingPolicy,
    indexer: IndexerConfig,
}

impl RagEngine {
    /// Creates an engine backed by a fresh [`InMemoryStore`].
    pub fn new(config: &Config, provider: Arc<dyn Provider>) -> Self {
        Self::with_store(config, provider, Arc::new(InMemoryStore::new()))
    }

    /// Creates an engine over an existing store.
    pub fn with_store(
        config: &Config,
        provider: Arc<dyn Provider>,
        store: Arc<dyn VectorStore>,
    ) -> Self {
        let embedder = Embedder::new(provider, config.rag.embedding_model.clone())
            .with_batch_size(config.rag.batch_size)
            .with_expected_dim(config.rag.expected_dim());

        Self {
            embedder,
            store,
            policy: ChunkingPolicy::from(&config.rag),
            indexer: config.rag.indexer.clone(),
        }
    }

    /// Splits, embeds, and stores one document.
    ///
    /// The document id is generated when the request has none. Ingestion is
    /// atomic: on any error no chunk of the document remains in the store.
    ///
    /// # Errors
    ///
    /// - [`RagError::DuplicateDocument`] if the id is already stored
    /// - [`RagError::DocumentProcessing`] if the text yields no embeddable
    ///   chunk, embedding fails, or the store rejects the chunks
    pub async fn ingest(&self, request: IngestRequest) -> Result<IngestReport> {
        let document_id = request
            .document_id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        if self.store.contains_document(&document_id).await {
            return Err(RagError::DuplicateDocument(document_id));
        }

        if request.text.trim().is_empty() {
            return Err(document_error(
                &document_id,
                ExtractionError::Empty(document_id.clone()),
            ));
        }

        let texts = chunk_text(&request.text, &self.policy);
        if texts.is_empty() {
            return Err(document_error(
                &document_id,
                ExtractionError::NoEmbeddableText(document_id.clone()),
            ));
        }
        debug!(document_id = %document_id, chunks = texts.len(), "Document split");

        let embeddings = self
            .embedder
            .embed_batch(&texts)
            .await
            .map_err(|e| document_error(&document_id, e))?;

        let chunks: Vec<Chunk> = texts
            .into_iter()
            .zip(embeddings)
            .enumerate()
            .map(|(i, (text, embedding))| {
                let mut chunk = Chunk::new(format!("{document_id}#{i}"), &document_id, text, embedding);
                chunk.metadata = request.metadata.clone();
                chunk
                    .with_metadata(DOCUMENT_ID_METADATA_KEY, &document_id)
                    .with_metadata(CHUNK_INDEX_METADATA_KEY, i.to_string())
            })
            .collect();
        let chunk_count = chunks.len();

        self.store
            .add(chunks)
            .await
            .map_err(|e| document_error(&document_id, e))?;

        info!(document_id = %document_id, chunks = chunk_count, "Document ingested");
        Ok(IngestReport {
            document_id,
            chunk_count,
        })
    }

    /// Extracts text from uploaded bytes and ingests it.
    ///
    /// `name` is recorded as the `filename` metadata and used as the document
    /// id when none is given.
    pub async fn ingest_bytes(
        &self,
        name: &str,
        bytes: &[u8],
        document_id: Option<String>,
        metadata: HashMap<String, String>,
    ) -> Result<IngestReport> {
        let document_id = document_id.unwrap_or_else(|| name.to_string());
        let text = extract::extract_text(name, bytes).map_err(|e| document_error(&document_id, e))?;

        let mut request = IngestRequest {
            text,
            document_id: Some(document_id),
            metadata,
        };
        request
            .metadata
            .insert(FILENAME_METADATA_KEY.to_string(), name.to_string());
        self.ingest(request).await
    }

    /// Reads and ingests a single file. The document id is the file path.
    pub async fn ingest_file(&self, path: &Path) -> Result<IngestReport> {
        let document_id = path.display().to_string();
        let text = extract::extract_file(path)
            .await
            .map_err(|e| document_error(&document_id, e))?;

        let request = IngestRequest::new(text)
            .with_document_id(document_id)
            .with_metadata(FILENAME_METADATA_KEY, extract::file_name(path));
        self.ingest(request).await
    }

    /// Recursively ingests every file below `dir_path`, one document per file.
    ///
    /// Files that cannot be turned into embeddable text, or that are already
    /// ingested, are skipped and reported. Embedding or store failures stop
    /// the walk; documents ingested before the failure are kept.
    pub async fn ingest_directory(&self, dir_path: &Path) -> Result<DirectoryReport> {
        let files = indexer::collect_files(dir_path, &self.indexer)
            .await
            .map_err(|source| RagError::Directory {
                path: dir_path.to_path_buf(),
                source,
            })?;
        info!(dir = %dir_path.display(), files = files.len(), "Ingesting directory");

        let mut report = DirectoryReport::default();
        for path in files {
            match self.ingest_file(&path).await {
                Ok(ingested) => report.ingested.push(ingested),
                Err(RagError::DocumentProcessing {
                    source: DocumentError::Extraction(e),
                    ..
                }) => {
                    warn!(file = %path.display(), error = %e, "Skipping file");
                    report.skipped.push(SkippedFile {
                        path,
                        reason: e.to_string(),
                    });
                }
                Err(e @ RagError::DuplicateDocument(_)) => {
                    warn!(file = %path.display(), "Skipping already ingested file");
                    report.skipped.push(SkippedFile {
                        path,
                        reason: e.to_string(),
                    });
                }
                Err(e) => return Err(e),
            }
        }

        Ok(report)
    }

    /// Returns the stored chunks most similar to `query`.
    ///
    /// An empty store returns no results without calling the provider.
    ///
    /// # Errors
    ///
    /// [`RagError::InvalidRequest`] for a blank query or `max_results == 0`,
    /// [`RagError::Embedding`] if the query cannot be embedded, and
    /// [`RagError::Store`] if its dimension differs from the stored chunks.
    pub async fn retrieve(&self, query: &str, max_results: usize) -> Result<Vec<ScoredChunk>> {
        if max_results == 0 {
            return Err(RagError::InvalidRequest("max_results must be > 0".into()));
        }
        if query.trim().is_empty() {
            return Err(RagError::InvalidRequest("query must not be empty".into()));
        }

        let count = self.store.count().await;
        if count == 0 {
            debug!("Knowledge base is empty, returning no results");
            return Ok(Vec::new());
        }

        let query_embedding = self.embedder.embed(query).await?;
        let results = self.store.search(&query_embedding, max_results).await?;

        debug!(
            candidates = count,
            returned = results.len(),
            top_score = results.first().map(|r| r.score),
            "Similarity search complete"
        );
        Ok(results)
    }

    /// Similarity search returning the public hit shape.
    pub async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>> {
        let results = self.retrieve(query, max_results).await?;
        Ok(results.iter().map(SearchHit::from).collect())
    }

    /// Total number of chunks in the knowledge base.
    pub async fn count(&self) -> usize {
        self.store.count().await
    }

    /// Documents in the knowledge base with their chunk counts.
    pub async fn documents(&self) -> Vec<DocumentSummary> {
        self.store.documents().await
    }

    /// Removes every chunk from the knowledge base, returning how many were removed.
    pub async fn clear(&self) -> usize {
        let removed = self.store.clear().await;
        info!(removed, "Knowledge base cleared");
        removed
    }
}
