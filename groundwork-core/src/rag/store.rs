//! Vector store abstraction and the in-memory implementation.
//!
//! The store is a plain list of chunks scanned linearly on every search.
//! There is no index, persistence, or eviction.

use super::types::{Chunk, DocumentSummary, ScoredChunk};
use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::RwLock;

#[derive(Debug, Error)]
pub enum StoreError {
    /// A chunk's embedding does not match the dimensionality of the store.
    #[error("Chunk {chunk_id} has dimension {actual}, store holds dimension {expected}")]
    DimensionMismatch {
        chunk_id: String,
        expected: usize,
        actual: usize,
    },

    /// A query embedding does not match the dimensionality of the store.
    #[error("Query has dimension {actual}, store holds dimension {expected}")]
    QueryDimensionMismatch { expected: usize, actual: usize },

    /// A chunk id is already present.
    #[error("Chunk {0} already exists")]
    DuplicateChunk(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Unified interface for vector storage.
///
/// The engine holds the store as `Arc<dyn VectorStore>`, so tests and
/// alternative backends can be swapped in at construction time.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Appends chunks. Either every chunk is stored or none is.
    async fn add(&self, chunks: Vec<Chunk>) -> Result<()>;

    /// Returns at most `top_k` chunks by descending cosine similarity.
    ///
    /// Chunks with equal scores keep their insertion order. A query whose
    /// length differs from the stored embeddings is rejected.
    async fn search(&self, query_embedding: &[f32], top_k: usize) -> Result<Vec<ScoredChunk>>;

    /// Total number of chunks.
    async fn count(&self) -> usize;

    /// Whether any chunk belongs to `document_id`.
    async fn contains_document(&self, document_id: &str) -> bool;

    /// Known documents with their chunk counts, in first-insertion order.
    async fn documents(&self) -> Vec<DocumentSummary>;

    /// Removes every chunk and returns how many were removed.
    async fn clear(&self) -> usize;
}

/// An in-memory vector store for chunk embeddings.
///
/// Chunks live in a `Vec` behind a `tokio::sync::RwLock`, so insertion order
/// is preserved and concurrent readers do not block each other.
///
/// - **Search**: O(n * d) linear scan over n chunks of dimension d
/// - **Ephemeral**: data is lost when the process ends
#[derive(Default)]
pub struct InMemoryStore {
    chunks: RwLock<Vec<Chunk>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl VectorStore for InMemoryStore {
    async fn add(&self, chunks: Vec<Chunk>) -> Result<()> {
        let mut stored = self.chunks.write().await;

        // Validate the whole batch before touching the list.
        let expected = stored
            .first()
            .or_else(|| chunks.first())
            .map(|c| c.embedding.len());
        if let Some(expected) = expected {
            for chunk in &chunks {
                if chunk.embedding.len() != expected {
                    return Err(StoreError::DimensionMismatch {
                        chunk_id: chunk.id.clone(),
                        expected,
                        actual: chunk.embedding.len(),
                    });
                }
            }
        }
        for (i, chunk) in chunks.iter().enumerate() {
            let seen = stored.iter().any(|c| c.id == chunk.id)
                || chunks[..i].iter().any(|c| c.id == chunk.id);
            if seen {
                return Err(StoreError::DuplicateChunk(chunk.id.clone()));
            }
        }

        stored.extend(chunks);
        Ok(())
    }

    async fn search(&self, query_embedding: &[f32], top_k: usize) -> Result<Vec<ScoredChunk>> {
        let stored = self.chunks.read().await;

        if let Some(first) = stored.first() {
            if first.embedding.len() != query_embedding.len() {
                return Err(StoreError::QueryDimensionMismatch {
                    expected: first.embedding.len(),
                    actual: query_embedding.len(),
                });
            }
        }

        let mut results: Vec<ScoredChunk> = stored
            .iter()
            .map(|chunk| ScoredChunk {
                score: cosine_similarity(query_embedding, &chunk.embedding),
                chunk: chunk.clone(),
            })
            .collect();

        // sort_by is stable: equal scores keep insertion order.
        results.sort_by(|a, b| b.score.total_cmp(&a.score));
        results.truncate(top_k);
        Ok(results)
    }

    async fn count(&self) -> usize {
        self.chunks.read().await.len()
    }

    async fn contains_document(&self, document_id: &str) -> bool {
        self.chunks
            .read()
            .await
            .iter()
            .any(|c| c.document_id == document_id)
    }

    async fn documents(&self) -> Vec<DocumentSummary> {
        let stored = self.chunks.read().await;
        let mut summaries: Vec<DocumentSummary> = Vec::new();
        for chunk in stored.iter() {
            match summaries.iter_mut().find(|s| s.document_id == chunk.document_id) {
                Some(summary) => summary.chunk_count += 1,
                None => summaries.push(DocumentSummary {
                    document_id: chunk.document_id.clone(),
                    chunk_count: 1,
                }),
            }
        }
        summaries
    }

    async fn clear(&self) -> usize {
        let mut stored = self.chunks.write().await;
        let removed = stored.len();
        stored.clear();
        removed
    }
}

/// Computes cosine similarity between two vectors.
///
/// Returns values from -1.0 (opposite) to 1.0 (identical), with 0.0 indicating
/// orthogonal vectors. Returns 0.0 for mismatched lengths or zero magnitude.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let magnitude_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let magnitude_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if magnitude_a < f32::EPSILON || magnitude_b < f32::EPSILON {
        return 0.0;
    }

    dot_product / (magnitude_a * magnitude_b)
}
