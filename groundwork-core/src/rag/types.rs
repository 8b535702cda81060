use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Metadata key reserved for ids; never exposed in search results.
pub const ID_METADATA_KEY: &str = "id";
/// Metadata key holding the owning document id.
pub const DOCUMENT_ID_METADATA_KEY: &str = "document_id";
/// Metadata key holding the chunk's position inside its document.
pub const CHUNK_INDEX_METADATA_KEY: &str = "chunk_index";
/// Metadata key holding the originating file name, used for source footers.
pub const FILENAME_METADATA_KEY: &str = "filename";

/// A bounded span of a document's text together with its embedding.
///
/// Chunks are created during ingestion and never modified afterwards.
/// A document is simply the set of chunks sharing a `document_id`.
///
/// # Example
///
/// ```no_run
/// # use groundwork_core::rag::Chunk;
/// let chunk = Chunk::new("guide#0", "guide", "Hello world", vec![0.1, 0.2, 0.3])
///     .with_metadata("filename", "guide.md");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub id: String,
    pub document_id: String,
    pub text: String,
    pub embedding: Vec<f32>,
    pub metadata: HashMap<String, String>,
}

impl Chunk {
    pub fn new(
        id: impl Into<String>,
        document_id: impl Into<String>,
        text: impl Into<String>,
        embedding: Vec<f32>,
    ) -> Self {
        Self {
            id: id.into(),
            document_id: document_id.into(),
            text: text.into(),
            embedding,
            metadata: HashMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Name shown in a "sources" footer: the file name if known, else the document id.
    pub fn source_name(&self) -> &str {
        self.metadata
            .get(FILENAME_METADATA_KEY)
            .map(String::as_str)
            .unwrap_or(&self.document_id)
    }
}

/// A stored chunk paired with its similarity to a query.
///
/// Returned by vector search operations, ordered by descending score.
///
/// # Score Range
///
/// Cosine similarity lies in `[-1.0, 1.0]`; `1.0` means the vectors point the
/// same way. Text embeddings mostly land between `0.0` and `1.0`.
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    pub score: f32,
}

/// Public shape of a similarity search result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: String,
    pub text: String,
    /// Chunk metadata without the internal id key.
    pub metadata: HashMap<String, String>,
    pub score: f32,
}

impl From<&ScoredChunk> for SearchHit {
    fn from(scored: &ScoredChunk) -> Self {
        let mut metadata = scored.chunk.metadata.clone();
        metadata.remove(ID_METADATA_KEY);
        Self {
            id: scored.chunk.id.clone(),
            text: scored.chunk.text.clone(),
            metadata,
            score: scored.score,
        }
    }
}

/// Input to [`RagEngine::ingest`](super::RagEngine::ingest).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IngestRequest {
    pub text: String,
    /// Assigned (UUID v4) when absent.
    #[serde(default)]
    pub document_id: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl IngestRequest {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn with_document_id(mut self, id: impl Into<String>) -> Self {
        self.document_id = Some(id.into());
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// Outcome of a successful document ingestion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestReport {
    pub document_id: String,
    pub chunk_count: usize,
}

/// A document known to the store, with the number of chunks it owns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentSummary {
    pub document_id: String,
    pub chunk_count: usize,
}
