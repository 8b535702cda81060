use super::transport::{self, Result, TransportError};
use super::types::{ChatReply, ChunkType, Request, ResetReport, Stats, StreamChunk};
use crate::chat::Answer;
use crate::config::IndexerConfig;
use crate::rag::{
    extract, indexer, DirectoryReport, IngestReport, SearchHit, SkippedFile, FILENAME_METADATA_KEY,
};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::net::UnixStream;
use tracing::{info, warn};

/// Talks to a running [`Server`](super::Server).
///
/// Every call opens a fresh connection.
#[derive(Debug, Clone)]
pub struct Client {
    socket_path: PathBuf,
}

impl Client {
    pub fn new(socket_path: impl Into<PathBuf>) -> Self {
        Self {
            socket_path: socket_path.into(),
        }
    }

    /// Sends `request` and returns the raw response frame.
    pub async fn send(&self, request: &Request) -> Result<StreamChunk> {
        let stream = UnixStream::connect(&self.socket_path).await?;
        let mut conn = transport::framed(stream);

        transport::write_frame(&mut conn, request).await?;
        transport::read_frame(&mut conn).await
    }

    /// Sends `request` and decodes the payload of the `done` frame.
    ///
    /// An `error` frame becomes [`TransportError::Server`].
    pub async fn call<T: DeserializeOwned>(&self, request: &Request) -> Result<T> {
        let chunk = self.send(request).await?;
        match chunk.chunk_type {
            ChunkType::Done => Ok(serde_json::from_str(&chunk.content)?),
            ChunkType::Error => Err(TransportError::Server {
                message: chunk.error.unwrap_or_else(|| "unknown server error".to_string()),
                code: chunk.code,
            }),
        }
    }

    pub async fn chat(&self, message: &str) -> Result<String> {
        let reply: ChatReply = self.call(&Request::chat(message)).await?;
        Ok(reply.reply)
    }

    pub async fn ask(&self, question: &str) -> Result<Answer> {
        self.call(&Request::ask(question)).await
    }

    pub async fn ingest(&self, request: Request) -> Result<IngestReport> {
        self.call(&request).await
    }

    /// Reads a file locally and sends its text for ingestion.
    ///
    /// The document id defaults to the path; the file name is recorded as
    /// `filename` metadata unless already given.
    ///
    /// # Errors
    ///
    /// A file that cannot be read as text fails with
    /// [`TransportError::Extraction`] before anything is sent.
    pub async fn ingest_file(
        &self,
        path: &Path,
        document_id: Option<String>,
        mut metadata: HashMap<String, String>,
    ) -> Result<IngestReport> {
        let text = extract::extract_file(path).await?;
        metadata
            .entry(FILENAME_METADATA_KEY.to_string())
            .or_insert_with(|| extract::file_name(path));

        let request = Request::ingest(text)
            .with_document_id(document_id.unwrap_or_else(|| path.display().to_string()))
            .with_metadata(metadata);
        self.ingest(request).await
    }

    /// Ingests every file below `dir_path`, one document per file.
    ///
    /// Files without embeddable text and files already in the knowledge base
    /// are skipped and reported. Any other failure stops the walk; documents
    /// sent before it stay ingested.
    pub async fn ingest_directory(
        &self,
        dir_path: &Path,
        config: &IndexerConfig,
        metadata: &HashMap<String, String>,
    ) -> Result<DirectoryReport> {
        let files = indexer::collect_files(dir_path, config).await?;
        info!(dir = %dir_path.display(), files = files.len(), "Sending directory");

        let mut report = DirectoryReport::default();
        for path in files {
            match self.ingest_file(&path, None, metadata.clone()).await {
                Ok(ingested) => report.ingested.push(ingested),
                Err(e) if e.is_skippable() => {
                    warn!(file = %path.display(), error = %e, "Skipping file");
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

    pub async fn search(&self, query: &str, max_results: Option<usize>) -> Result<Vec<SearchHit>> {
        self.call(&Request::search(query, max_results)).await
    }

    pub async fn stats(&self) -> Result<Stats> {
        self.call(&Request::stats()).await
    }

    pub async fn reset(&self) -> Result<ResetReport> {
        self.call(&Request::reset()).await
    }
}
