use super::types::{ErrorCode, Request, StreamChunk};
use crate::rag::ExtractionError;
use futures::{SinkExt, StreamExt};
use serde::{de::DeserializeOwned, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::net::{UnixListener, UnixStream};
use tokio_util::codec::{Framed, LinesCodec, LinesCodecError};

/// Longest accepted frame. Ingest requests carry whole documents.
pub const MAX_FRAME_LEN: usize = 16 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Framing error: {0}")]
    Codec(#[from] LinesCodecError),

    #[error("Connection closed before a complete frame was received")]
    ConnectionClosed,

    /// A local file could not be turned into text.
    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    /// The server answered with an error frame.
    #[error("{message}")]
    Server {
        message: String,
        code: Option<ErrorCode>,
    },
}

impl TransportError {
    /// Whether a directory walk may skip the file that caused this error.
    ///
    /// True for local extraction failures and for server rejections of a
    /// duplicate id or unembeddable text.
    pub fn is_skippable(&self) -> bool {
        matches!(
            self,
            Self::Extraction(_)
                | Self::Server {
                    code: Some(ErrorCode::DuplicateDocument | ErrorCode::Extraction),
                    ..
                }
        )
    }
}

pub type Result<T> = std::result::Result<T, TransportError>;

/// Newline-delimited JSON over a Unix stream.
pub type Connection = Framed<UnixStream, LinesCodec>;

pub fn framed(stream: UnixStream) -> Connection {
    Framed::new(stream, LinesCodec::new_with_max_length(MAX_FRAME_LEN))
}

/// Unix socket transport for IPC communication.
pub struct UnixSocketTransport {
    socket_path: PathBuf,
}

impl UnixSocketTransport {
    pub fn new(socket_path: impl Into<PathBuf>) -> Self {
        Self {
            socket_path: socket_path.into(),
        }
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// Binds to the Unix socket, replacing a stale socket file.
    pub fn bind(&self) -> Result<UnixListener> {
        if self.socket_path.exists() {
            std::fs::remove_file(&self.socket_path)?;
        }

        let listener = UnixListener::bind(&self.socket_path)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o600);
            std::fs::set_permissions(&self.socket_path, perms)?;
        }

        Ok(listener)
    }

    /// Removes the socket file.
    pub fn cleanup(&self) {
        let _ = std::fs::remove_file(&self.socket_path);
    }
}

/// Reads one JSON frame.
pub async fn read_frame<T: DeserializeOwned>(conn: &mut Connection) -> Result<T> {
    let line = conn.next().await.ok_or(TransportError::ConnectionClosed)??;
    Ok(serde_json::from_str(&line)?)
}

/// Writes one JSON frame and flushes it.
pub async fn write_frame<T: Serialize>(conn: &mut Connection, frame: &T) -> Result<()> {
    let json = serde_json::to_string(frame)?;
    conn.send(json).await?;
    Ok(())
}

pub async fn read_request(conn: &mut Connection) -> Result<Request> {
    read_frame(conn).await
}

pub async fn write_chunk(conn: &mut Connection, chunk: &StreamChunk) -> Result<()> {
    write_frame(conn, chunk).await
}
