//! Unix socket server exposing the knowledge base and chat.
//!
//! The server is organized into separate concerns:
//! - `types`: Protocol types for requests and responses
//! - `handler`: Business logic for processing requests
//! - `transport`: Unix socket framing (one JSON object per line)
//! - `client`: The other end of the socket
//!
//! Each connection carries one request line and receives one response frame.

mod client;
mod handler;
mod transport;
mod types;

pub use client::Client;
pub use handler::RequestHandler;
pub use transport::{TransportError, UnixSocketTransport};
pub use types::{
    ChatReply, ChunkType, ErrorCode, Request, RequestType, ResetReport, Stats, StreamChunk,
};

use crate::chat::ChatManager;
use crate::config::Config;
use crate::provider::Provider;
use std::future::Future;
use std::sync::Arc;
use tokio::net::UnixStream;
use tokio::signal;
use tracing::{debug, info, warn};

/// Main server coordinating transport and request handling.
pub struct Server {
    handler: Arc<RequestHandler>,
    transport: UnixSocketTransport,
}

impl Server {
    /// Creates a server with an empty knowledge base, listening on
    /// `server.socket_path`.
    pub fn new(config: Config, provider: Arc<dyn Provider>) -> Self {
        Self::with_manager(ChatManager::new(config, provider))
    }

    pub fn with_manager(manager: ChatManager) -> Self {
        let transport = UnixSocketTransport::new(&manager.config().server.socket_path);
        Self {
            handler: Arc::new(RequestHandler::new(manager)),
            transport,
        }
    }

    /// Listens until Ctrl-C, then removes the socket file.
    pub async fn start(&self) -> Result<(), TransportError> {
        self.serve_until(async {
            if let Err(e) = signal::ctrl_c().await {
                warn!(error = %e, "Failed to listen for Ctrl-C");
                std::future::pending::<()>().await;
            }
        })
        .await
    }

    /// Listens until `shutdown` resolves, then removes the socket file.
    pub async fn serve_until<F>(&self, shutdown: F) -> Result<(), TransportError>
    where
        F: Future<Output = ()>,
    {
        let listener = self.transport.bind()?;
        info!(socket = %self.transport.socket_path().display(), "Server listening");

        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok((stream, _)) => {
                        let handler = Arc::clone(&self.handler);
                        tokio::spawn(async move {
                            if let Err(e) = handle_connection(stream, handler).await {
                                warn!(error = %e, "Connection error");
                            }
                        });
                    }
                    Err(e) => warn!(error = %e, "Failed to accept connection"),
                },
                _ = &mut shutdown => {
                    info!("Shutting down");
                    self.transport.cleanup();
                    break;
                }
            }
        }

        Ok(())
    }
}

/// Handles a single client connection.
async fn handle_connection(
    stream: UnixStream,
    handler: Arc<RequestHandler>,
) -> Result<(), TransportError> {
    let mut conn = transport::framed(stream);

    let response = match transport::read_request(&mut conn).await {
        Ok(request) => handler.handle(request).await,
        Err(e @ (TransportError::Json(_) | TransportError::Codec(_))) => {
            StreamChunk::error(format!("Invalid request: {e}"))
        }
        Err(e) => return Err(e),
    };

    transport::write_chunk(&mut conn, &response).await?;
    debug!(response_type = ?response.chunk_type, "Response sent");
    Ok(())
}
