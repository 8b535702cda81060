//! groundwork - Ask questions about your own documents
//!
//! This is the convenience wrapper crate that re-exports the groundwork
//! engine under one name.
//!
//! # Quick Start
//!
//! ```no_run
//! use groundwork::prelude::*;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = Config::load_or_default();
//! let provider = create_provider(&config)?;
//! let manager = ChatManager::new(config, provider);
//!
//! manager.rag().ingest(IngestRequest::new("Rust 1.0 shipped in May 2015.")).await?;
//! let answer = manager.ask("When did Rust 1.0 ship?").await?;
//! println!("{}", answer.text);
//! # Ok(())
//! # }
//! ```

pub use groundwork_core::*;

/// Prelude module for convenient imports
pub mod prelude {
    pub use groundwork_core::provider::create_provider;
    pub use groundwork_core::rag::{IngestRequest, SearchHit, VectorStore};
    pub use groundwork_core::server::Client;
    pub use groundwork_core::*;
}
