//! Text extraction from uploaded bytes and files.
//!
//! Only UTF-8 text formats are supported. Anything that does not decode as
//! UTF-8, or that carries NUL bytes, is treated as binary and rejected.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur while turning raw input into text.
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{name} is not valid UTF-8 text")]
    Binary {
        name: String,
        #[source]
        source: Option<std::str::Utf8Error>,
    },

    #[error("{0} contains no text")]
    Empty(String),

    #[error("no chunk of {0} is long enough to embed")]
    NoEmbeddableText(String),
}

const UTF8_BOM: &str = "\u{feff}";

/// Decodes `bytes` as text. `name` is only used in error messages.
pub fn extract_text(name: &str, bytes: &[u8]) -> Result<String, ExtractionError> {
    let text = std::str::from_utf8(bytes).map_err(|e| ExtractionError::Binary {
        name: name.to_string(),
        source: Some(e),
    })?;

    if text.contains('\0') {
        return Err(ExtractionError::Binary {
            name: name.to_string(),
            source: None,
        });
    }

    let text = text.strip_prefix(UTF8_BOM).unwrap_or(text);
    if text.trim().is_empty() {
        return Err(ExtractionError::Empty(name.to_string()));
    }
    Ok(text.to_string())
}

/// Reads a file and extracts its text.
pub async fn extract_file(path: &Path) -> Result<String, ExtractionError> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|source| ExtractionError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    extract_text(&path.display().to_string(), &bytes)
}

/// File name component of `path`, used as `filename` metadata.
pub fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
