//! Text chunking and directory walking for ingestion.
//!
//! This module provides functionality to:
//! - Split text into bounded chunks that prefer sentence boundaries
//! - Recursively collect files from directories
//! - Filter files by extension and exclude patterns

use crate::config::{IndexerConfig, RagConfig};
use crate::patterns::should_exclude;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Approximate characters-per-token ratio used to size chunk windows.
const CHARS_PER_TOKEN: usize = 4;

/// Chunking parameters, taken from [`RagConfig`].
#[derive(Debug, Clone, Copy)]
pub struct ChunkingPolicy {
    /// Window size in tokens.
    pub chunk_size: usize,
    /// A sentence break is only used as a cut point past this many characters.
    pub min_chunk_chars: usize,
    /// Pieces with this many characters or fewer are dropped.
    pub min_embed_chars: usize,
    /// Maximum number of chunks produced for one text.
    pub max_chunks: usize,
}

impl From<&RagConfig> for ChunkingPolicy {
    fn from(config: &RagConfig) -> Self {
        Self {
            chunk_size: config.chunk_size,
            min_chunk_chars: config.min_chunk_chars,
            min_embed_chars: config.min_embed_chars,
            max_chunks: config.max_chunks,
        }
    }
}

impl Default for ChunkingPolicy {
    fn default() -> Self {
        Self::from(&RagConfig::default())
    }
}

fn is_sentence_end(c: char) -> bool {
    matches!(c, '.' | '?' | '!' | '\n')
}

/// Splits text into chunks of at most `chunk_size` tokens.
///
/// Each window is cut after its last sentence terminator (`.`, `?`, `!`,
/// newline) when that terminator lies beyond `min_chunk_chars`; otherwise the
/// window is cut at its edge. Pieces are trimmed, short pieces are dropped, and
/// at most `max_chunks` chunks are returned.
///
/// # UTF-8 Safety
///
/// Windows are measured in characters and always cut on character boundaries.
pub fn chunk_text(text: &str, policy: &ChunkingPolicy) -> Vec<String> {
    let window = policy.chunk_size.saturating_mul(CHARS_PER_TOKEN).max(1);
    let mut chunks = Vec::new();
    let mut rest = text;

    while !rest.is_empty() && chunks.len() < policy.max_chunks {
        let end = rest
            .char_indices()
            .nth(window)
            .map(|(i, _)| i)
            .unwrap_or(rest.len());
        let mut piece = &rest[..end];

        if end < rest.len() {
            if let Some(pos) = piece.rfind(is_sentence_end) {
                if piece[..pos].chars().count() > policy.min_chunk_chars {
                    // Terminators are single-byte, so pos + 1 is a boundary.
                    piece = &piece[..pos + 1];
                }
            }
        }

        rest = &rest[piece.len()..];

        let trimmed = piece.trim();
        if trimmed.chars().count() > policy.min_embed_chars {
            chunks.push(trimmed.to_string());
        }
    }

    chunks
}

/// Recursively collects ingestible files below `dir_path`, sorted by path.
///
/// Exclude patterns are matched against the path relative to `dir_path`.
pub async fn collect_files(
    dir_path: impl AsRef<Path>,
    config: &IndexerConfig,
) -> std::io::Result<Vec<PathBuf>> {
    let root = dir_path.as_ref();
    let mut files = Vec::new();
    collect_files_recursive(root, root, &mut files, config).await?;
    files.sort();
    Ok(files)
}

fn collect_files_recursive<'a>(
    root: &'a Path,
    dir: &'a Path,
    files: &'a mut Vec<PathBuf>,
    config: &'a IndexerConfig,
) -> std::pin::Pin<Box<dyn std::future::Future<Output = std::io::Result<()>> + Send + 'a>> {
    Box::pin(async move {
        let mut entries = fs::read_dir(dir).await?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let relative = path.strip_prefix(root).unwrap_or(&path);

            if should_exclude(relative, &config.exclude_patterns) {
                continue;
            }

            let file_type = entry.file_type().await?;
            if file_type.is_dir() {
                collect_files_recursive(root, &path, files, config).await?;
            } else if file_type.is_file() && is_indexable(&path, &config.extensions) {
                files.push(path);
            }
        }

        Ok(())
    })
}

/// Checks if a file should be ingested based on its extension.
///
/// If `extensions` is empty, every file is considered (useful for files
/// without extensions like README or LICENSE).
fn is_indexable(path: &Path, extensions: &[String]) -> bool {
    if extensions.is_empty() {
        return true;
    }

    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
}
