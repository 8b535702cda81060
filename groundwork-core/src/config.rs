use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::models::ModelRegistry;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Largest accepted `rag.chunk_size`, in tokens.
pub const MAX_CHUNK_SIZE: usize = 1 << 20;

/// Configuration for the whole engine.
///
/// Every section has defaults, so a config file only needs the keys it changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub llm: LlmConfig,
    pub system_prompt: String,
    pub rag: RagConfig,
    pub storage: StorageConfig,
    pub server: ServerConfig,
}

/// Which HTTP API the provider speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// OpenAI-compatible `/v1/chat/completions` and `/v1/embeddings`
    OpenAi,
    /// Ollama `/api/chat` and `/api/embed`
    Ollama,
}

/// Configuration for the chat completion provider
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub provider: ProviderKind,
    pub model: String,
    pub base_url: String,
    /// Name of the environment variable holding the API key.
    pub api_key_env: String,
    pub temperature: f64,
    pub timeout_secs: u64,
}

/// Configuration for RAG processing.
///
/// This covers embedding settings and text processing behavior (chunking, indexing).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RagConfig {
    pub embedding_model: String,
    /// Overrides the dimension known to the model registry.
    pub embedding_dim: Option<usize>,
    /// Target chunk size in tokens, at most [`MAX_CHUNK_SIZE`].
    pub chunk_size: usize,
    /// A sentence break is only used as a cut point past this many characters.
    pub min_chunk_chars: usize,
    /// Chunks this short or shorter are discarded.
    pub min_embed_chars: usize,
    /// Maximum number of chunks kept per document.
    pub max_chunks: usize,
    /// Number of texts sent per embedding request.
    pub batch_size: usize,
    pub indexer: IndexerConfig,
}

/// Configuration for directory ingestion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexerConfig {
    /// File extensions to ingest (e.g., ["md", "txt"])
    /// Empty list (default) means every readable text file
    #[serde(default)]
    pub extensions: Vec<String>,

    /// Patterns to exclude - skips directories/files containing these strings
    #[serde(default = "default_exclude_patterns")]
    pub exclude_patterns: Vec<String>,
}

fn default_exclude_patterns() -> Vec<String> {
    crate::patterns::default_exclude_patterns()
}

/// Retrieval settings for the in-memory store.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Number of chunks retrieved to ground an answer
    pub top_k: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub socket_path: String,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            extensions: Vec::new(),
            exclude_patterns: default_exclude_patterns(),
        }
    }
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            embedding_model: "text-embedding-3-small".to_string(),
            embedding_dim: None,
            chunk_size: 512,
            min_chunk_chars: 350,
            min_embed_chars: 5,
            max_chunks: 10_000,
            batch_size: 32,
            indexer: IndexerConfig::default(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self { top_k: 4 }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            socket_path: "/tmp/groundwork.sock".to_string(),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::OpenAi,
            model: "gpt-4o-mini".to_string(),
            base_url: "https://api.openai.com".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            temperature: 0.7,
            timeout_secs: 60,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            llm: LlmConfig::default(),
            system_prompt: "You are a helpful assistant.".to_string(),
            rag: RagConfig::default(),
            storage: StorageConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

impl RagConfig {
    /// Embedding dimension every stored vector must have, if known.
    ///
    /// An explicit `embedding_dim` wins over the model registry.
    pub fn expected_dim(&self) -> Option<usize> {
        self.embedding_dim.or_else(|| {
            ModelRegistry::new()
                .get_embedding(&self.embedding_model)
                .map(|m| m.embedding_dim)
        })
    }
}

impl Config {
    /// Load configuration from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from `config.yaml` if it exists, otherwise use defaults.
    pub fn load_or_default() -> Self {
        Self::load("config.yaml").unwrap_or_default()
    }

    pub fn validate(&self) -> Result<()> {
        if self.rag.chunk_size == 0 || self.rag.chunk_size > MAX_CHUNK_SIZE {
            return Err(ConfigError::Invalid(format!(
                "rag.chunk_size must be in 1..={MAX_CHUNK_SIZE}"
            )));
        }
        if self.rag.batch_size == 0 {
            return Err(ConfigError::Invalid("rag.batch_size must be > 0".into()));
        }
        if self.rag.max_chunks == 0 {
            return Err(ConfigError::Invalid("rag.max_chunks must be > 0".into()));
        }
        if self.rag.embedding_dim == Some(0) {
            return Err(ConfigError::Invalid("rag.embedding_dim must be > 0".into()));
        }
        if self.storage.top_k == 0 {
            return Err(ConfigError::Invalid("storage.top_k must be > 0".into()));
        }
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(ConfigError::Invalid(
                "llm.temperature must be in [0.0, 2.0]".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_rag_config_defaults() {
        let config = RagConfig::default();
        assert_eq!(config.embedding_model, "text-embedding-3-small");
        assert_eq!(config.chunk_size, 512);
        assert_eq!(config.min_chunk_chars, 350);
        assert_eq!(config.min_embed_chars, 5);
        assert_eq!(config.max_chunks, 10_000);
    }

    #[test]
    fn test_storage_config_defaults() {
        let config = StorageConfig::default();
        assert_eq!(config.top_k, 4);
    }

    #[test]
    fn test_expected_dim_from_registry() {
        let config = RagConfig::default();
        assert_eq!(config.expected_dim(), Some(1536));
    }

    #[test]
    fn test_expected_dim_override() {
        let config = RagConfig {
            embedding_dim: Some(64),
            ..RagConfig::default()
        };
        assert_eq!(config.expected_dim(), Some(64));

        let unknown = RagConfig {
            embedding_model: "my-custom-embedder".to_string(),
            ..RagConfig::default()
        };
        assert_eq!(unknown.expected_dim(), None);
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "llm:\n  provider: ollama\n  model: llama3.2\n  base_url: http://localhost:11434\nstorage:\n  top_k: 2"
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.llm.provider, ProviderKind::Ollama);
        assert_eq!(config.llm.model, "llama3.2");
        assert_eq!(config.llm.api_key_env, "OPENAI_API_KEY");
        assert_eq!(config.storage.top_k, 2);
        assert_eq!(config.rag.chunk_size, 512);
        assert!(!config.rag.indexer.exclude_patterns.is_empty());
    }

    #[test]
    fn test_invalid_top_k_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "storage:\n  top_k: 0").unwrap();

        let err = Config::load(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_oversized_chunk_size_rejected() {
        let mut config = Config::default();
        config.rag.chunk_size = MAX_CHUNK_SIZE;
        assert!(config.validate().is_ok());

        config.rag.chunk_size = MAX_CHUNK_SIZE + 1;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "rag:\n  chunk_size: {}", usize::MAX / 2).unwrap();
        assert!(matches!(Config::load(file.path()), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_missing_file() {
        let err = Config::load("/definitely/not/here.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::FileRead(_)));
    }
}
