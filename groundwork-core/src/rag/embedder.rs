//! Embedding generation using LLM providers.
//!
//! This module converts text into vector embeddings through the provider's
//! embedding endpoint, batching requests and checking the returned shapes.

use crate::provider::{Provider, ProviderError};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Errors that can occur during embedding generation.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    /// The provider API returned an error.
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// The provider returned a different number of vectors than texts sent.
    #[error("Expected {expected} embeddings, got {actual}")]
    CountMismatch { expected: usize, actual: usize },

    /// A vector did not have the dimensionality the model is known to produce.
    #[error("Expected embedding dimension {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// The provider returned a vector with no components.
    #[error("Provider returned an empty embedding")]
    EmptyVector,

    /// The provider returned a vector containing NaN or infinity.
    #[error("Provider returned an embedding with a non-finite component")]
    NonFinite,
}

/// Result type for embedding operations.
pub type Result<T> = std::result::Result<T, EmbeddingError>;

/// Generates vector embeddings for text using a provider embedding model.
///
/// Similar texts produce similar vectors, as measured by cosine similarity.
#[derive(Clone)]
pub struct Embedder {
    provider: Arc<dyn Provider>,
    model: String,
    batch_size: usize,
    expected_dim: Option<usize>,
}

impl Embedder {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            batch_size: 32,
            expected_dim: None,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Rejects vectors whose length differs from `dim`.
    pub fn with_expected_dim(mut self, dim: Option<usize>) -> Self {
        self.expected_dim = dim;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Generates a vector embedding for a single text.
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vectors = self.embed_batch(&[text.to_string()]).await?;
        vectors.pop().ok_or(EmbeddingError::CountMismatch {
            expected: 1,
            actual: 0,
        })
    }

    /// Embeds every text, `batch_size` texts per provider request.
    ///
    /// Returns one vector per input, in input order. All returned vectors
    /// share one dimensionality and hold only finite components.
    pub async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(texts.len());

        for batch in texts.chunks(self.batch_size) {
            debug!(model = %self.model, batch = batch.len(), "Requesting embeddings");
            let embedded = self.provider.embed(batch, &self.model).await?;
            if embedded.len() != batch.len() {
                return Err(EmbeddingError::CountMismatch {
                    expected: batch.len(),
                    actual: embedded.len(),
                });
            }
            vectors.extend(embedded);
        }

        let expected = self
            .expected_dim
            .or_else(|| vectors.first().map(Vec::len));
        if let Some(expected) = expected {
            for vector in &vectors {
                if vector.is_empty() {
                    return Err(EmbeddingError::EmptyVector);
                }
                if vector.len() != expected {
                    return Err(EmbeddingError::DimensionMismatch {
                        expected,
                        actual: vector.len(),
                    });
                }
                if vector.iter().any(|x| !x.is_finite()) {
                    return Err(EmbeddingError::NonFinite);
                }
            }
        }

        Ok(vectors)
    }
}
