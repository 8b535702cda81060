//! Known chat and embedding models.

mod registry;

pub use registry::{ChatModel, EmbeddingModel, Model, ModelRegistry};
