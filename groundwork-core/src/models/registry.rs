use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatModel {
    pub id: String,
    pub name: String,
    pub context_length: usize,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingModel {
    pub id: String,
    pub name: String,
    pub context_length: usize,
    pub embedding_dim: usize,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Model {
    Chat(ChatModel),
    Embedding(EmbeddingModel),
}

impl Model {
    pub fn id(&self) -> &str {
        match self {
            Model::Chat(m) => &m.id,
            Model::Embedding(m) => &m.id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Model::Chat(m) => &m.name,
            Model::Embedding(m) => &m.name,
        }
    }

    pub fn context_length(&self) -> usize {
        match self {
            Model::Chat(m) => m.context_length,
            Model::Embedding(m) => m.context_length,
        }
    }
}

/// Well-known models, used to resolve embedding dimensions from a model id.
pub struct ModelRegistry {
    models: Vec<Model>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self {
            models: default_models(),
        }
    }

    pub fn get(&self, id: &str) -> Option<&Model> {
        self.models.iter().find(|m| m.id() == id)
    }

    pub fn get_embedding(&self, id: &str) -> Option<&EmbeddingModel> {
        self.get(id).and_then(|m| match m {
            Model::Embedding(embed) => Some(embed),
            _ => None,
        })
    }

    pub fn get_chat(&self, id: &str) -> Option<&ChatModel> {
        self.get(id).and_then(|m| match m {
            Model::Chat(chat) => Some(chat),
            _ => None,
        })
    }

    pub fn chat_models(&self) -> impl Iterator<Item = &ChatModel> {
        self.models.iter().filter_map(|m| match m {
            Model::Chat(chat) => Some(chat),
            _ => None,
        })
    }

    pub fn embedding_models(&self) -> impl Iterator<Item = &EmbeddingModel> {
        self.models.iter().filter_map(|m| match m {
            Model::Embedding(embed) => Some(embed),
            _ => None,
        })
    }

    pub fn all_models(&self) -> &[Model] {
        &self.models
    }
}

impl Default for ModelRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn embedding(id: &str, name: &str, context_length: usize, dim: usize, description: &str) -> Model {
    Model::Embedding(EmbeddingModel {
        id: id.to_string(),
        name: name.to_string(),
        context_length,
        embedding_dim: dim,
        description: description.to_string(),
    })
}

fn chat(id: &str, name: &str, context_length: usize, description: &str) -> Model {
    Model::Chat(ChatModel {
        id: id.to_string(),
        name: name.to_string(),
        context_length,
        description: description.to_string(),
    })
}

pub fn default_models() -> Vec<Model> {
    vec![
        embedding(
            "text-embedding-3-small",
            "OpenAI text-embedding-3-small",
            8191,
            1536,
            "Hosted general purpose embeddings",
        ),
        embedding(
            "text-embedding-3-large",
            "OpenAI text-embedding-3-large",
            8191,
            3072,
            "Hosted high quality embeddings",
        ),
        embedding(
            "text-embedding-ada-002",
            "OpenAI text-embedding-ada-002",
            8191,
            1536,
            "Legacy hosted embeddings",
        ),
        embedding(
            "nomic-embed-text",
            "Nomic Embed Text",
            8192,
            768,
            "Local embeddings served by Ollama",
        ),
        embedding(
            "mxbai-embed-large",
            "mxbai-embed-large",
            512,
            1024,
            "Local embeddings served by Ollama, higher quality",
        ),
        chat("gpt-4o-mini", "GPT-4o mini", 128_000, "Small hosted chat model"),
        chat("gpt-4o", "GPT-4o", 128_000, "Hosted chat model"),
        chat("llama3.2", "Llama 3.2", 131_072, "Local chat model served by Ollama"),
    ]
}
