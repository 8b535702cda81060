use groundwork_core::models::{Model, ModelRegistry};

fn main() {
    let registry = ModelRegistry::new();

    println!("=== Known Models ===");
    for model in registry.all_models() {
        match model {
            Model::Chat(chat) => {
                println!("Chat: {} - {} tokens", chat.name, chat.context_length);
            }
            Model::Embedding(embed) => {
                println!(
                    "Embedding: {} - {} dims, {} tokens",
                    embed.name, embed.embedding_dim, embed.context_length,
                );
            }
        }
    }

    println!("\n=== Lookup ===");
    if let Some(embed) = registry.get_embedding("text-embedding-3-small") {
        println!("Found: {} ({} dims)", embed.name, embed.embedding_dim);
    }
}
