//! Ingests a few sentences and asks a question about them.
//!
//! Needs a reachable provider, e.g. `OPENAI_API_KEY` set, or a `config.yaml`
//! selecting a local Ollama.

use groundwork_core::rag::IngestRequest;
use groundwork_core::{provider, AnswerKind, ChatManager, Config};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load_or_default();
    println!("Model: {} ({})", config.llm.model, config.llm.base_url);

    let provider = provider::create_provider(&config)?;
    let manager = ChatManager::new(config, provider);

    let report = manager
        .rag()
        .ingest(
            IngestRequest::new(
                "Groundwork splits documents into chunks and embeds each chunk. \
                 Questions are answered from the most similar chunks, with citations.",
            )
            .with_document_id("about")
            .with_metadata("filename", "about.txt"),
        )
        .await?;
    println!("Ingested {} chunk(s)", report.chunk_count);

    let answer = manager.ask("How are questions answered?").await?;
    if let AnswerKind::Fallback { reason } = &answer.kind {
        eprintln!("Provider failed ({reason}), showing retrieved text");
    }
    println!("\n{}", answer.text);

    Ok(())
}
