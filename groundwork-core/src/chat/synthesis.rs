//! Grounded answer synthesis.
//!
//! Turns a query and a ranked list of retrieved chunks into an answer with
//! numbered citations and a sources footer. A failing completion call never
//! surfaces as an error here: the raw retrieved text is returned instead.

use crate::provider::{ChatRequest, Message, Provider, ProviderError};
use crate::rag::Chunk;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Returned when retrieval found nothing to ground an answer on.
pub const NO_RELEVANT_INFORMATION: &str =
    "I could not find any relevant information in the knowledge base to answer this question.";

const GROUNDING_INSTRUCTIONS: &str = "Answer the user's question using only the numbered \
sources below. Cite the sources you use by their number, for example [1]. If the sources \
do not contain the answer, say that you do not know.";

/// How an [`Answer`] was produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AnswerKind {
    /// The completion provider answered from the retrieved chunks.
    Grounded,
    /// Nothing was retrieved; the provider was not called.
    NoContext,
    /// The provider failed; the text is the raw retrieved chunks.
    Fallback { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    pub text: String,
    #[serde(flatten)]
    pub kind: AnswerKind,
    /// Originating file names of the cited chunks, deduplicated, in citation order.
    pub sources: Vec<String>,
}

/// Builds the system prompt that embeds `chunks` as numbered citations.
pub fn build_system_prompt(preamble: &str, chunks: &[Chunk]) -> String {
    let mut prompt = String::new();
    if !preamble.trim().is_empty() {
        prompt.push_str(preamble.trim());
        prompt.push_str("\n\n");
    }
    prompt.push_str(GROUNDING_INSTRUCTIONS);
    prompt.push_str("\n\nSources:\n");
    for (i, chunk) in chunks.iter().enumerate() {
        prompt.push_str(&format!("\n[{}] {}\n", i + 1, chunk.text));
    }
    prompt
}

/// Distinct source names of `chunks`, in order of first appearance.
pub fn source_names(chunks: &[Chunk]) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for chunk in chunks {
        let name = chunk.source_name();
        if !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
    }
    names
}

fn sources_footer(sources: &[String]) -> String {
    let mut footer = String::from("\n\nSources:");
    for source in sources {
        footer.push_str("\n- ");
        footer.push_str(source);
    }
    footer
}

/// Raw chunk texts joined by blank lines, used when the provider fails.
fn fallback_text(chunks: &[Chunk]) -> String {
    chunks
        .iter()
        .map(|c| c.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Options for a single synthesis call.
#[derive(Debug, Clone)]
pub struct SynthesisOptions<'a> {
    pub model: &'a str,
    pub temperature: f64,
    /// Text placed before the grounding instructions in the system prompt.
    pub preamble: &'a str,
}

/// Answers `query` from `chunks` with one completion call.
///
/// - no chunks: returns [`NO_RELEVANT_INFORMATION`] without calling the provider
/// - provider success: the completion plus a "Sources:" footer
/// - provider failure: the raw chunk texts, with the failure recorded in the kind
pub async fn synthesize(
    provider: &dyn Provider,
    query: &str,
    chunks: &[Chunk],
    options: &SynthesisOptions<'_>,
) -> Answer {
    if chunks.is_empty() {
        debug!("No chunks retrieved, skipping completion call");
        return Answer {
            text: NO_RELEVANT_INFORMATION.to_string(),
            kind: AnswerKind::NoContext,
            sources: Vec::new(),
        };
    }

    let sources = source_names(chunks);
    let request = ChatRequest::new(
        options.model,
        vec![
            Message::system(build_system_prompt(options.preamble, chunks)),
            Message::user(query),
        ],
    )
    .with_temperature(options.temperature);

    match provider.chat(request).await {
        Ok(response) => {
            let mut text = response.message.content;
            text.push_str(&sources_footer(&sources));
            Answer {
                text,
                kind: AnswerKind::Grounded,
                sources,
            }
        }
        Err(err) => {
            log_fallback(provider.name(), &err);
            Answer {
                text: fallback_text(chunks),
                kind: AnswerKind::Fallback {
                    reason: err.to_string(),
                },
                sources,
            }
        }
    }
}

fn log_fallback(provider: &str, err: &ProviderError) {
    if err.is_unavailable() {
        warn!(provider, error = %err, "Completion provider unavailable, returning retrieved text");
    } else {
        warn!(provider, error = %err, "Completion failed, returning retrieved text");
    }
}
