//! Question answering over the knowledge base, plus plain chat.

mod manager;
pub mod synthesis;

pub use manager::ChatManager;
pub use synthesis::{synthesize, Answer, AnswerKind, SynthesisOptions, NO_RELEVANT_INFORMATION};
