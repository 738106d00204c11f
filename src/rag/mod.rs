//! Question answering over a video transcript.
//!
//! Broad questions get the whole transcript as context, specific ones get
//! the top retrieved passages; either way the answer is generated with the
//! session's conversation history.

mod chain;
mod classifier;
mod context;
mod generator;
mod history;

pub use chain::ConversationChain;
pub use classifier::{QueryClassifier, BROAD_PATTERNS};
pub use context::RetrievedContext;
pub use generator::{AnswerGenerator, GenerationRequest, OpenAIGenerator};
pub use history::{ChatHistory, ChatMessage, Role};

#[cfg(test)]
pub(crate) use chain::testing;
