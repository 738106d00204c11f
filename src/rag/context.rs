//! Context handed to the answer generator.

use crate::vector_store::Passage;

/// What the generator gets to read for one question.
#[derive(Debug, Clone, PartialEq)]
pub enum RetrievedContext {
    /// The whole transcript, for broad questions.
    FullTranscript(String),
    /// Top-k passages, best first.
    Passages(Vec<Passage>),
}

impl RetrievedContext {
    pub fn is_full_transcript(&self) -> bool {
        matches!(self, RetrievedContext::FullTranscript(_))
    }

    /// Text form used in the prompt.
    pub fn render(&self) -> String {
        match self {
            RetrievedContext::FullTranscript(text) => text.clone(),
            RetrievedContext::Passages(passages) if passages.is_empty() => {
                "(No relevant passages found in the video)".to_string()
            }
            RetrievedContext::Passages(passages) => passages
                .iter()
                .map(|p| format!("[{}] {}", p.format_timestamp(), p.text))
                .collect::<Vec<_>>()
                .join("\n\n"),
        }
    }
}
