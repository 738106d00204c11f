//! Answer generation wired to session memory.

use super::{AnswerGenerator, GenerationRequest, RetrievedContext};
use crate::cache::SessionHistoryStore;
use crate::error::Result;
use std::sync::Arc;
use tracing::debug;

/// Runs the generator with a session's history and records the new turn.
///
/// The session's history stays locked from the moment it is read until the
/// turn is appended, so questions in one session are answered one at a time
/// and each sees every earlier turn.
pub struct ConversationChain {
    generator: Arc<dyn AnswerGenerator>,
    sessions: Arc<SessionHistoryStore>,
}

impl ConversationChain {
    pub fn new(generator: Arc<dyn AnswerGenerator>, sessions: Arc<SessionHistoryStore>) -> Self {
        Self { generator, sessions }
    }

    pub fn sessions(&self) -> &Arc<SessionHistoryStore> {
        &self.sessions
    }

    /// Answer `question` in `session_id`. Nothing is recorded on failure.
    pub async fn invoke(&self, session_id: &str, question: &str, context: &RetrievedContext) -> Result<String> {
        let shared = self.sessions.get_or_create(session_id).await;
        let mut history = shared.lock().await;

        let answer = self
            .generator
            .generate(&GenerationRequest {
                question,
                context,
                history: &history,
                session_id,
            })
            .await?;

        history.push_turn(question, answer.clone());
        debug!("Session {} now has {} messages", session_id, history.len());

        Ok(answer)
    }
}
