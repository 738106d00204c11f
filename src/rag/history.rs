//! Conversation history for a chat session.

use serde::{Deserialize, Serialize};

/// Who said a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    /// Label used when rendering history into a prompt.
    pub fn label(&self) -> &'static str {
        match self {
            Role::User => "Human",
            Role::Assistant => "AI",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Ordered messages of one session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatHistory {
    messages: Vec<ChatMessage>,
}

impl ChatHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Record a completed question/answer exchange.
    pub fn push_turn(&mut self, question: impl Into<String>, answer: impl Into<String>) {
        self.messages.push(ChatMessage::user(question));
        self.messages.push(ChatMessage::assistant(answer));
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// One `Label: content` line per message.
    pub fn render(&self) -> String {
        self.messages
            .iter()
            .map(|m| format!("{}: {}", m.role.label(), m.content))
            .collect::<Vec<_>>()
            .join("\n")
    }
}
