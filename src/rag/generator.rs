//! Answer generation with an OpenAI chat model.

use super::{ChatHistory, RetrievedContext};
use crate::config::{Prompts, RagSettings};
use crate::error::{Result, SporError};
use crate::openai::create_client;
use async_openai::types::{
    ChatCompletionRequestMessage, ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
};
use async_trait::async_trait;
use std::collections::HashMap;
use tracing::{debug, instrument};

/// Everything needed to answer one question.
#[derive(Debug, Clone)]
pub struct GenerationRequest<'a> {
    pub question: &'a str,
    pub context: &'a RetrievedContext,
    pub history: &'a ChatHistory,
    /// Session the question belongs to.
    pub session_id: &'a str,
}

/// Capability: turn a question, its context and the session history into an answer.
#[async_trait]
pub trait AnswerGenerator: Send + Sync {
    async fn generate(&self, request: &GenerationRequest<'_>) -> Result<String>;
}

/// Generator backed by the chat completions API.
pub struct OpenAIGenerator {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
    model: String,
    temperature: f32,
    prompts: Prompts,
}

impl OpenAIGenerator {
    pub fn new(settings: &RagSettings, prompts: Prompts) -> Result<Self> {
        Ok(Self {
            client: create_client()?,
            model: settings.model.clone(),
            temperature: settings.temperature,
            prompts,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// The single user message sent to the model.
    pub fn build_prompt(&self, request: &GenerationRequest<'_>) -> String {
        let mut vars = HashMap::new();
        vars.insert("history".to_string(), request.history.render());
        vars.insert("context".to_string(), request.context.render());
        vars.insert("question".to_string(), request.question.to_string());

        self.prompts.render_with_custom(&self.prompts.chat.template, &vars)
    }
}

#[async_trait]
impl AnswerGenerator for OpenAIGenerator {
    #[instrument(skip(self, request), fields(session = %request.session_id))]
    async fn generate(&self, request: &GenerationRequest<'_>) -> Result<String> {
        let prompt = self.build_prompt(request);
        debug!("Prompt is {} chars", prompt.len());

        let messages: Vec<ChatCompletionRequestMessage> = vec![ChatCompletionRequestUserMessageArgs::default()
            .content(prompt)
            .build()
            .map_err(|e| SporError::Generation(e.to_string()))?
            .into()];

        let chat_request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .temperature(self.temperature)
            .user(request.session_id)
            .build()
            .map_err(|e| SporError::Generation(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(chat_request)
            .await
            .map_err(|e| SporError::OpenAI(format!("Failed to generate response: {}", e)))?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| SporError::Generation("Empty response from LLM".to_string()))
    }
}
