//! OpenAI embeddings implementation.

use super::Embedder;
use crate::config::EmbeddingSettings;
use crate::error::{Result, SporError};
use crate::openai::create_client;
use async_openai::types::{CreateEmbeddingRequestArgs, EmbeddingInput};
use async_trait::async_trait;
use tracing::{debug, instrument};

/// Inputs per embeddings request.
const BATCH_SIZE: usize = 100;

/// OpenAI-based embedder.
pub struct OpenAIEmbedder {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
    model: String,
    dimensions: usize,
}

impl OpenAIEmbedder {
    pub fn new(settings: &EmbeddingSettings) -> Result<Self> {
        Self::with_config(&settings.model, settings.dimensions as usize)
    }

    pub fn with_config(model: &str, dimensions: usize) -> Result<Self> {
        Ok(Self {
            client: create_client()?,
            model: model.to_string(),
            dimensions,
        })
    }

    /// Only the v3 models accept a requested output size; older models
    /// reject the parameter.
    fn supports_dimensions(&self) -> bool {
        self.model.starts_with("text-embedding-3")
    }
}

#[async_trait]
impl Embedder for OpenAIEmbedder {
    #[instrument(skip(self, text))]
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let embeddings = self.embed_batch(&[text.to_string()]).await?;
        embeddings
            .into_iter()
            .next()
            .ok_or_else(|| SporError::Embedding("Empty embedding response".to_string()))
    }

    #[instrument(skip(self, texts), fields(count = texts.len()))]
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!("Generating embeddings for {} texts with {}", texts.len(), self.model);
        let mut all_embeddings = Vec::with_capacity(texts.len());

        for batch in texts.chunks(BATCH_SIZE) {
            let mut args = CreateEmbeddingRequestArgs::default();
            args.model(&self.model)
                .input(EmbeddingInput::StringArray(batch.to_vec()));
            if self.supports_dimensions() {
                args.dimensions(self.dimensions as u32);
            }
            let request = args
                .build()
                .map_err(|e| SporError::Embedding(format!("Failed to build request: {}", e)))?;

            let response = self
                .client
                .embeddings()
                .create(request)
                .await
                .map_err(|e| SporError::OpenAI(format!("Embedding API error: {}", e)))?;

            let mut embeddings = response.data;
            embeddings.sort_by_key(|e| e.index);
            if embeddings.len() != batch.len() {
                return Err(SporError::Embedding(format!(
                    "Expected {} embeddings, got {}",
                    batch.len(),
                    embeddings.len()
                )));
            }
            all_embeddings.extend(embeddings.into_iter().map(|e| e.embedding));
        }

        debug!("Generated {} embeddings", all_embeddings.len());
        Ok(all_embeddings)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}
