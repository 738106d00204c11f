//! Configuration module for Spor.
//!
//! Handles loading and managing application settings and prompt templates.

mod prompts;
mod settings;

pub use prompts::{ChatPrompts, Prompts};
pub use settings::{
    CacheSettings, ChunkingSettings, EmbeddingSettings, GeneralSettings, PineconeSettings,
    PromptSettings, RagSettings, RetrievalSettings, ServerSettings, Settings,
    TranscriptSettings, VectorStoreProvider, VectorStoreSettings,
};
