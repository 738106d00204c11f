//! Error types for Spor.

use thiserror::Error;

/// Library-level error type for Spor operations.
#[derive(Error, Debug)]
pub enum SporError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("No transcript available: {0}")]
    NoTranscript(String),

    #[error("Transcript source error: {0}")]
    TranscriptSource(String),

    #[error("Audio download failed: {0}")]
    AudioDownload(String),

    #[error("Transcription failed: {0}")]
    Transcription(String),

    #[error("Embedding generation failed: {0}")]
    Embedding(String),

    #[error("Vector store error: {0}")]
    VectorStore(String),

    #[error("Index build failed: {0}")]
    IndexBuild(String),

    #[error("Answer generation failed: {0}")]
    Generation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("OpenAI API error: {0}")]
    OpenAI(String),

    #[error("External tool not found: {0}. Please install it and ensure it's in your PATH.")]
    ToolNotFound(String),

    #[error("External tool failed: {0}")]
    ToolFailed(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl SporError {
    /// Whether this error means the video simply has no usable transcript.
    pub fn is_no_transcript(&self) -> bool {
        matches!(self, SporError::NoTranscript(_))
    }
}

/// Result type alias for Spor operations.
pub type Result<T> = std::result::Result<T, SporError>;
