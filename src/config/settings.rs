//! Configuration settings for Spor.

use crate::cache::EvictionPolicy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub transcript: TranscriptSettings,
    pub chunking: ChunkingSettings,
    pub embedding: EmbeddingSettings,
    pub vector_store: VectorStoreSettings,
    pub retrieval: RetrievalSettings,
    pub rag: RagSettings,
    pub cache: CacheSettings,
    pub server: ServerSettings,
    pub prompts: PromptSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Directory for storing application data.
    pub data_dir: String,
    /// Directory for temporary files (downloaded audio, caption files).
    pub temp_dir: String,
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            data_dir: "~/.spor".to_string(),
            temp_dir: "/tmp/spor".to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// Transcript acquisition settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptSettings {
    /// Caption languages, in order of preference.
    pub languages: Vec<String>,
    /// Try published or automatic captions first.
    pub captions: bool,
    /// Fall back to speech recognition when captions are unavailable.
    pub asr: bool,
    /// Speech recognition model.
    pub asr_model: String,
    /// Audio files at or above this size (MB) are split before recognition.
    pub max_upload_mb: u64,
    /// Length of each split audio piece in seconds.
    pub asr_chunk_seconds: u32,
    /// Maximum audio pieces transcribed concurrently.
    pub max_concurrent_chunks: usize,
    /// Directory of pre-fetched `<video_id>.json` transcripts, consulted first.
    pub local_dir: Option<String>,
}

impl Default for TranscriptSettings {
    fn default() -> Self {
        Self {
            languages: ["en", "hi", "es", "fr", "de", "ru", "pt", "ja", "ko", "zh-Hans", "ar"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            captions: true,
            asr: true,
            asr_model: "whisper-1".to_string(),
            max_upload_mb: 25,
            asr_chunk_seconds: 300,
            max_concurrent_chunks: 3,
            local_dir: None,
        }
    }
}

/// Transcript chunking settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingSettings {
    /// Target chunk size in characters.
    pub target_chunk_size: usize,
    /// Look-back budget in characters when choosing a break point.
    pub chunk_overlap: usize,
}

impl Default for ChunkingSettings {
    fn default() -> Self {
        Self {
            target_chunk_size: 400,
            chunk_overlap: 50,
        }
    }
}

/// Embedding generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    /// Embedding model to use.
    pub model: String,
    /// Embedding dimensions.
    pub dimensions: u32,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            model: "text-embedding-ada-002".to_string(),
            dimensions: 1536,
        }
    }
}

/// Vector store backend.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum VectorStoreProvider {
    /// In-process store, lives as long as the server.
    #[default]
    Memory,
    /// Local SQLite database.
    Sqlite,
    /// Pinecone serverless index.
    Pinecone,
}

impl std::str::FromStr for VectorStoreProvider {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "memory" => Ok(VectorStoreProvider::Memory),
            "sqlite" => Ok(VectorStoreProvider::Sqlite),
            "pinecone" => Ok(VectorStoreProvider::Pinecone),
            _ => Err(format!("Unknown vector store provider: {}", s)),
        }
    }
}

impl std::fmt::Display for VectorStoreProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VectorStoreProvider::Memory => write!(f, "memory"),
            VectorStoreProvider::Sqlite => write!(f, "sqlite"),
            VectorStoreProvider::Pinecone => write!(f, "pinecone"),
        }
    }
}

/// Vector store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorStoreSettings {
    /// Vector store provider (memory, sqlite, pinecone).
    pub provider: VectorStoreProvider,
    /// Path to SQLite database (for sqlite provider).
    pub sqlite_path: String,
    /// Pinecone-specific settings.
    pub pinecone: PineconeSettings,
}

impl Default for VectorStoreSettings {
    fn default() -> Self {
        Self {
            provider: VectorStoreProvider::Memory,
            sqlite_path: "~/.spor/vectors.db".to_string(),
            pinecone: PineconeSettings::default(),
        }
    }
}

/// Pinecone index settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PineconeSettings {
    /// Index shared by all videos; each video gets its own namespace.
    pub index_name: String,
    /// Serverless cloud used when the index has to be created.
    pub cloud: String,
    /// Serverless region used when the index has to be created.
    pub region: String,
    /// Environment variable holding the API key.
    pub api_key_env: String,
    /// Control plane base URL.
    pub control_url: String,
}

impl Default for PineconeSettings {
    fn default() -> Self {
        Self {
            index_name: "youtube-assistant".to_string(),
            cloud: "aws".to_string(),
            region: "us-east-1".to_string(),
            api_key_env: "PINECONE_API_KEY".to_string(),
            control_url: "https://api.pinecone.io".to_string(),
        }
    }
}

/// Retrieval and query routing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    /// Passages retrieved for specific questions.
    pub top_k: usize,
    /// Extra regexes (matched against the lower-cased question) that mark a
    /// question as broad.
    pub extra_broad_patterns: Vec<String>,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            top_k: 6,
            extra_broad_patterns: Vec::new(),
        }
    }
}

/// Answer generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RagSettings {
    /// LLM model for response generation.
    pub model: String,
    /// Sampling temperature.
    pub temperature: f32,
}

impl Default for RagSettings {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            temperature: 0.0,
        }
    }
}

/// Cache bounds. Unset values mean unbounded.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct CacheSettings {
    /// Maximum number of indexed videos kept in memory.
    pub max_videos: Option<usize>,
    /// Maximum number of chat sessions kept in memory.
    pub max_sessions: Option<usize>,
    /// Drop entries not touched for this many seconds.
    pub idle_ttl_seconds: Option<u64>,
}

impl CacheSettings {
    /// Eviction policy for the video index cache.
    pub fn video_policy(&self) -> EvictionPolicy {
        EvictionPolicy {
            max_entries: self.max_videos,
            idle_ttl: self.idle_ttl_seconds.map(Duration::from_secs),
        }
    }

    /// Eviction policy for the session history store.
    pub fn session_policy(&self) -> EvictionPolicy {
        EvictionPolicy {
            max_entries: self.max_sessions,
            idle_ttl: self.idle_ttl_seconds.map(Duration::from_secs),
        }
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
        }
    }
}

/// Prompt customization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct PromptSettings {
    /// Directory for custom prompts (overrides defaults).
    pub custom_dir: Option<String>,
    /// Custom variables available in all prompts as {{variable_name}}.
    pub variables: std::collections::HashMap<String, String>,
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> crate::error::Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&Path>) -> crate::error::Result<Self> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::default_config_path(),
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let settings: Settings = toml::from_str(&content)?;
            Ok(settings)
        } else {
            Ok(Settings::default())
        }
    }

    /// Save settings to the default configuration file.
    pub fn save(&self) -> crate::error::Result<()> {
        self.save_to(&Self::default_config_path())
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &Path) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::SporError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("spor")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Get the expanded data directory path.
    pub fn data_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.data_dir)
    }

    /// Get the expanded temp directory path.
    pub fn temp_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.temp_dir)
    }

    /// Get the expanded SQLite database path.
    pub fn sqlite_path(&self) -> PathBuf {
        Self::expand_path(&self.vector_store.sqlite_path)
    }

    /// Get the expanded local transcript directory, if configured.
    pub fn local_transcript_dir(&self) -> Option<PathBuf> {
        self.transcript.local_dir.as_deref().map(Self::expand_path)
    }
}
