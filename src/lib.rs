//! Spor - Ask questions about a video
//!
//! Answers questions about a single video's spoken content, using its
//! transcript as the only source of truth.
//!
//! # Overview
//!
//! For each video Spor fetches a transcript (published captions, falling back
//! to speech recognition), merges overlapping caption fragments, splits the
//! result into timestamped chunks and indexes them once. Broad questions
//! ("summarize this video") are answered from the full transcript, specific
//! ones from the nearest indexed passages. Each session keeps its own
//! conversation history.
//!
//! # Architecture
//!
//! - `config` - Configuration management
//! - `transcript` - Transcript sources (local files, captions, ASR)
//! - `audio` - Audio download and splitting for ASR
//! - `chunking` - Segment merging and recursive splitting
//! - `embedding` - Embedding generation
//! - `vector_store` - Vector stores and the per-video semantic index
//! - `cache` - Video index and session history caches
//! - `rag` - Query classification, prompts and answer generation
//! - `orchestrator` - Question answering entry point
//!
//! # Example
//!
//! ```rust,no_run
//! use spor::config::Settings;
//! use spor::orchestrator::ChatOrchestrator;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let orchestrator = ChatOrchestrator::from_settings(&settings)?;
//!
//!     let answer = orchestrator
//!         .answer("dQw4w9WgXcQ", "session-1", "What is this video about?")
//!         .await?;
//!     println!("{}", answer);
//!
//!     Ok(())
//! }
//! ```

pub mod audio;
pub mod cache;
pub mod chunking;
pub mod cli;
pub mod config;
pub mod embedding;
pub mod error;
pub mod openai;
pub mod orchestrator;
pub mod rag;
pub mod transcript;
pub mod vector_store;

pub use error::{Result, SporError};
