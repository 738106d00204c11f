//! Transcript acquisition.
//!
//! A transcript is a list of raw, time-stamped fragments for a video. They
//! come from published captions when available, and from speech recognition
//! over the downloaded audio otherwise.

mod captions;
mod fallback;
mod local;
mod models;
mod whisper;
pub mod youtube;

pub use captions::{parse_json3, pick_caption_file, CaptionSource};
pub use fallback::FallbackSource;
pub use local::LocalTranscriptSource;
pub use models::RawSegment;
pub use whisper::WhisperSource;
pub use youtube::parse_video_id;

use crate::config::Settings;
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// Capability: fetch the raw time-stamped segments for a video, or fail.
#[async_trait]
pub trait TranscriptSource: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Fetch raw segments for a video. Ordering is not guaranteed.
    async fn fetch(&self, video_id: &str) -> Result<Vec<RawSegment>>;
}

/// Build the configured source chain: local files, captions, then ASR.
pub fn create_source(settings: &Settings) -> Result<FallbackSource> {
    let mut sources: Vec<Arc<dyn TranscriptSource>> = Vec::new();

    if let Some(dir) = settings.local_transcript_dir() {
        sources.push(Arc::new(LocalTranscriptSource::new(dir)));
    }
    if settings.transcript.captions {
        sources.push(Arc::new(CaptionSource::new(settings.transcript.languages.clone())));
    }
    if settings.transcript.asr {
        sources.push(Arc::new(WhisperSource::new(
            &settings.transcript,
            settings.temp_dir().join("audio"),
        )?));
    }

    Ok(FallbackSource::new(sources))
}
