//! Pre-fetched transcripts stored as JSON files.

use super::{RawSegment, TranscriptSource};
use crate::error::{Result, SporError};
use async_trait::async_trait;
use std::path::PathBuf;

/// Reads `<dir>/<video_id>.json`, an array of `{text, start, duration}`.
///
/// A missing file is a source failure; a file with malformed entries yields
/// an empty transcript.
pub struct LocalTranscriptSource {
    dir: PathBuf,
}

impl LocalTranscriptSource {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    fn path_for(&self, video_id: &str) -> PathBuf {
        self.dir.join(format!("{}.json", video_id))
    }
}

#[async_trait]
impl TranscriptSource for LocalTranscriptSource {
    fn name(&self) -> &str {
        "local"
    }

    async fn fetch(&self, video_id: &str) -> Result<Vec<RawSegment>> {
        if video_id.contains(['/', '\\']) || video_id.contains("..") {
            return Err(SporError::InvalidInput(format!("Invalid video id: {}", video_id)));
        }

        let path = self.path_for(video_id);
        if !path.exists() {
            return Err(SporError::TranscriptSource(format!("No local transcript at {:?}", path)));
        }

        let content = tokio::fs::read_to_string(&path).await?;
        let value: serde_json::Value = serde_json::from_str(&content).unwrap_or_default();
        Ok(RawSegment::parse_list(&value))
    }
}
