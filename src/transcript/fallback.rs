//! Ordered chain of transcript sources.

use super::{RawSegment, TranscriptSource};
use crate::error::{Result, SporError};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, warn};

/// Tries each source in turn; the first non-empty result wins.
pub struct FallbackSource {
    sources: Vec<Arc<dyn TranscriptSource>>,
}

impl FallbackSource {
    pub fn new(sources: Vec<Arc<dyn TranscriptSource>>) -> Self {
        Self { sources }
    }

    /// Number of sources in the chain.
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

#[async_trait]
impl TranscriptSource for FallbackSource {
    fn name(&self) -> &str {
        "fallback"
    }

    async fn fetch(&self, video_id: &str) -> Result<Vec<RawSegment>> {
        let mut failures = Vec::new();

        for source in &self.sources {
            match source.fetch(video_id).await {
                Ok(segments) if !segments.is_empty() => {
                    info!("Transcript for {} from {}", video_id, source.name());
                    return Ok(segments);
                }
                Ok(_) => {
                    warn!("{} returned an empty transcript for {}", source.name(), video_id);
                    failures.push(format!("{}: empty transcript", source.name()));
                }
                Err(e) => {
                    warn!("{} failed for {}: {}", source.name(), video_id, e);
                    failures.push(format!("{}: {}", source.name(), e));
                }
            }
        }

        Err(SporError::TranscriptSource(if failures.is_empty() {
            "no transcript sources configured".to_string()
        } else {
            failures.join("; ")
        }))
    }
}
