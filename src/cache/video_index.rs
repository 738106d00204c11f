//! Per-video index cache with single-flight builds.
//!
//! The first request for a video fetches its transcript, chunks it and
//! indexes the chunks; concurrent requests for the same video wait on that
//! one build and share its outcome. A failed build leaves no entry behind,
//! so a request arriving after it retries from scratch.

use super::{EvictionPolicy, MemoTable};
use crate::chunking::{full_text, merge_and_split, ChunkingConfig};
use crate::error::{Result, SporError};
use crate::transcript::TranscriptSource;
use crate::vector_store::{IndexHandle, IndexItem, VectorIndex};
use std::sync::Arc;
use tokio::sync::{Mutex, OnceCell};
use tracing::{info, instrument, warn};

/// Everything cached for one indexed video.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoIndexEntry {
    pub video_id: String,
    pub handle: IndexHandle,
    /// All chunk texts, space-joined.
    pub full_text: String,
    pub chunk_count: usize,
}

/// Outcome of looking up a video.
#[derive(Debug, Clone)]
pub enum IndexLookup {
    Ready(Arc<VideoIndexEntry>),
    /// No usable transcript; nothing was cached.
    NoTranscript,
}

/// Cache state of a video.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexState {
    Absent,
    Building,
    Ready,
}

/// Result of one build, shared by every request that waited on it.
#[derive(Debug)]
enum Outcome {
    Ready(Arc<VideoIndexEntry>),
    NoTranscript,
    Failed(String),
}

type Slot = Arc<OnceCell<Outcome>>;

fn building(slot: &Slot) -> bool {
    !slot.initialized()
}

pub struct VideoIndexCache {
    source: Arc<dyn TranscriptSource>,
    index: Arc<dyn VectorIndex>,
    chunking: ChunkingConfig,
    slots: Mutex<MemoTable<Slot>>,
}

impl VideoIndexCache {
    pub fn new(
        source: Arc<dyn TranscriptSource>,
        index: Arc<dyn VectorIndex>,
        chunking: ChunkingConfig,
        policy: EvictionPolicy,
    ) -> Self {
        Self {
            source,
            index,
            chunking,
            slots: Mutex::new(MemoTable::new(policy).with_pin(building)),
        }
    }

    /// Return the entry for `video_id`, building it on first request.
    ///
    /// Transcript failures and empty transcripts come back as
    /// [`IndexLookup::NoTranscript`]; indexing failures are errors. Requests
    /// that wait on a build share its outcome, failures included.
    pub async fn get_or_build(&self, video_id: &str) -> Result<IndexLookup> {
        let slot = {
            let mut slots = self.slots.lock().await;
            slots.get_or_insert_with(video_id, || Arc::new(OnceCell::new()))
        };

        if let Some(Outcome::Ready(entry)) = slot.get() {
            info!("Using cached index for video {}", video_id);
            return Ok(IndexLookup::Ready(entry.clone()));
        }

        let mut own_error = None;
        let error_out = &mut own_error;
        let current = &slot;
        let outcome = slot
            .get_or_init(|| async move {
                let outcome = match self.build(video_id).await {
                    Ok(entry) => Outcome::Ready(entry),
                    Err(e) if e.is_no_transcript() => Outcome::NoTranscript,
                    Err(e) => {
                        let outcome = Outcome::Failed(e.to_string());
                        *error_out = Some(e);
                        outcome
                    }
                };
                if !matches!(outcome, Outcome::Ready(_)) {
                    // Unlink before publishing so later requests start over.
                    let mut slots = self.slots.lock().await;
                    slots.remove_if(video_id, |held| Arc::ptr_eq(held, current));
                }
                outcome
            })
            .await;

        match outcome {
            Outcome::Ready(entry) => Ok(IndexLookup::Ready(entry.clone())),
            Outcome::NoTranscript => Ok(IndexLookup::NoTranscript),
            Outcome::Failed(message) => {
                Err(own_error.unwrap_or_else(|| SporError::IndexBuild(message.clone())))
            }
        }
    }

    /// Current state of `video_id` without starting a build.
    pub async fn state(&self, video_id: &str) -> IndexState {
        let slots = self.slots.lock().await;
        match slots.peek(video_id) {
            None => IndexState::Absent,
            Some(slot) => match slot.get() {
                None => IndexState::Building,
                Some(Outcome::Ready(_)) => IndexState::Ready,
                Some(_) => IndexState::Absent,
            },
        }
    }

    /// Number of videos held (ready or building).
    pub async fn len(&self) -> usize {
        self.slots.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.slots.lock().await.is_empty()
    }

    #[instrument(skip(self))]
    async fn build(&self, video_id: &str) -> Result<Arc<VideoIndexEntry>> {
        info!("Building index for new video: {}", video_id);

        let segments = match self.source.fetch(video_id).await {
            Ok(segments) => segments,
            Err(e) => {
                warn!("No transcript for {}: {}", video_id, e);
                return Err(SporError::NoTranscript(e.to_string()));
            }
        };

        let chunks = merge_and_split(&segments, &self.chunking);
        if chunks.is_empty() {
            warn!("Transcript for {} produced no chunks", video_id);
            return Err(SporError::NoTranscript(format!("empty transcript for {}", video_id)));
        }

        let handle = self.index.upsert(video_id, &IndexItem::from_chunks(&chunks)).await?;
        info!("Indexed {} chunks for {}", chunks.len(), video_id);

        Ok(Arc::new(VideoIndexEntry {
            video_id: video_id.to_string(),
            handle,
            full_text: full_text(&chunks),
            chunk_count: chunks.len(),
        }))
    }
}


#[cfg(test)]
mod tests {
    use super::testing::{lecture, RecordingIndex, ScriptedSource};
    use super::*;
    use crate::transcript::RawSegment;
    use std::time::Duration;

    fn cache(source: Arc<ScriptedSource>, index: Arc<RecordingIndex>) -> VideoIndexCache {
        VideoIndexCache::new(source, index, ChunkingConfig::default(), EvictionPolicy::unbounded())
    }

    #[tokio::test]
    async fn test_builds_once_and_reuses_entry() {
        let source = ScriptedSource::with(lecture());
        let index = Arc::new(RecordingIndex::default());
        let cache = cache(source.clone(), index.clone());

        assert_eq!(cache.state("vid").await, IndexState::Absent);

        let IndexLookup::Ready(first) = cache.get_or_build("vid").await.unwrap() else {
            panic!("expected an index");
        };
        let IndexLookup::Ready(second) = cache.get_or_build("vid").await.unwrap() else {
            panic!("expected an index");
        };

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.full_text, "Rivers carve valleys. Deltas form at the coast.");
        assert_eq!(first.chunk_count, 2);
        assert_eq!(first.handle.namespace, "vid");
        assert_eq!(source.calls(), 1);
        assert_eq!(index.upserts(), 1);
        assert_eq!(cache.state("vid").await, IndexState::Ready);
    }

    #[tokio::test]
    async fn test_concurrent_first_requests_build_once() {
        let source = Arc::new(ScriptedSource {
            segments: Some(lecture()),
            delay: Duration::from_millis(50),
            calls: Default::default(),
        });
        let index = Arc::new(RecordingIndex::default());
        let cache = Arc::new(cache(source.clone(), index.clone()));

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let cache = cache.clone();
                tokio::spawn(async move { cache.get_or_build("vid").await })
            })
            .collect();

        let mut entries = Vec::new();
        for task in tasks {
            match task.await.unwrap().unwrap() {
                IndexLookup::Ready(entry) => entries.push(entry),
                IndexLookup::NoTranscript => panic!("expected an index"),
            }
        }

        assert_eq!(source.calls(), 1);
        assert_eq!(index.upserts(), 1);
        assert!(entries.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
    }

    #[tokio::test]
    async fn test_missing_transcript_is_not_cached() {
        let source = ScriptedSource::failing();
        let index = Arc::new(RecordingIndex::default());
        let cache = cache(source.clone(), index.clone());

        assert!(matches!(cache.get_or_build("vid").await.unwrap(), IndexLookup::NoTranscript));
        assert!(matches!(cache.get_or_build("vid").await.unwrap(), IndexLookup::NoTranscript));

        assert_eq!(source.calls(), 2);
        assert_eq!(index.upserts(), 0);
        assert_eq!(cache.state("vid").await, IndexState::Absent);
    }

    #[tokio::test]
    async fn test_malformed_transcript_is_no_transcript() {
        let source = ScriptedSource::with(vec![RawSegment::new("bad", -1.0, 2.0)]);
        let index = Arc::new(RecordingIndex::default());
        let cache = cache(source, index.clone());

        assert!(matches!(cache.get_or_build("vid").await.unwrap(), IndexLookup::NoTranscript));
        assert_eq!(index.upserts(), 0);
    }

    #[tokio::test]
    async fn test_index_failure_propagates_and_allows_retry() {
        let source = ScriptedSource::with(lecture());
        let index = Arc::new(RecordingIndex {
            failing_upserts: usize::MAX,
            ..Default::default()
        });
        let cache = cache(source.clone(), index.clone());

        let err = cache.get_or_build("vid").await.unwrap_err();
        assert!(matches!(err, SporError::VectorStore(_)));
        assert_eq!(cache.state("vid").await, IndexState::Absent);

        tokio_test::assert_err!(cache.get_or_build("vid").await);
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_waiter_shares_failed_build_and_next_request_rebuilds() {
        let source = ScriptedSource::with(lecture());
        let index = Arc::new(RecordingIndex {
            failing_upserts: 1,
            upsert_delay: Duration::from_millis(30),
            ..Default::default()
        });
        let cache = Arc::new(cache(source.clone(), index.clone()));

        let first = {
            let cache = cache.clone();
            tokio::spawn(async move { cache.get_or_build("vid").await })
        };
        tokio::time::sleep(Duration::from_millis(5)).await;
        let second = {
            let cache = cache.clone();
            tokio::spawn(async move { cache.get_or_build("vid").await })
        };

        let first = first.await.unwrap().unwrap_err();
        let second = second.await.unwrap().unwrap_err();
        assert!(matches!(first, SporError::VectorStore(_)));
        assert!(matches!(second, SporError::IndexBuild(_)));
        assert_eq!(cache.state("vid").await, IndexState::Absent);

        tokio_test::assert_ok!(cache.get_or_build("vid").await);
        tokio_test::assert_ok!(cache.get_or_build("vid").await);

        assert_eq!(index.upserts(), 2);
        assert_eq!(source.calls(), 2);
        assert_eq!(cache.state("vid").await, IndexState::Ready);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_requests_share_missing_transcript() {
        let source = Arc::new(ScriptedSource {
            segments: None,
            delay: Duration::from_millis(50),
            calls: Default::default(),
        });
        let cache = Arc::new(cache(source.clone(), Arc::new(RecordingIndex::default())));

        let tasks: Vec<_> = (0..4)
            .map(|_| {
                let cache = cache.clone();
                tokio::spawn(async move { cache.get_or_build("vid").await })
            })
            .collect();
        for task in tasks {
            assert!(matches!(task.await.unwrap().unwrap(), IndexLookup::NoTranscript));
        }
        assert_eq!(source.calls(), 1);

        assert!(matches!(cache.get_or_build("vid").await.unwrap(), IndexLookup::NoTranscript));
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_bounded_cache_evicts_oldest_video() {
        let source = ScriptedSource::with(lecture());
        let index = Arc::new(RecordingIndex::default());
        let cache = VideoIndexCache::new(
            source.clone(),
            index,
            ChunkingConfig::default(),
            EvictionPolicy {
                max_entries: Some(1),
                idle_ttl: None,
            },
        );

        tokio_test::assert_ok!(cache.get_or_build("a").await);
        tokio::time::advance(Duration::from_secs(1)).await;
        tokio_test::assert_ok!(cache.get_or_build("b").await);

        assert_eq!(cache.len().await, 1);
        assert_eq!(cache.state("a").await, IndexState::Absent);
        assert_eq!(cache.state("b").await, IndexState::Ready);
    }
}
