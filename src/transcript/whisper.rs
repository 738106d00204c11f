//! Speech recognition fallback using OpenAI Whisper.

use super::youtube::watch_url;
use super::{RawSegment, TranscriptSource};
use crate::audio::{download_audio, file_size_mb, split_audio};
use crate::config::TranscriptSettings;
use crate::error::{Result, SporError};
use crate::openai::create_client;
use async_openai::types::{AudioInput, AudioResponseFormat, CreateTranscriptionRequestArgs};
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument, warn};

/// Transcribes a video's audio track when no captions exist.
pub struct WhisperSource {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
    model: String,
    work_dir: PathBuf,
    max_upload_mb: u64,
    piece_seconds: u32,
    max_concurrent: usize,
}

impl WhisperSource {
    /// Create a source that stores downloaded audio under `work_dir`.
    pub fn new(settings: &TranscriptSettings, work_dir: PathBuf) -> Result<Self> {
        Ok(Self {
            client: create_client()?,
            model: settings.asr_model.clone(),
            work_dir,
            max_upload_mb: settings.max_upload_mb,
            piece_seconds: settings.asr_chunk_seconds,
            max_concurrent: settings.max_concurrent_chunks.max(1),
        })
    }

    /// Transcribe a single audio file (no splitting).
    #[instrument(skip(self), fields(audio_path = %audio_path.display()))]
    async fn transcribe_file(&self, audio_path: &Path) -> Result<Vec<RawSegment>> {
        let file_bytes = tokio::fs::read(audio_path).await?;
        let file_name = audio_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("audio.mp3")
            .to_string();

        let request = CreateTranscriptionRequestArgs::default()
            .file(AudioInput::from_vec_u8(file_name, file_bytes))
            .model(&self.model)
            .response_format(AudioResponseFormat::VerboseJson)
            .build()
            .map_err(|e| SporError::Transcription(format!("Failed to build request: {}", e)))?;

        let response = self
            .client
            .audio()
            .transcribe_verbose_json(request)
            .await
            .map_err(|e| SporError::OpenAI(format!("Whisper API error: {}", e)))?;

        let segments: Vec<RawSegment> = match response.segments {
            Some(segs) => segs
                .iter()
                .map(|s| {
                    let start = f64::from(s.start);
                    let duration = (f64::from(s.end) - start).max(0.0);
                    RawSegment::new(s.text.trim(), start, duration)
                })
                .collect(),
            None => vec![RawSegment::new(
                response.text.trim(),
                0.0,
                f64::from(response.duration),
            )],
        };

        debug!("Transcribed {} segments", segments.len());
        Ok(segments)
    }

    /// Split a large file into pieces, transcribe them concurrently and
    /// shift each piece's timestamps by its offset.
    async fn transcribe_in_pieces(&self, audio_path: &Path) -> Result<Vec<RawSegment>> {
        let temp_dir = tempfile::tempdir()?;
        let pieces = split_audio(audio_path, temp_dir.path(), self.piece_seconds).await?;
        info!("Transcribing {} audio pieces with {}", pieces.len(), self.model);

        let mut results: Vec<(usize, f64, Vec<RawSegment>)> = Vec::with_capacity(pieces.len());

        let mut stream = stream::iter(pieces.into_iter().enumerate())
            .map(|(idx, (piece_path, offset))| async move {
                let result = self.transcribe_file(&piece_path).await;
                (idx, offset, result)
            })
            .buffer_unordered(self.max_concurrent);

        while let Some((idx, offset, result)) = stream.next().await {
            match result {
                Ok(segments) => results.push((idx, offset, segments)),
                Err(e) => {
                    return Err(SporError::Transcription(format!(
                        "Piece {} at {:.0}s failed: {}",
                        idx, offset, e
                    )));
                }
            }
        }

        results.sort_by_key(|(idx, _, _)| *idx);

        let segments = results
            .into_iter()
            .flat_map(|(_, offset, segments)| {
                segments.into_iter().map(move |mut segment| {
                    segment.start += offset;
                    segment
                })
            })
            .collect();

        Ok(segments)
    }
}

#[async_trait]
impl TranscriptSource for WhisperSource {
    fn name(&self) -> &str {
        "whisper"
    }

    #[instrument(skip(self), fields(video_id = %video_id))]
    async fn fetch(&self, video_id: &str) -> Result<Vec<RawSegment>> {
        let audio_path = download_audio(&watch_url(video_id), video_id, &self.work_dir).await?;
        let size_mb = file_size_mb(&audio_path).await?;
        debug!("Audio file is {:.1} MB", size_mb);

        let result = if size_mb < self.max_upload_mb as f64 {
            self.transcribe_file(&audio_path).await
        } else {
            self.transcribe_in_pieces(&audio_path).await
        };

        if let Err(e) = tokio::fs::remove_file(&audio_path).await {
            warn!("Failed to clean up audio file: {}", e);
        }

        result
    }
}
