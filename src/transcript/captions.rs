//! Published and automatic captions, fetched with yt-dlp.

use super::youtube::watch_url;
use super::{RawSegment, TranscriptSource};
use crate::error::{Result, SporError};
use async_trait::async_trait;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info, instrument};

/// Caption track fetcher.
///
/// Asks yt-dlp for the first available caption track in the preferred
/// languages (manual captions win over automatic ones) in YouTube's
/// `json3` timed-text format.
pub struct CaptionSource {
    languages: Vec<String>,
}

impl CaptionSource {
    pub fn new(languages: Vec<String>) -> Self {
        Self { languages }
    }

    async fn download_tracks(&self, video_id: &str, output_dir: &Path) -> Result<()> {
        let template = output_dir.join(format!("{}.%(ext)s", video_id));

        let result = Command::new("yt-dlp")
            .arg("--skip-download")
            .arg("--write-subs")
            .arg("--write-auto-subs")
            .arg("--sub-format").arg("json3")
            .arg("--sub-langs").arg(self.languages.join(","))
            .arg("--output").arg(template.to_str().unwrap_or_default())
            .arg("--no-playlist")
            .arg("--quiet")
            .arg("--no-warnings")
            .arg(watch_url(video_id))
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await;

        let output = match result {
            Ok(o) => o,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(SporError::ToolNotFound("yt-dlp".into()));
            }
            Err(e) => {
                return Err(SporError::ToolFailed(format!("yt-dlp execution failed: {e}")));
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SporError::TranscriptSource(format!("yt-dlp failed: {stderr}")));
        }

        Ok(())
    }
}

#[async_trait]
impl TranscriptSource for CaptionSource {
    fn name(&self) -> &str {
        "captions"
    }

    #[instrument(skip(self), fields(video_id = %video_id))]
    async fn fetch(&self, video_id: &str) -> Result<Vec<RawSegment>> {
        let temp_dir = tempfile::tempdir()?;
        self.download_tracks(video_id, temp_dir.path()).await?;

        let track = pick_caption_file(temp_dir.path(), video_id, &self.languages).ok_or_else(|| {
            SporError::TranscriptSource(format!("No captions available for {}", video_id))
        })?;

        info!("Using caption track {:?}", track.file_name().unwrap_or_default());
        let content = tokio::fs::read_to_string(&track).await?;
        let segments = parse_json3(&content)?;
        debug!("Parsed {} caption events", segments.len());

        Ok(segments)
    }
}

/// Choose the downloaded track matching the earliest preferred language,
/// falling back to any json3 track for the video.
pub fn pick_caption_file(dir: &Path, video_id: &str, languages: &[String]) -> Option<PathBuf> {
    for lang in languages {
        let candidate = dir.join(format!("{}.{}.json3", video_id, lang));
        if candidate.exists() {
            return Some(candidate);
        }
    }

    let mut others: Vec<PathBuf> = std::fs::read_dir(dir)
        .ok()?
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| {
            let name = path.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_default();
            name.starts_with(video_id) && name.ends_with(".json3")
        })
        .collect();
    others.sort();
    others.into_iter().next()
}

#[derive(Debug, Deserialize)]
struct TimedText {
    #[serde(default)]
    events: Vec<TimedTextEvent>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TimedTextEvent {
    t_start_ms: Option<f64>,
    d_duration_ms: Option<f64>,
    #[serde(default)]
    segs: Vec<TimedTextSeg>,
}

#[derive(Debug, Deserialize)]
struct TimedTextSeg {
    #[serde(default)]
    utf8: String,
}

/// Parse YouTube `json3` timed text into raw segments.
///
/// Events without text (window setup, bare line breaks) are skipped.
pub fn parse_json3(content: &str) -> Result<Vec<RawSegment>> {
    let timed: TimedText = serde_json::from_str(content)
        .map_err(|e| SporError::TranscriptSource(format!("Invalid caption track: {}", e)))?;

    let segments = timed
        .events
        .into_iter()
        .filter_map(|event| {
            let text: String = event.segs.iter().map(|s| s.utf8.as_str()).collect();
            let text = text.replace('\n', " ").trim().to_string();
            if text.is_empty() {
                return None;
            }
            let start = event.t_start_ms? / 1000.0;
            let duration = event.d_duration_ms.unwrap_or(0.0) / 1000.0;
            Some(RawSegment::new(text, start, duration))
        })
        .collect();

    Ok(segments)
}
