//! Transcript command: fetch a video's transcript and print its chunks.

use crate::chunking::{merge_and_split, Chunk, ChunkingConfig};
use crate::cli::preflight::{self, Operation};
use crate::cli::{Output, TranscriptFormat};
use crate::config::Settings;
use crate::orchestrator::NO_TRANSCRIPT_ANSWER;
use crate::transcript::{create_source, parse_video_id, TranscriptSource};
use anyhow::Result;

/// Run the transcript command.
pub async fn run_transcript(video: &str, format: TranscriptFormat, settings: &Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Transcript, settings) {
        Output::error(&format!("{}", e));
        Output::info("Run 'spor doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    let video_id = parse_video_id(video).unwrap_or_else(|| video.trim().to_string());
    let source = create_source(settings)?;

    let spinner = Output::spinner(&format!("Fetching transcript for {}...", video_id));
    let fetched = source.fetch(&video_id).await;
    spinner.finish_and_clear();

    let chunks = match fetched {
        Ok(segments) => merge_and_split(&segments, &ChunkingConfig::from(&settings.chunking)),
        Err(e) => {
            tracing::warn!("Transcript fetch failed for {}: {}", video_id, e);
            Vec::new()
        }
    };

    if chunks.is_empty() {
        Output::warning(NO_TRANSCRIPT_ANSWER);
        return Ok(());
    }

    match format {
        TranscriptFormat::Json => println!("{}", to_json(&chunks)?),
        TranscriptFormat::Text => {
            for chunk in &chunks {
                Output::chunk(&chunk.format_timestamp(), chunk.duration, chunk.text.trim());
            }
        }
    }
    Ok(())
}

fn to_json(chunks: &[Chunk]) -> Result<String> {
    Ok(serde_json::to_string_pretty(chunks)?)
}
