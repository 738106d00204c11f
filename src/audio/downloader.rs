//! Audio download and processing utilities.
//!
//! Downloads a video's audio track with yt-dlp and cuts it into pieces with
//! ffmpeg when it is too large for a single recognition request.

use crate::error::{Result, SporError};
use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};
use tokio::process::Command;
use tracing::{debug, info, instrument, warn};

/// Run an external tool to completion, mapping a missing binary to
/// [`SporError::ToolNotFound`].
async fn run_tool(name: &str, command: &mut Command) -> Result<Output> {
    match command.stdout(Stdio::piped()).stderr(Stdio::piped()).output().await {
        Ok(output) => Ok(output),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(SporError::ToolNotFound(name.into())),
        Err(e) => Err(SporError::ToolFailed(format!("{name} execution failed: {e}"))),
    }
}

fn tool_error(name: &str, output: &Output) -> SporError {
    let stderr = String::from_utf8_lossy(&output.stderr);
    SporError::AudioDownload(format!("{name} failed: {}", stderr.trim()))
}

/// Downloads the audio of `url` into `output_dir` as `<video_id>.mp3`.
///
/// An existing file for the same video is reused.
#[instrument(skip(output_dir), fields(video_id = %video_id))]
pub async fn download_audio(url: &str, video_id: &str, output_dir: &Path) -> Result<PathBuf> {
    tokio::fs::create_dir_all(output_dir).await?;

    let target_path = output_dir.join(format!("{}.mp3", video_id));
    if target_path.exists() {
        info!("Using cached audio file");
        return Ok(target_path);
    }

    info!("Downloading audio from {}", url);
    let template = output_dir.join(format!("{}.%(ext)s", video_id));

    let output = run_tool(
        "yt-dlp",
        Command::new("yt-dlp")
            .arg("--format").arg("bestaudio/best")
            .arg("--extract-audio")
            .arg("--audio-format").arg("mp3")
            .arg("--output").arg(template.to_str().unwrap_or_default())
            .arg("--no-playlist")
            .arg("--quiet")
            .arg("--no-warnings")
            .arg(url),
    )
    .await?;

    if !output.status.success() {
        return Err(tool_error("yt-dlp", &output));
    }

    let downloaded = find_audio_file(output_dir, video_id)?;
    if downloaded != target_path {
        convert_to_mp3(&downloaded, &target_path).await?;
        let _ = tokio::fs::remove_file(&downloaded).await;
    }

    Ok(target_path)
}

/// Locates a downloaded audio file by video ID.
fn find_audio_file(dir: &Path, video_id: &str) -> Result<PathBuf> {
    for ext in ["mp3", "opus", "m4a", "webm", "ogg"] {
        let candidate = dir.join(format!("{}.{}", video_id, ext));
        if candidate.exists() {
            return Ok(candidate);
        }
    }

    std::fs::read_dir(dir)?
        .flatten()
        .find(|entry| entry.file_name().to_string_lossy().starts_with(video_id))
        .map(|entry| entry.path())
        .ok_or_else(|| SporError::AudioDownload("Audio file not found after download".into()))
}

async fn convert_to_mp3(source: &Path, dest: &Path) -> Result<()> {
    debug!("Converting {:?} to MP3", source);

    let output = run_tool(
        "ffmpeg",
        Command::new("ffmpeg")
            .arg("-i").arg(source)
            .arg("-vn")
            .arg("-codec:a").arg("libmp3lame")
            .arg("-qscale:a").arg("2")
            .arg("-y")
            .arg("-loglevel").arg("error")
            .arg(dest),
    )
    .await?;

    if output.status.success() {
        Ok(())
    } else {
        Err(tool_error("ffmpeg", &output))
    }
}

/// Size of a file in megabytes.
pub async fn file_size_mb(path: &Path) -> Result<f64> {
    let metadata = tokio::fs::metadata(path).await?;
    Ok(metadata.len() as f64 / (1024.0 * 1024.0))
}

/// Cut `source` into consecutive pieces of `piece_seconds`.
///
/// Returns `(piece_path, offset_seconds)` in playback order.
#[instrument(skip_all)]
pub async fn split_audio(
    source: &Path,
    output_dir: &Path,
    piece_seconds: u32,
) -> Result<Vec<(PathBuf, f64)>> {
    tokio::fs::create_dir_all(output_dir).await?;

    let total_duration = probe_duration(source).await?;
    let piece_len = f64::from(piece_seconds.max(1));
    info!("Total audio duration: {:.1}s", total_duration);

    if total_duration <= piece_len {
        return Ok(vec![(source.to_path_buf(), 0.0)]);
    }

    let base_name = source.file_stem().and_then(|s| s.to_str()).unwrap_or("audio");

    let mut pieces = Vec::new();
    let mut offset = 0.0;
    while offset < total_duration {
        let piece_path = output_dir.join(format!("{}_{:04}.mp3", base_name, pieces.len()));
        let length = piece_len.min(total_duration - offset);

        extract_piece(source, &piece_path, offset, length).await?;
        debug!("Created piece at offset {:.1}s", offset);

        pieces.push((piece_path, offset));
        offset += piece_len;
    }

    info!("Created {} audio pieces", pieces.len());
    Ok(pieces)
}

async fn extract_piece(source: &Path, dest: &Path, start: f64, length: f64) -> Result<()> {
    let mut copy = Command::new("ffmpeg");
    copy.arg("-ss").arg(format!("{:.3}", start))
        .arg("-i").arg(source)
        .arg("-t").arg(format!("{:.3}", length))
        .arg("-c").arg("copy")
        .arg("-y")
        .arg("-loglevel").arg("warning")
        .arg(dest);

    let copied = run_tool("ffmpeg", &mut copy).await?;
    if copied.status.success() && dest.exists() {
        return Ok(());
    }

    warn!("Stream copy failed, re-encoding piece");

    let mut encode = Command::new("ffmpeg");
    encode.arg("-ss").arg(format!("{:.3}", start))
        .arg("-i").arg(source)
        .arg("-t").arg(format!("{:.3}", length))
        .arg("-codec:a").arg("libmp3lame")
        .arg("-qscale:a").arg("2")
        .arg("-y")
        .arg("-loglevel").arg("error")
        .arg(dest);

    let encoded = run_tool("ffmpeg", &mut encode).await?;
    if encoded.status.success() {
        Ok(())
    } else {
        Err(tool_error("ffmpeg", &encoded))
    }
}

/// Queries the duration of an audio file using ffprobe with JSON output.
async fn probe_duration(path: &Path) -> Result<f64> {
    let output = run_tool(
        "ffprobe",
        Command::new("ffprobe")
            .arg("-v").arg("quiet")
            .arg("-print_format").arg("json")
            .arg("-show_format")
            .arg(path),
    )
    .await?;

    if !output.status.success() {
        return Err(tool_error("ffprobe", &output));
    }

    parse_probe_duration(&String::from_utf8_lossy(&output.stdout))
}

fn parse_probe_duration(json: &str) -> Result<f64> {
    let parsed: serde_json::Value = serde_json::from_str(json)
        .map_err(|_| SporError::AudioDownload("Invalid ffprobe output".into()))?;

    parsed["format"]["duration"]
        .as_str()
        .and_then(|s| s.parse::<f64>().ok())
        .ok_or_else(|| SporError::AudioDownload("Could not determine audio duration".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_probe_duration() {
        let json = r#"{"format": {"filename": "a.mp3", "duration": "612.480000"}}"#;
        assert!((parse_probe_duration(json).unwrap() - 612.48).abs() < 1e-9);
        assert!(parse_probe_duration(r#"{"format": {}}"#).is_err());
        assert!(parse_probe_duration("nope").is_err());
    }

    #[test]
    fn test_find_audio_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(find_audio_file(dir.path(), "vid").is_err());

        std::fs::write(dir.path().join("vid.weird"), b"x").unwrap();
        assert!(find_audio_file(dir.path(), "vid").unwrap().ends_with("vid.weird"));

        std::fs::write(dir.path().join("vid.m4a"), b"x").unwrap();
        assert!(find_audio_file(dir.path(), "vid").unwrap().ends_with("vid.m4a"));
    }

    #[tokio::test]
    async fn test_file_size_mb() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.bin");
        std::fs::write(&path, vec![0u8; 512 * 1024]).unwrap();
        assert!((file_size_mb(&path).await.unwrap() - 0.5).abs() < 1e-9);
    }
}
