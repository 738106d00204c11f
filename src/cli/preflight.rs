//! Pre-flight checks before expensive operations.
//!
//! Validates that required tools and configuration are available
//! before starting operations that would otherwise fail midway.

use crate::config::{Settings, VectorStoreProvider};
use crate::error::{Result, SporError};
use std::process::Command;

/// Requirements for different operations.
#[derive(Debug, Clone, Copy)]
pub enum Operation {
    /// Answering questions: transcripts, embeddings and generation.
    Answer,
    /// Fetching a transcript only.
    Transcript,
}

/// Run pre-flight checks for the given operation.
pub fn check(operation: Operation, settings: &Settings) -> Result<()> {
    if matches!(operation, Operation::Answer) {
        check_api_key("OPENAI_API_KEY")?;
        if settings.vector_store.provider == VectorStoreProvider::Pinecone {
            check_api_key(&settings.vector_store.pinecone.api_key_env)?;
        }
    }

    for tool in required_tools(settings) {
        check_tool(tool)?;
    }
    if settings.transcript.asr && !matches!(operation, Operation::Answer) {
        check_api_key("OPENAI_API_KEY")?;
    }
    Ok(())
}

/// External tools the configured transcript sources need.
pub fn required_tools(settings: &Settings) -> Vec<&'static str> {
    let mut tools = Vec::new();
    if settings.transcript.captions || settings.transcript.asr {
        tools.push("yt-dlp");
    }
    if settings.transcript.asr {
        tools.push("ffmpeg");
        tools.push("ffprobe");
    }
    tools
}

/// Check that an API key environment variable is set.
pub fn check_api_key(var: &str) -> Result<()> {
    match std::env::var(var) {
        Ok(key) if !key.trim().is_empty() => Ok(()),
        Ok(_) => Err(SporError::Config(format!("{} is empty.", var))),
        Err(_) => Err(SporError::Config(format!(
            "{} not set. Set it with: export {}='...'",
            var, var
        ))),
    }
}

/// Check if an external tool is available.
pub fn check_tool(name: &str) -> Result<()> {
    // ffmpeg/ffprobe use -version (single dash), others use --version
    let version_arg = match name {
        "ffmpeg" | "ffprobe" => "-version",
        _ => "--version",
    };
    match Command::new(name).arg(version_arg).output() {
        Ok(output) if output.status.success() => Ok(()),
        Ok(_) => Err(SporError::ToolNotFound(format!(
            "{} is installed but not working correctly",
            name
        ))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(SporError::ToolNotFound(name.to_string())),
        Err(e) => Err(SporError::ToolNotFound(format!("{}: {}", name, e))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_tools_follow_sources() {
        let mut settings = Settings::default();
        assert_eq!(required_tools(&settings), vec!["yt-dlp", "ffmpeg", "ffprobe"]);

        settings.transcript.asr = false;
        assert_eq!(required_tools(&settings), vec!["yt-dlp"]);

        settings.transcript.captions = false;
        assert!(required_tools(&settings).is_empty());
    }

    #[test]
    fn test_local_only_transcript_needs_nothing() {
        let mut settings = Settings::default();
        settings.transcript.captions = false;
        settings.transcript.asr = false;
        assert!(check(Operation::Transcript, &settings).is_ok());
    }

    #[test]
    fn test_missing_tool() {
        let err = check_tool("spor-no-such-tool").unwrap_err();
        assert!(matches!(err, SporError::ToolNotFound(_)));
        assert!(check_api_key("SPOR_TEST_UNSET_KEY").is_err());
    }
}
