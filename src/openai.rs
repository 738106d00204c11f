//! OpenAI client configuration with sensible defaults.

use crate::error::{Result, SporError};
use async_openai::{config::OpenAIConfig, Client};
use std::time::Duration;

/// Default timeout for OpenAI API requests (5 minutes).
const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Create an OpenAI client with configured timeout.
///
/// Uses a 5-minute timeout by default so a hung transcription or
/// completion call only stalls its own request.
pub fn create_client() -> Result<Client<OpenAIConfig>> {
    create_client_with_timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
}

/// Create an OpenAI client with a custom timeout.
pub fn create_client_with_timeout(timeout: Duration) -> Result<Client<OpenAIConfig>> {
    let http_client = reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| SporError::Config(format!("Failed to create HTTP client: {}", e)))?;

    Ok(Client::with_config(OpenAIConfig::default()).with_http_client(http_client))
}
