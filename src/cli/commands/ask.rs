//! Ask command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::ChatOrchestrator;
use anyhow::Result;

/// Run the ask command.
pub async fn run_ask(video: &str, question: &str, session: &str, settings: &Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Answer, settings) {
        Output::error(&format!("{}", e));
        Output::info("Run 'spor doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    let orchestrator = ChatOrchestrator::from_settings(settings)?;

    let spinner = Output::spinner("Reading the transcript...");
    let result = orchestrator.answer(video, session, question).await;
    spinner.finish_and_clear();

    match result {
        Ok(answer) => {
            Output::answer(&answer);
            Ok(())
        }
        Err(e) => {
            Output::error(&format!("Failed to generate answer: {}", e));
            Err(e.into())
        }
    }
}
