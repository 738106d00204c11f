//! Interactive chat about a single video.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::ChatOrchestrator;
use anyhow::Result;
use console::style;
use std::io::{self, BufRead, Write};
use uuid::Uuid;

/// Run the interactive chat command.
///
/// Every line is asked in the same session, so follow-up questions see the
/// earlier turns.
pub async fn run_chat(video: &str, settings: &Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Answer, settings) {
        Output::error(&format!("{}", e));
        Output::info("Run 'spor doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    let orchestrator = ChatOrchestrator::from_settings(settings)?;
    let session_id = Uuid::new_v4().to_string();

    println!("\n{}", style("Spor Chat").bold().cyan());
    println!("{}\n", style("Ask about the video, or type 'exit' to quit.").dim());

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("{} ", style("You:").green().bold());
        stdout.flush()?;

        let mut input = String::new();
        if stdin.lock().read_line(&mut input)? == 0 {
            break;
        }

        let input = input.trim();
        if input.is_empty() {
            continue;
        }

        if is_exit(input) {
            Output::info("Goodbye!");
            break;
        }

        let spinner = Output::spinner("Thinking...");
        let result = orchestrator.answer(video, &session_id, input).await;
        spinner.finish_and_clear();

        match result {
            Ok(answer) => println!("\n{} {}\n", style("Spor:").cyan().bold(), answer),
            Err(e) => Output::error(&format!("Error: {}", e)),
        }
    }

    Ok(())
}

fn is_exit(input: &str) -> bool {
    input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit")
}
