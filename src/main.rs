//! Spor CLI entry point.

use anyhow::Result;
use clap::Parser;
use spor::cli::{commands, Cli, Commands};
use spor::config::Settings;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("spor={}", log_level)),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    // Load configuration
    let config_path = cli.config.as_ref().map(PathBuf::from);
    let settings = Settings::load_from(config_path.as_deref())?;

    // Ensure data directories exist
    std::fs::create_dir_all(settings.data_dir())?;
    std::fs::create_dir_all(settings.temp_dir())?;

    match &cli.command {
        Commands::Doctor => {
            commands::run_doctor(&settings)?;
        }

        Commands::Serve { host, port } => {
            commands::run_serve(host.as_deref(), *port, &settings).await?;
        }

        Commands::Ask {
            video,
            question,
            session,
        } => {
            commands::run_ask(video, question, session, &settings).await?;
        }

        Commands::Chat { video } => {
            commands::run_chat(video, &settings).await?;
        }

        Commands::Transcript { video, format } => {
            commands::run_transcript(video, *format, &settings).await?;
        }

        Commands::Config { action } => {
            commands::run_config(action, config_path.as_deref(), &settings)?;
        }
    }

    Ok(())
}
