//! CLI module for Spor.

pub mod commands;
mod output;
pub mod preflight;

pub use output::{content_preview, Output};

use clap::{Parser, Subcommand, ValueEnum};

/// Spor - ask questions about a video
///
/// Fetches a video's transcript (captions, or speech recognition as a
/// fallback), indexes it and answers questions about what is said.
/// The name comes from the Norwegian "spør", "ask."
#[derive(Parser, Debug)]
#[command(name = "spor")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check system requirements and configuration
    Doctor,

    /// Start the chat HTTP server
    Serve {
        /// Host to bind to (defaults to server.host)
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to (defaults to server.port)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Ask a single question about a video
    Ask {
        /// YouTube URL or video ID
        video: String,

        /// The question to ask
        question: String,

        /// Session to continue
        #[arg(short, long, default_value = "cli")]
        session: String,
    },

    /// Start an interactive chat about a video
    Chat {
        /// YouTube URL or video ID
        video: String,
    },

    /// Fetch a video's transcript and print its chunks
    Transcript {
        /// YouTube URL or video ID
        video: String,

        /// Output format
        #[arg(long, value_enum, default_value_t = TranscriptFormat::Text)]
        format: TranscriptFormat,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TranscriptFormat {
    /// Timestamped lines
    Text,
    /// JSON array of chunks
    Json,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Open configuration file in editor
    Edit,

    /// Show configuration file path
    Path,
}
