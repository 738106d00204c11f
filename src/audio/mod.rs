//! Audio acquisition for the speech recognition fallback.

mod downloader;

pub use downloader::{download_audio, file_size_mb, split_audio};
