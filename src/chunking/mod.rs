//! Turning raw transcript fragments into retrieval-sized chunks.
//!
//! Fragments are first merged into contiguous spans, then spans longer than
//! the target size are split on natural text boundaries with their timing
//! distributed across the parts.

mod merge;
mod splitter;

pub use merge::merge_segments;
pub use splitter::{RecursiveSplitter, DEFAULT_SEPARATORS};

use crate::config::ChunkingSettings;
use crate::transcript::RawSegment;
use serde::{Deserialize, Serialize};

/// A run of overlapping or touching transcript fragments.
#[derive(Debug, Clone, PartialEq)]
pub struct MergedSpan {
    pub text: String,
    pub start: f64,
    pub end: f64,
}

impl MergedSpan {
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

/// A chunk of transcript text with its position in the video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub text: String,
    /// Start time in seconds.
    pub start: f64,
    /// Duration in seconds.
    pub duration: f64,
}

impl Chunk {
    pub fn new(text: impl Into<String>, start: f64, duration: f64) -> Self {
        Self {
            text: text.into(),
            start,
            duration,
        }
    }

    pub fn end(&self) -> f64 {
        self.start + self.duration
    }

    /// Format the start time for display.
    pub fn format_timestamp(&self) -> String {
        format_timestamp(self.start)
    }
}

/// Format seconds as `MM:SS`, or `HH:MM:SS` past the hour.
pub fn format_timestamp(seconds: f64) -> String {
    let total_seconds = seconds.max(0.0) as u32;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let secs = total_seconds % 60;

    if hours > 0 {
        format!("{:02}:{:02}:{:02}", hours, minutes, secs)
    } else {
        format!("{:02}:{:02}", minutes, secs)
    }
}

/// Configuration for chunking.
#[derive(Debug, Clone)]
pub struct ChunkingConfig {
    /// Target chunk size in characters.
    pub target_chunk_size: usize,
    /// Look-back budget in characters for finding a sentence boundary.
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            target_chunk_size: 400,
            chunk_overlap: 50,
        }
    }
}

impl From<&ChunkingSettings> for ChunkingConfig {
    fn from(settings: &ChunkingSettings) -> Self {
        Self {
            target_chunk_size: settings.target_chunk_size,
            chunk_overlap: settings.chunk_overlap,
        }
    }
}

/// Split spans into chunks, distributing each span's duration over its parts
/// in proportion to their character length.
pub fn split_spans(spans: &[MergedSpan], config: &ChunkingConfig) -> Vec<Chunk> {
    let splitter = RecursiveSplitter::new(config.target_chunk_size, config.chunk_overlap);
    let mut chunks = Vec::new();

    for span in spans {
        let parts = splitter.split_text(&span.text);

        match parts.len() {
            0 => {}
            1 => chunks.push(Chunk::new(span.text.clone(), span.start, span.duration())),
            _ => distribute(span, &parts, &mut chunks),
        }
    }

    chunks
}

fn distribute(span: &MergedSpan, parts: &[&str], chunks: &mut Vec<Chunk>) {
    let total_chars = span.text.chars().count() as f64;
    let span_duration = span.duration();
    let first_of_span = chunks.len();

    let mut cursor = span.start;
    // Duration of leading whitespace-only parts, waiting for a chunk to own it.
    let mut pending = 0.0;

    for part in parts {
        let part_duration = span_duration * part.chars().count() as f64 / total_chars;
        cursor += part_duration;

        let text = part.trim();
        if text.is_empty() {
            let has_previous = chunks.len() > first_of_span;
            match chunks.last_mut() {
                Some(previous) if has_previous => previous.duration += part_duration,
                _ => pending += part_duration,
            }
            continue;
        }

        let duration = part_duration + pending;
        chunks.push(Chunk::new(text, cursor - duration, duration));
        pending = 0.0;
    }
}

/// Merge raw segments and split the result into chunks.
pub fn merge_and_split(segments: &[RawSegment], config: &ChunkingConfig) -> Vec<Chunk> {
    split_spans(&merge_segments(segments), config)
}

/// Space-joined text of all chunks, in order.
pub fn full_text(chunks: &[Chunk]) -> String {
    chunks
        .iter()
        .map(|c| c.text.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span(text: &str, start: f64, end: f64) -> MergedSpan {
        MergedSpan {
            text: text.to_string(),
            start,
            end,
        }
    }

    fn small_config(size: usize) -> ChunkingConfig {
        ChunkingConfig {
            target_chunk_size: size,
            chunk_overlap: 10,
        }
    }

    #[test]
    fn test_empty_spans() {
        assert!(split_spans(&[], &ChunkingConfig::default()).is_empty());
    }

    #[test]
    fn test_short_span_is_not_split() {
        let spans = [span("  a short span  ", 12.0, 15.5)];
        let chunks = split_spans(&spans, &ChunkingConfig::default());
        assert_eq!(chunks, vec![Chunk::new("  a short span  ", 12.0, 3.5)]);
    }

    #[test]
    fn test_durations_sum_to_span_and_are_contiguous() {
        let text = "The river starts in the mountains. It flows for a long way through the plains. \
                    Farmers depend on it every year. Floods can be dangerous though.";
        let spans = [span(text, 100.0, 160.0)];
        let chunks = split_spans(&spans, &small_config(40));

        assert!(chunks.len() > 1);
        let total: f64 = chunks.iter().map(|c| c.duration).sum();
        assert!((total - 60.0).abs() < 1e-6 * 60.0, "total {}", total);

        assert!((chunks[0].start - 100.0).abs() < 1e-9);
        for pair in chunks.windows(2) {
            assert!((pair[0].end() - pair[1].start).abs() < 1e-6);
        }
        for chunk in &chunks {
            assert!(chunk.duration >= 0.0);
            assert_eq!(chunk.text, chunk.text.trim());
        }
    }

    #[test]
    fn test_duration_is_proportional_to_length() {
        // Parts are "aaaa. bbbb." (11 chars) and " cccc." (6 chars).
        let spans = [span("aaaa. bbbb. cccc.", 0.0, 17.0)];
        let config = ChunkingConfig {
            target_chunk_size: 12,
            chunk_overlap: 0,
        };
        let chunks = split_spans(&spans, &config);

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].text, "aaaa. bbbb.");
        assert!((chunks[0].duration - 11.0).abs() < 1e-9);
        assert_eq!(chunks[1].text, "cccc.");
        assert!((chunks[1].start - 11.0).abs() < 1e-9);
        assert!((chunks[1].duration - 6.0).abs() < 1e-9);
    }

    #[test]
    fn test_whitespace_part_donates_duration() {
        let spans = [span("abcd    ", 0.0, 8.0)];
        let config = ChunkingConfig {
            target_chunk_size: 4,
            chunk_overlap: 0,
        };
        let chunks = split_spans(&spans, &config);

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "abcd");
        assert!((chunks[0].duration - 8.0).abs() < 1e-9);
    }

    #[test]
    fn test_merge_and_split_end_to_end() {
        let segments = vec![
            RawSegment::new("world", 1.0, 1.0),
            RawSegment::new("hello", 0.0, 1.0),
            RawSegment::new("later part", 10.0, 2.0),
        ];
        let chunks = merge_and_split(&segments, &ChunkingConfig::default());

        assert_eq!(
            chunks,
            vec![Chunk::new("hello world", 0.0, 2.0), Chunk::new("later part", 10.0, 2.0)]
        );
        assert_eq!(full_text(&chunks), "hello world later part");
    }

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp(65.4), "01:05");
        assert_eq!(format_timestamp(3725.0), "01:02:05");
        assert_eq!(Chunk::new("x", 0.0, 1.0).format_timestamp(), "00:00");
    }
}
