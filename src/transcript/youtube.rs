//! YouTube video id handling.

use regex::Regex;
use std::sync::LazyLock;

static VIDEO_ID_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    // Matches various YouTube URL formats and bare video IDs
    Regex::new(
        r"(?x)
        (?:
            # Full YouTube URLs
            (?:https?://)?
            (?:www\.|m\.)?
            (?:youtube\.com/watch\?(?:.*&)?v=|youtu\.be/|youtube\.com/embed/|youtube\.com/v/|youtube\.com/shorts/)
            ([a-zA-Z0-9_-]{11})
        )
        |
        # Bare video ID (11 characters)
        ^([a-zA-Z0-9_-]{11})$
    ",
    )
    .expect("Invalid regex")
});

/// Extract a video ID from a YouTube URL or bare ID.
pub fn parse_video_id(input: &str) -> Option<String> {
    let caps = VIDEO_ID_REGEX.captures(input.trim())?;

    caps.get(1)
        .or_else(|| caps.get(2))
        .map(|m| m.as_str().to_string())
}

/// Watch URL for a video ID.
pub fn watch_url(video_id: &str) -> String {
    format!("https://www.youtube.com/watch?v={}", video_id)
}
