//! Merging raw transcript fragments into contiguous spans.

use super::MergedSpan;
use crate::transcript::RawSegment;

struct OpenSpan {
    text: String,
    start: f64,
    end: f64,
}

impl OpenSpan {
    fn begin(segment: &RawSegment) -> Self {
        Self {
            text: segment.text.clone(),
            start: segment.start,
            end: segment.end(),
        }
    }

    fn close(self) -> MergedSpan {
        MergedSpan {
            text: self.text.trim().to_string(),
            start: self.start,
            end: self.end,
        }
    }
}

/// Merge overlapping or touching segments into time-ordered spans.
///
/// Segments are sorted by start time (stable, so equal starts keep their
/// input order). A segment that starts at or before the end of the open
/// span is appended to it with a single space and may extend its end;
/// otherwise the open span is closed and a new one begins.
///
/// Input with any malformed segment (negative or non-finite timing)
/// produces no spans.
pub fn merge_segments(segments: &[RawSegment]) -> Vec<MergedSpan> {
    if segments.iter().any(|s| !s.is_well_formed()) {
        return Vec::new();
    }

    let mut sorted: Vec<&RawSegment> = segments.iter().collect();
    sorted.sort_by(|a, b| a.start.total_cmp(&b.start));

    let mut spans = Vec::new();
    let mut current: Option<OpenSpan> = None;

    for segment in sorted {
        if let Some(open) = current.as_mut() {
            if segment.start <= open.end {
                open.text.push(' ');
                open.text.push_str(&segment.text);
                open.end = open.end.max(segment.end());
                continue;
            }
        }

        if let Some(done) = current.take() {
            spans.push(done.close());
        }
        current = Some(OpenSpan::begin(segment));
    }

    if let Some(done) = current {
        spans.push(done.close());
    }

    spans
}
