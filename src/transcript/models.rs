//! Raw transcript segments as delivered by a transcript source.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single time-stamped transcript fragment.
///
/// Fragments may overlap or arrive out of order; [`crate::chunking::merge_segments`]
/// turns them into clean spans.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawSegment {
    /// Spoken text.
    pub text: String,
    /// Start time in seconds.
    pub start: f64,
    /// Duration in seconds.
    pub duration: f64,
}

impl RawSegment {
    /// Create a new raw segment.
    pub fn new(text: impl Into<String>, start: f64, duration: f64) -> Self {
        Self {
            text: text.into(),
            start,
            duration,
        }
    }

    /// End time in seconds.
    pub fn end(&self) -> f64 {
        self.start + self.duration
    }

    /// Timing is finite and non-negative.
    pub fn is_well_formed(&self) -> bool {
        self.start.is_finite() && self.duration.is_finite() && self.start >= 0.0 && self.duration >= 0.0
    }

    /// Parse a loosely-typed JSON list of `{text, start, duration}` objects.
    ///
    /// All or nothing: if the value is not an array, or any element is
    /// missing a field or carries invalid timing, the result is empty.
    pub fn parse_list(value: &Value) -> Vec<RawSegment> {
        let Some(items) = value.as_array() else {
            return Vec::new();
        };

        let parsed: Option<Vec<RawSegment>> = items.iter().map(Self::parse_one).collect();
        parsed.unwrap_or_default()
    }

    fn parse_one(value: &Value) -> Option<RawSegment> {
        let obj = value.as_object()?;
        let text = obj.get("text")?.as_str()?;
        let start = obj.get("start")?.as_f64()?;
        let duration = obj.get("duration")?.as_f64()?;

        let segment = RawSegment::new(text, start, duration);
        segment.is_well_formed().then_some(segment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_list() {
        let value = json!([
            {"text": "hello", "start": 0.0, "duration": 1.5},
            {"text": "world", "start": 1.5, "duration": 2}
        ]);

        let segments = RawSegment::parse_list(&value);
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[1].text, "world");
        assert_eq!(segments[1].end(), 3.5);
    }

    #[test]
    fn test_missing_start_rejects_whole_list() {
        let value = json!([
            {"text": "hello", "start": 0.0, "duration": 1.0},
            {"text": "no start", "duration": 1.0}
        ]);
        assert!(RawSegment::parse_list(&value).is_empty());
    }

    #[test]
    fn test_wrong_shape_is_empty() {
        assert!(RawSegment::parse_list(&json!({"text": "x"})).is_empty());
        assert!(RawSegment::parse_list(&json!(["x", "y"])).is_empty());
        assert!(RawSegment::parse_list(&json!(null)).is_empty());
    }

    #[test]
    fn test_negative_timing_is_malformed() {
        let value = json!([{"text": "x", "start": -1.0, "duration": 1.0}]);
        assert!(RawSegment::parse_list(&value).is_empty());
        assert!(!RawSegment::new("x", 0.0, f64::NAN).is_well_formed());
    }
}
