//! Broad-question detection.
//!
//! Questions about the video as a whole ("summarize", "what is this video
//! about") are answered from the full transcript; everything else goes
//! through top-k retrieval.

use crate::error::{Result, SporError};
use regex::Regex;
use std::sync::LazyLock;

/// Built-in broad-intent rules, matched against the lower-cased question.
pub const BROAD_PATTERNS: &[(&str, &str)] = &[
    ("explain-video", r"explain (the )?video"),
    ("summarize", r"summarize"),
    ("video-about", r"what('?s| is) (this|the) video about"),
    ("overview", r"give (me )?(an )?overview"),
    ("tell-about-video", r"tell me about (this|the) video"),
];

static BUILTIN_RULES: LazyLock<Vec<(String, Regex)>> = LazyLock::new(|| {
    BROAD_PATTERNS
        .iter()
        .map(|(name, pattern)| (name.to_string(), Regex::new(pattern).expect("Invalid regex")))
        .collect()
});

/// Classifies questions as broad or specific.
#[derive(Debug, Clone)]
pub struct QueryClassifier {
    extra: Vec<(String, Regex)>,
}

impl QueryClassifier {
    /// Classifier with only the built-in rules.
    pub fn new() -> Self {
        Self { extra: Vec::new() }
    }

    /// Classifier with additional rules, named `custom-<n>`.
    pub fn with_patterns(patterns: &[String]) -> Result<Self> {
        let extra = patterns
            .iter()
            .enumerate()
            .map(|(i, pattern)| {
                Regex::new(pattern)
                    .map(|re| (format!("custom-{}", i + 1), re))
                    .map_err(|e| SporError::Config(format!("Invalid broad pattern {:?}: {}", pattern, e)))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { extra })
    }

    /// Name of the first rule matching `question`, if any.
    pub fn matching_rule(&self, question: &str) -> Option<&str> {
        let lowered = question.to_lowercase();
        BUILTIN_RULES
            .iter()
            .chain(self.extra.iter())
            .find(|(_, re)| re.is_match(&lowered))
            .map(|(name, _)| name.as_str())
    }

    pub fn is_broad(&self, question: &str) -> bool {
        self.matching_rule(question).is_some()
    }
}

impl Default for QueryClassifier {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_broad_questions() {
        let classifier = QueryClassifier::new();
        let cases = [
            ("Can you summarize this?", "summarize"),
            ("Please SUMMARIZE the talk", "summarize"),
            ("explain the video to me", "explain-video"),
            ("Explain video", "explain-video"),
            ("What's this video about?", "video-about"),
            ("whats the video about", "video-about"),
            ("What is the video about", "video-about"),
            ("give me an overview", "overview"),
            ("Give overview please", "overview"),
            ("Tell me about this video", "tell-about-video"),
        ];

        for (question, rule) in cases {
            assert_eq!(classifier.matching_rule(question), Some(rule), "{}", question);
            assert!(classifier.is_broad(question));
        }
    }

    #[test]
    fn test_specific_questions() {
        let classifier = QueryClassifier::new();
        for question in [
            "What does the speaker say about deltas at minute 5?",
            "Who is the narrator?",
            "explain the second formula",
            "what is a video codec",
            "give me a list of rivers",
            "tell me about rivers",
            "",
        ] {
            assert!(!classifier.is_broad(question), "{}", question);
        }
    }

    #[test]
    fn test_extra_patterns() {
        let classifier = QueryClassifier::with_patterns(&["main points".to_string()]).unwrap();
        assert_eq!(classifier.matching_rule("What are the main points?"), Some("custom-1"));
        assert!(classifier.is_broad("summarize"));

        let err = QueryClassifier::with_patterns(&["(unclosed".to_string()]).unwrap_err();
        assert!(matches!(err, SporError::Config(_)));
    }
}
