//! Word-level transcript timestamps.
//!
//! Produced by the external transcription collaborator and consumed
//! read-only by the caption renderer. Ordering (non-decreasing `start`,
//! `end >= start`) is assumed, not re-validated: a malformed transcript
//! yields malformed captions, not an error.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A single transcribed word with its time span.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct WordTimestamp {
    /// The word as transcribed (may carry trailing punctuation)
    pub word: String,
    /// Start time in seconds, relative to the source recording
    pub start: f64,
    /// End time in seconds, relative to the source recording
    pub end: f64,
    /// Transcription confidence (0.0-1.0)
    #[serde(default = "default_confidence")]
    pub confidence: f64,
    /// Speaker label from diarization, if available
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speaker: Option<u32>,
}

fn default_confidence() -> f64 {
    1.0
}

impl WordTimestamp {
    /// Create a word with full confidence and no speaker label.
    pub fn new(word: impl Into<String>, start: f64, end: f64) -> Self {
        Self {
            word: word.into(),
            start,
            end,
            confidence: 1.0,
            speaker: None,
        }
    }

    /// Duration of the word in seconds.
    pub fn duration(&self) -> f64 {
        (self.end - self.start).max(0.0)
    }

    /// The word lowercased with surrounding punctuation stripped,
    /// for lexicon matching.
    pub fn bare(&self) -> String {
        self.word
            .trim()
            .trim_matches(|c: char| c.is_ascii_punctuation() || c == '\u{2013}' || c == '\u{2014}')
            .to_lowercase()
    }

    /// Whether this word's span overlaps the `[start, end)` window.
    ///
    /// Overlap rather than strict containment, so words straddling a
    /// clip boundary are not dropped.
    pub fn overlaps(&self, start: f64, end: f64) -> bool {
        self.end > start && self.start < end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_strips_punctuation() {
        assert_eq!(WordTimestamp::new("Um,", 0.0, 0.2).bare(), "um");
        assert_eq!(WordTimestamp::new("hello!", 0.0, 0.2).bare(), "hello");
        assert_eq!(WordTimestamp::new("'quoted'", 0.0, 0.2).bare(), "quoted");
    }

    #[test]
    fn test_overlap_at_boundaries() {
        let w = WordTimestamp::new("edge", 9.8, 10.2);
        assert!(w.overlaps(10.0, 40.0));
        assert!(w.overlaps(0.0, 10.0));
        assert!(!w.overlaps(10.2, 40.0));
        assert!(!w.overlaps(0.0, 9.8));
    }

    #[test]
    fn test_deserialize_defaults() {
        let w: WordTimestamp =
            serde_json::from_str(r#"{"word":"hi","start":1.0,"end":1.5}"#).unwrap();
        assert!((w.confidence - 1.0).abs() < f64::EPSILON);
        assert!(w.speaker.is_none());
    }
}
