//! Pipeline configuration.
//!
//! Everything the calling layer may want to override lives here:
//! loudness target, duration limits, the filler lexicon, silence
//! compression, face sampling, caption timing adjustment, and the
//! encode timeout.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Output frame width in pixels.
pub const OUTPUT_WIDTH: u32 = 1080;
/// Output frame height in pixels.
pub const OUTPUT_HEIGHT: u32 = 1920;
/// Output frame rate; outro inputs are normalized to this before concat.
pub const OUTPUT_FPS: u32 = 30;

/// Default audio codec for all encodes.
pub const AUDIO_CODEC: &str = "aac";
/// Default audio bitrate.
pub const AUDIO_BITRATE: &str = "128k";
/// Default audio sample rate.
pub const AUDIO_SAMPLE_RATE: u32 = 44100;

/// Configuration for the clip rendering pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    /// Directory finished clips are moved into
    pub output_dir: PathBuf,

    /// Target integrated loudness in LUFS. Short-form platforms
    /// normalize to roughly -14.
    pub target_lufs: f64,

    /// Maximum accepted clip duration in seconds. Requests longer than
    /// this are rejected before any encoder work.
    pub max_clip_secs: f64,

    /// Tokens stripped from caption text when `clean_fillers` is set.
    /// Matching is against the lowercased, punctuation-stripped word.
    pub filler_words: Vec<String>,

    /// Word gap (seconds) above which the encode timeline is
    /// compressed when filler cleanup is active. Tunable; there is no
    /// authoritative default, 1.5s matches typical conversational
    /// pausing.
    pub silence_gap_threshold: f64,

    /// What a compressed gap shrinks to, in seconds.
    pub compressed_gap: f64,

    /// Interval between face-detection samples, in seconds.
    pub face_sample_interval: f64,

    /// Global caption timing offset in seconds, applied before words
    /// are sliced to the clip window.
    pub time_adjust: f64,

    /// Maximum words per caption cue. `None` uses the style preset's
    /// own chunk size.
    pub max_words_per_cue: Option<usize>,

    /// Maximum cue duration in seconds; a longer run of words is split
    /// even below the word-count cap.
    pub max_cue_secs: f64,

    /// Hard wall-clock limit for one transcoder invocation, seconds.
    pub encode_timeout_secs: u64,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("clips"),
            target_lufs: -14.0,
            max_clip_secs: 180.0,
            filler_words: default_filler_words(),
            silence_gap_threshold: 1.5,
            compressed_gap: 0.3,
            face_sample_interval: 1.0,
            time_adjust: 0.0,
            max_words_per_cue: None,
            max_cue_secs: 5.0,
            encode_timeout_secs: 600,
        }
    }
}

fn default_filler_words() -> Vec<String> {
    [
        "um", "uh", "uhh", "uhm", "umm", "hmm", "hm", "mhm", "ah", "er", "erm", "eh",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

impl RenderConfig {
    /// Create config from environment variables, falling back to
    /// defaults for anything unset.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            output_dir: std::env::var("PODCLIP_OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.output_dir),
            target_lufs: env_parse("PODCLIP_TARGET_LUFS", defaults.target_lufs),
            max_clip_secs: env_parse("PODCLIP_MAX_CLIP_SECS", defaults.max_clip_secs),
            filler_words: defaults.filler_words,
            silence_gap_threshold: env_parse(
                "PODCLIP_SILENCE_GAP_SECS",
                defaults.silence_gap_threshold,
            ),
            compressed_gap: env_parse("PODCLIP_COMPRESSED_GAP_SECS", defaults.compressed_gap),
            face_sample_interval: env_parse(
                "PODCLIP_FACE_SAMPLE_SECS",
                defaults.face_sample_interval,
            ),
            time_adjust: env_parse("PODCLIP_TIME_ADJUST", defaults.time_adjust),
            max_words_per_cue: None,
            max_cue_secs: env_parse("PODCLIP_MAX_CUE_SECS", defaults.max_cue_secs),
            encode_timeout_secs: env_parse(
                "PODCLIP_ENCODE_TIMEOUT_SECS",
                defaults.encode_timeout_secs,
            ),
        }
    }

    /// Builder-style setter for the output directory.
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    /// Builder-style setter for the loudness target.
    pub fn with_target_lufs(mut self, lufs: f64) -> Self {
        self.target_lufs = lufs;
        self
    }

    /// Builder-style setter for the caption timing offset.
    pub fn with_time_adjust(mut self, secs: f64) -> Self {
        self.time_adjust = secs;
        self
    }

    /// Builder-style setter for the maximum clip duration.
    pub fn with_max_clip_secs(mut self, secs: f64) -> Self {
        self.max_clip_secs = secs;
        self
    }

    /// Whether a word (lowercased, punctuation-stripped) is in the
    /// filler lexicon.
    pub fn is_filler(&self, bare_word: &str) -> bool {
        self.filler_words.iter().any(|f| f == bare_word)
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RenderConfig::default();
        assert!((config.target_lufs - -14.0).abs() < f64::EPSILON);
        assert!((config.max_clip_secs - 180.0).abs() < f64::EPSILON);
        assert!(config.is_filler("um"));
        assert!(config.is_filler("mhm"));
        assert!(!config.is_filler("maybe"));
    }

    #[test]
    fn test_builder_setters() {
        let config = RenderConfig::default()
            .with_target_lufs(-16.0)
            .with_max_clip_secs(60.0)
            .with_time_adjust(-1.0);
        assert!((config.target_lufs - -16.0).abs() < f64::EPSILON);
        assert!((config.max_clip_secs - 60.0).abs() < f64::EPSILON);
        assert!((config.time_adjust - -1.0).abs() < f64::EPSILON);
    }
}
