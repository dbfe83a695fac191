//! Caption rendering: word timestamps + style -> burn-in subtitle track.
//!
//! Words are sliced to the clip window, re-based to clip-relative
//! time, optionally stripped of filler tokens (display only, never
//! timing), grouped into cues, and rendered to an ASS document plus
//! the overlay metadata the encoder stage composites with.

pub mod ass;
pub mod style;

use serde::{Deserialize, Serialize};
use tracing::debug;

use podclip_models::{CaptionStyle, WordTimestamp};

use crate::config::RenderConfig;
use crate::error::{RenderError, RenderResult};

/// One visual "page" of caption text.
///
/// `words` is always a contiguous, order-preserving slice of the
/// clip's displayed words, in clip-relative time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptionCue {
    pub text: String,
    pub words: Vec<WordTimestamp>,
    pub start: f64,
    pub end: f64,
}

/// A complete burn-in subtitle track description.
///
/// The document is handed to the transcoder as an `ass` filter input;
/// it is never muxed as a soft subtitle stream (target platforms do
/// not reliably render those).
#[derive(Debug, Clone)]
pub struct SubtitleTrack {
    /// Full ASS document text
    pub ass_document: String,
    pub cues: Vec<CaptionCue>,
    /// Gradient band must be composited under the text layer
    pub needs_gradient: bool,
    pub gradient_opacity: f64,
    /// Style supports a logo overlay
    pub supports_logo: bool,
    pub logo_height: u32,
    pub logo_margin_x: u32,
    pub logo_margin_y: u32,
    /// Clip-relative displayed words, for silence-gap scanning
    pub displayed_words: Vec<WordTimestamp>,
}

/// Builds subtitle tracks from transcripts.
pub struct CaptionRenderer<'a> {
    config: &'a RenderConfig,
}

impl<'a> CaptionRenderer<'a> {
    pub fn new(config: &'a RenderConfig) -> Self {
        Self { config }
    }

    /// Render the subtitle track for a clip window.
    ///
    /// Fails with `EmptyTranscript` when no words survive slicing (or
    /// filler cleanup); callers treat that as "render without
    /// captions", not as a clip failure.
    pub fn render(
        &self,
        words: &[WordTimestamp],
        style: CaptionStyle,
        clip_start: f64,
        clip_end: f64,
        clean_fillers: bool,
    ) -> RenderResult<SubtitleTrack> {
        let clip_words = self.rebase_words(words, clip_start, clip_end);
        if clip_words.is_empty() {
            return Err(RenderError::EmptyTranscript);
        }

        // Fillers lose their text but keep their span: nothing shifts,
        // lip sync is preserved. Gap compression is a separate,
        // encode-timeline concern (see timeline module).
        let displayed: Vec<WordTimestamp> = if clean_fillers {
            clip_words
                .into_iter()
                .filter(|w| !self.config.is_filler(&w.bare()))
                .collect()
        } else {
            clip_words
        };
        if displayed.is_empty() {
            return Err(RenderError::EmptyTranscript);
        }

        self.render_clip_relative(displayed, style)
    }

    /// Render a track from words that are already clip-relative and
    /// cleaned. Used directly when the encode timeline was compressed
    /// and cue times have been remapped.
    pub fn render_clip_relative(
        &self,
        displayed: Vec<WordTimestamp>,
        style: CaptionStyle,
    ) -> RenderResult<SubtitleTrack> {
        if displayed.is_empty() {
            return Err(RenderError::EmptyTranscript);
        }

        let preset = style::preset(style);
        let max_words = self
            .config
            .max_words_per_cue
            .unwrap_or(preset.words_per_cue)
            .max(1);
        let cues = group_cues(&displayed, max_words, self.config.max_cue_secs, preset.uppercase);
        debug!(
            style = %style,
            words = displayed.len(),
            cues = cues.len(),
            "Built caption cues"
        );

        let ass_document = ass::render_document(&cues, preset);

        Ok(SubtitleTrack {
            ass_document,
            cues,
            needs_gradient: preset.gradient_overlay,
            gradient_opacity: preset.gradient_opacity,
            supports_logo: preset.logo_support,
            logo_height: preset.logo_height,
            logo_margin_x: preset.logo_margin_x,
            logo_margin_y: preset.logo_margin_y,
            displayed_words: displayed,
        })
    }

    /// Apply the global timing offset, slice to the clip window
    /// (overlap, not containment), and shift to clip-relative time.
    fn rebase_words(
        &self,
        words: &[WordTimestamp],
        clip_start: f64,
        clip_end: f64,
    ) -> Vec<WordTimestamp> {
        words
            .iter()
            .map(|w| {
                let mut w = w.clone();
                w.start += self.config.time_adjust;
                w.end += self.config.time_adjust;
                w
            })
            .filter(|w| w.overlaps(clip_start, clip_end))
            .map(|mut w| {
                w.start -= clip_start;
                w.end -= clip_start;
                w
            })
            .collect()
    }
}

/// Group displayed words into cues.
///
/// A new cue starts when the word-count cap or the duration ceiling
/// would be exceeded, or when the speaker changes. Words are never
/// reordered and every cue is a contiguous run.
fn group_cues(
    words: &[WordTimestamp],
    max_words: usize,
    max_secs: f64,
    uppercase: bool,
) -> Vec<CaptionCue> {
    let mut cues = Vec::new();
    let mut current: Vec<WordTimestamp> = Vec::new();

    for word in words {
        let speaker_changed = current
            .last()
            .map(|prev| prev.speaker != word.speaker)
            .unwrap_or(false);
        let over_count = current.len() >= max_words;
        let over_duration = current
            .first()
            .map(|first| word.end - first.start > max_secs)
            .unwrap_or(false);

        if !current.is_empty() && (over_count || over_duration || speaker_changed) {
            cues.push(make_cue(std::mem::take(&mut current), uppercase));
        }
        current.push(word.clone());
    }
    if !current.is_empty() {
        cues.push(make_cue(current, uppercase));
    }
    cues
}

fn make_cue(words: Vec<WordTimestamp>, uppercase: bool) -> CaptionCue {
    let text = words
        .iter()
        .map(|w| {
            if uppercase {
                w.word.to_uppercase()
            } else {
                w.word.clone()
            }
        })
        .collect::<Vec<_>>()
        .join(" ");
    CaptionCue {
        text,
        start: words.first().map(|w| w.start.max(0.0)).unwrap_or(0.0),
        end: words.last().map(|w| w.end).unwrap_or(0.0),
        words,
    }
}
