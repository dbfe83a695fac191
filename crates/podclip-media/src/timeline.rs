//! Encode-timeline compression for silence left by filler cleanup.
//!
//! Filler words are stripped from caption text without shifting any
//! word's timing; when that leaves a dead-air gap above the configured
//! threshold, the encode timeline itself is shortened by dropping the
//! excess from both streams. Captions are then remapped onto the
//! compressed clock so they stay in sync. This is the one place
//! filler cleanup affects more than text.

use tracing::debug;

use podclip_models::WordTimestamp;

/// A plan for compressing the encode timeline of one clip.
///
/// `keeps` are clip-relative `(start, end)` spans that survive, in
/// order, covering the clip from 0 to its duration minus the cuts.
#[derive(Debug, Clone, PartialEq)]
pub struct TimelinePlan {
    keeps: Vec<(f64, f64)>,
    source_duration: f64,
}

impl TimelinePlan {
    /// Scan interior gaps between consecutive displayed words and plan
    /// cuts for gaps above `gap_threshold`, each shrunk to
    /// `compressed_gap`. Returns `None` when nothing crosses the
    /// threshold (the common case: timeline untouched).
    pub fn from_word_gaps(
        words: &[WordTimestamp],
        source_duration: f64,
        gap_threshold: f64,
        compressed_gap: f64,
    ) -> Option<Self> {
        let compressed_gap = compressed_gap.clamp(0.0, gap_threshold);
        let mut cuts: Vec<(f64, f64)> = Vec::new();

        for pair in words.windows(2) {
            let gap_start = pair[0].end;
            let gap_end = pair[1].start;
            if gap_end - gap_start > gap_threshold {
                // Keep a beat of the pause, cut the rest
                cuts.push((gap_start + compressed_gap, gap_end));
            }
        }

        if cuts.is_empty() {
            return None;
        }

        let mut keeps = Vec::with_capacity(cuts.len() + 1);
        let mut cursor = 0.0;
        for (cut_start, cut_end) in &cuts {
            keeps.push((cursor, *cut_start));
            cursor = *cut_end;
        }
        keeps.push((cursor, source_duration));

        let plan = Self {
            keeps,
            source_duration,
        };
        debug!(
            cuts = cuts.len(),
            removed_secs = format!("{:.2}", plan.removed()),
            "Planned timeline compression"
        );
        Some(plan)
    }

    /// Total seconds removed from the timeline.
    pub fn removed(&self) -> f64 {
        self.source_duration - self.compressed_duration()
    }

    /// Duration of the compressed timeline.
    pub fn compressed_duration(&self) -> f64 {
        self.keeps.iter().map(|(s, e)| (e - s).max(0.0)).sum()
    }

    /// Map a clip-relative source time onto the compressed timeline.
    /// Times inside a cut collapse to the cut point.
    pub fn map_time(&self, t: f64) -> f64 {
        let mut acc = 0.0;
        for &(start, end) in &self.keeps {
            if t >= end {
                acc += end - start;
            } else {
                if t > start {
                    acc += t - start;
                }
                break;
            }
        }
        acc
    }

    /// Remap a word list onto the compressed timeline.
    pub fn remap_words(&self, words: &[WordTimestamp]) -> Vec<WordTimestamp> {
        words
            .iter()
            .map(|w| {
                let mut w = w.clone();
                w.start = self.map_time(w.start);
                w.end = self.map_time(w.end);
                w
            })
            .collect()
    }

    /// Keep-segment expression shared by the select/aselect filters.
    fn keep_expr(&self) -> String {
        self.keeps
            .iter()
            .map(|(s, e)| format!("between(t,{:.3},{:.3})", s.max(0.0), e))
            .collect::<Vec<_>>()
            .join("+")
    }

    /// Video-side compression filter chain.
    pub fn video_filter(&self) -> String {
        format!("select='{}',setpts=N/FRAME_RATE/TB", self.keep_expr())
    }

    /// Audio-side compression filter chain.
    pub fn audio_filter(&self) -> String {
        format!("aselect='{}',asetpts=N/SR/TB", self.keep_expr())
    }
}
