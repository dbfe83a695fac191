//! Audio energy analysis for clip scoring.
//!
//! Computes short-window RMS energy over arbitrary time segments of a
//! source file. The scores let an external ranking step compare
//! candidate clips by "energy" without touching raw samples. A segment
//! with no decodable audio scores zero instead of failing the batch.

use std::path::Path;
use std::process::Stdio;

use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::{RenderError, RenderResult};

/// Decode sample rate for analysis. Energy comparison does not need
/// full fidelity.
const ANALYSIS_SAMPLE_RATE: u32 = 16_000;

/// Default RMS window length in milliseconds.
const DEFAULT_WINDOW_MS: u64 = 100;

/// Energy summary for one analyzed segment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentEnergy {
    pub start: f64,
    pub end: f64,
    /// Mean of the per-window RMS values (linear amplitude, 0.0-1.0)
    pub mean_energy: f64,
    /// Loudest single window
    pub peak_energy: f64,
}

/// Computes RMS energy profiles over segments of a source file.
#[derive(Debug, Clone)]
pub struct AudioEnergyAnalyzer {
    window_ms: u64,
}

impl Default for AudioEnergyAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioEnergyAnalyzer {
    pub fn new() -> Self {
        Self {
            window_ms: DEFAULT_WINDOW_MS,
        }
    }

    /// Override the RMS window length.
    pub fn with_window_ms(mut self, window_ms: u64) -> Self {
        self.window_ms = window_ms.max(1);
        self
    }

    /// Analyze the given `(start, end)` segments of `source`.
    ///
    /// Returns one entry per segment in input order. Segments that
    /// cannot be decoded (silence-only, decode error, out of range)
    /// come back with zero energy rather than an error.
    pub async fn analyze(
        &self,
        source: impl AsRef<Path>,
        segments: &[(f64, f64)],
    ) -> RenderResult<Vec<SegmentEnergy>> {
        let source = source.as_ref();
        which::which("ffmpeg").map_err(|_| RenderError::FfmpegNotFound)?;

        let samples_per_window =
            ((ANALYSIS_SAMPLE_RATE as u64 * self.window_ms) / 1000).max(1) as usize;

        let mut results = Vec::with_capacity(segments.len());
        for &(start, end) in segments {
            let samples = match self.decode_segment(source, start, end).await {
                Ok(samples) => samples,
                Err(e) => {
                    warn!(
                        start,
                        end,
                        "Audio decode failed for segment, scoring zero: {}",
                        e
                    );
                    Vec::new()
                }
            };

            let windows = rms_windows(&samples, samples_per_window);
            let (mean, peak) = reduce_windows(&windows);
            debug!(start, end, windows = windows.len(), mean, peak, "Segment energy");

            results.push(SegmentEnergy {
                start,
                end,
                mean_energy: mean,
                peak_energy: peak,
            });
        }

        Ok(results)
    }

    /// Decode one segment's audio to mono f32 samples via ffmpeg.
    async fn decode_segment(
        &self,
        source: &Path,
        start: f64,
        end: f64,
    ) -> RenderResult<Vec<f32>> {
        let duration = (end - start).max(0.0);

        let output = Command::new("ffmpeg")
            .args([
                "-v",
                "error",
                "-ss",
                &format!("{:.3}", start.max(0.0)),
                "-t",
                &format!("{:.3}", duration),
                "-i",
            ])
            .arg(source)
            .args([
                "-vn",
                "-ar",
                &ANALYSIS_SAMPLE_RATE.to_string(),
                "-ac",
                "1",
                "-f",
                "f32le",
                "pipe:1",
            ])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .output()
            .await?;

        if !output.status.success() {
            return Err(RenderError::encode_failed(
                "audio decode failed",
                None,
                output.status.code(),
            ));
        }

        Ok(output
            .stdout
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect())
    }
}

/// RMS amplitude per fixed-size window. A trailing partial window is
/// dropped; it would skew short-window statistics.
pub fn rms_windows(samples: &[f32], samples_per_window: usize) -> Vec<f64> {
    samples
        .chunks_exact(samples_per_window)
        .map(|window| {
            let sum_sq: f64 = window.iter().map(|&s| (s as f64) * (s as f64)).sum();
            (sum_sq / window.len() as f64).sqrt()
        })
        .collect()
}

fn reduce_windows(windows: &[f64]) -> (f64, f64) {
    if windows.is_empty() {
        return (0.0, 0.0);
    }
    let mean = windows.iter().sum::<f64>() / windows.len() as f64;
    let peak = windows.iter().cloned().fold(0.0, f64::max);
    (mean, peak)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rms_of_constant_signal() {
        let samples = vec![0.5_f32; 1600];
        let windows = rms_windows(&samples, 160);
        assert_eq!(windows.len(), 10);
        for w in windows {
            assert!((w - 0.5).abs() < 1e-6);
        }
    }

    #[test]
    fn test_rms_of_silence_is_zero() {
        let samples = vec![0.0_f32; 3200];
        let windows = rms_windows(&samples, 1600);
        let (mean, peak) = reduce_windows(&windows);
        assert_eq!(mean, 0.0);
        assert_eq!(peak, 0.0);
    }

    #[test]
    fn test_partial_window_dropped() {
        let samples = vec![1.0_f32; 150];
        assert!(rms_windows(&samples, 160).is_empty());
    }

    #[test]
    fn test_empty_reduces_to_zero() {
        let (mean, peak) = reduce_windows(&[]);
        assert_eq!(mean, 0.0);
        assert_eq!(peak, 0.0);
    }

    #[test]
    fn test_peak_exceeds_mean_for_burst() {
        // Quiet signal with one loud window
        let mut samples = vec![0.1_f32; 1600];
        samples.extend(vec![0.9_f32; 160]);
        let windows = rms_windows(&samples, 160);
        let (mean, peak) = reduce_windows(&windows);
        assert!(peak > mean);
        assert!((peak - 0.9).abs() < 1e-6);
    }
}
