//! Face locating for the tracked crop strategy.
//!
//! The pipeline only needs a horizontal center per sampled frame, so
//! the detector is a narrow trait. The default implementation scores
//! skin-probability mass over decoded RGB frames; a model-backed
//! detector (ONNX, OpenCV) can slot in behind the same trait without
//! touching the planner.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::error::{RenderError, RenderResult};

/// Width frames are downscaled to before detection.
const SAMPLE_FRAME_WIDTH: u32 = 320;

/// One face observation in a sampled frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FaceObservation {
    /// Horizontal center of the detected face mass, normalized 0.0-1.0
    pub center_x: f64,
    /// Fraction of frame pixels attributed to the face region
    pub coverage: f64,
}

/// Locates the dominant face in a single frame image.
#[async_trait]
pub trait FaceLocator: Send + Sync {
    /// Returns `None` when no face is found in the frame; errors mean
    /// the detector itself is unusable (callers degrade to center crop).
    async fn locate(&self, frame_path: &Path) -> RenderResult<Option<FaceObservation>>;
}

/// Default detector: skin-probability mass clustering.
///
/// Classifies pixels with a conservative RGB skin rule, then picks the
/// densest horizontal band (a quarter of the frame width) and returns
/// its weighted center. Crude next to a DNN, but it needs no model
/// assets and tracks a single talking head well enough for framing.
#[derive(Debug, Clone)]
pub struct SkinMassLocator {
    /// Minimum fraction of frame pixels that must classify as skin
    /// before a detection is reported.
    min_coverage: f64,
}

impl Default for SkinMassLocator {
    fn default() -> Self {
        Self { min_coverage: 0.01 }
    }
}

impl SkinMassLocator {
    pub fn new(min_coverage: f64) -> Self {
        Self {
            min_coverage: min_coverage.clamp(0.0, 1.0),
        }
    }
}

#[async_trait]
impl FaceLocator for SkinMassLocator {
    async fn locate(&self, frame_path: &Path) -> RenderResult<Option<FaceObservation>> {
        let path = frame_path.to_path_buf();
        let min_coverage = self.min_coverage;

        // Image decode and the pixel pass are CPU-bound
        let observation = tokio::task::spawn_blocking(move || -> RenderResult<_> {
            let img = image::open(&path)
                .map_err(|e| RenderError::FaceDetectionUnavailable(e.to_string()))?
                .to_rgb8();
            Ok(locate_skin_mass(&img, min_coverage))
        })
        .await
        .map_err(|e| RenderError::FaceDetectionUnavailable(e.to_string()))??;

        Ok(observation)
    }
}

/// Column-histogram clustering over skin-classified pixels.
fn locate_skin_mass(
    img: &image::RgbImage,
    min_coverage: f64,
) -> Option<FaceObservation> {
    let (width, height) = img.dimensions();
    if width == 0 || height == 0 {
        return None;
    }

    let mut column_counts = vec![0u32; width as usize];
    let mut total_skin = 0u64;

    for (x, _, pixel) in img.enumerate_pixels() {
        if is_skin_tone(pixel.0[0], pixel.0[1], pixel.0[2]) {
            column_counts[x as usize] += 1;
            total_skin += 1;
        }
    }

    let coverage = total_skin as f64 / (width as f64 * height as f64);
    if coverage < min_coverage {
        return None;
    }

    // Densest band a quarter of the frame wide, weighted center inside it.
    let band = (width as usize / 4).max(1);
    let mut best_start = 0;
    let mut best_sum: u64 = column_counts[..band].iter().map(|&c| c as u64).sum();
    let mut sum = best_sum;
    for start in 1..=(width as usize - band) {
        sum = sum - column_counts[start - 1] as u64 + column_counts[start + band - 1] as u64;
        if sum > best_sum {
            best_sum = sum;
            best_start = start;
        }
    }
    if best_sum == 0 {
        return None;
    }

    let mut weighted = 0.0;
    for (i, &count) in column_counts[best_start..best_start + band].iter().enumerate() {
        weighted += (best_start + i) as f64 * count as f64;
    }
    let center_x = (weighted / best_sum as f64) / width as f64;

    Some(FaceObservation { center_x, coverage })
}

/// Classic RGB skin classifier (Kovac rule).
fn is_skin_tone(r: u8, g: u8, b: u8) -> bool {
    let (rf, gf, bf) = (r as i32, g as i32, b as i32);
    rf > 95
        && gf > 40
        && bf > 20
        && rf - gf > 15
        && rf > bf
        && (rf.max(gf).max(bf) - rf.min(gf).min(bf)) > 15
}

/// Extract detection sample frames across `[start, start+duration)` at
/// a fixed interval. Returns clip-relative `(time, frame_path)` pairs.
pub async fn sample_frames(
    source: impl AsRef<Path>,
    start: f64,
    duration: f64,
    interval: f64,
    work_dir: impl AsRef<Path>,
) -> RenderResult<Vec<(f64, PathBuf)>> {
    let source = source.as_ref();
    let work_dir = work_dir.as_ref();
    let interval = interval.max(0.1);

    which::which("ffmpeg").map_err(|_| RenderError::FfmpegNotFound)?;

    let pattern = work_dir.join("face_%04d.png");
    let status = Command::new("ffmpeg")
        .args([
            "-v",
            "error",
            "-ss",
            &format!("{:.3}", start.max(0.0)),
            "-t",
            &format!("{:.3}", duration.max(0.0)),
            "-i",
        ])
        .arg(source)
        .args([
            "-vf",
            &format!("fps=1/{:.3},scale={}:-2", interval, SAMPLE_FRAME_WIDTH),
            "-y",
        ])
        .arg(&pattern)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await?;

    if !status.success() {
        return Err(RenderError::FaceDetectionUnavailable(format!(
            "frame sampling failed with code {:?}",
            status.code()
        )));
    }

    let mut frames = Vec::new();
    let mut index = 1u32;
    loop {
        let path = work_dir.join(format!("face_{:04}.png", index));
        if !path.exists() {
            break;
        }
        frames.push(((index - 1) as f64 * interval, path));
        index += 1;
    }

    debug!(count = frames.len(), interval, "Sampled detection frames");
    Ok(frames)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn skin() -> Rgb<u8> {
        Rgb([200, 150, 120])
    }

    fn background() -> Rgb<u8> {
        Rgb([30, 60, 30])
    }

    fn frame_with_face_at(cx_frac: f64) -> RgbImage {
        let mut img = RgbImage::from_pixel(320, 180, background());
        let cx = (cx_frac * 320.0) as i64;
        for y in 40..140 {
            for x in (cx - 30).max(0)..(cx + 30).min(320) {
                img.put_pixel(x as u32, y, skin());
            }
        }
        img
    }

    #[test]
    fn test_skin_rule() {
        assert!(is_skin_tone(200, 150, 120));
        assert!(!is_skin_tone(30, 60, 30));
        assert!(!is_skin_tone(255, 255, 255));
    }

    #[test]
    fn test_locates_left_face() {
        let img = frame_with_face_at(0.25);
        let obs = locate_skin_mass(&img, 0.01).unwrap();
        assert!((obs.center_x - 0.25).abs() < 0.1, "center_x={}", obs.center_x);
    }

    #[test]
    fn test_locates_right_face() {
        let img = frame_with_face_at(0.75);
        let obs = locate_skin_mass(&img, 0.01).unwrap();
        assert!((obs.center_x - 0.75).abs() < 0.1);
    }

    #[test]
    fn test_empty_frame_yields_none() {
        let img = RgbImage::from_pixel(320, 180, background());
        assert!(locate_skin_mass(&img, 0.01).is_none());
    }

    #[test]
    fn test_dominant_face_wins() {
        // Big face left, small patch right: band clustering should
        // lock onto the bigger mass.
        let mut img = frame_with_face_at(0.25);
        for y in 80..95 {
            for x in 280..300 {
                img.put_pixel(x, y, skin());
            }
        }
        let obs = locate_skin_mass(&img, 0.01).unwrap();
        assert!(obs.center_x < 0.5);
    }
}
