//! Crop planning for the 9:16 reframe.
//!
//! `center` produces one static window. `face` samples the clip at a
//! fixed interval, locates a face per sample, and produces keyframed
//! window motion that the transcoder evaluates as a single
//! time-parameterized crop expression. Expressing the motion as
//! interpolation inside one encode is the correctness-critical piece:
//! cutting the clip into per-window sub-encodes shows visible frame
//! jumps at every boundary.

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, warn};

use podclip_models::{AspectRatio, CropKeyframe, CropWindow};

use crate::error::{RenderError, RenderResult};
use crate::face::{sample_frames, FaceLocator, SkinMassLocator};

/// A planned reframe for one clip.
#[derive(Debug, Clone, PartialEq)]
pub enum CropPlan {
    /// One static crop window
    Static(CropWindow),
    /// Source is narrower than 9:16; scale to fit and pad instead of
    /// cropping
    Letterbox,
    /// Keyframed window motion, sorted by time
    Tracked(Vec<CropKeyframe>),
}

/// Outcome of planning: the plan plus an optional non-fatal warning
/// (face tracking degraded to center).
#[derive(Debug, Clone)]
pub struct PlannedCrop {
    pub plan: CropPlan,
    pub warning: Option<String>,
}

impl PlannedCrop {
    fn clean(plan: CropPlan) -> Self {
        Self {
            plan,
            warning: None,
        }
    }

    fn degraded(plan: CropPlan, warning: String) -> Self {
        Self {
            plan,
            warning: Some(warning),
        }
    }
}

/// Plans crop windows for a source geometry and strategy.
pub struct CropPlanner {
    locator: Arc<dyn FaceLocator>,
    sample_interval: f64,
}

impl CropPlanner {
    /// Planner with the default skin-mass locator.
    pub fn new(sample_interval: f64) -> Self {
        Self {
            locator: Arc::new(SkinMassLocator::default()),
            sample_interval,
        }
    }

    /// Planner with a custom face locator.
    pub fn with_locator(locator: Arc<dyn FaceLocator>, sample_interval: f64) -> Self {
        Self {
            locator,
            sample_interval,
        }
    }

    /// Static center plan. Pure; never fails.
    pub fn plan_center(source_width: u32, source_height: u32) -> CropPlan {
        let source_ratio = source_width as f64 / source_height as f64;
        if source_ratio < AspectRatio::PORTRAIT.as_f64() {
            // Already narrower than portrait: pad, don't crop
            return CropPlan::Letterbox;
        }
        CropPlan::Static(CropWindow::centered_at(
            source_width / 2,
            source_width,
            source_height,
            AspectRatio::PORTRAIT,
        ))
    }

    /// Face-tracking plan over `[start, start+duration)` of `source`.
    ///
    /// Detection failures are cosmetic: any locator error degrades to
    /// the center plan with a warning, never an error.
    pub async fn plan_face(
        &self,
        source: &Path,
        start: f64,
        duration: f64,
        source_width: u32,
        source_height: u32,
        work_dir: &Path,
    ) -> PlannedCrop {
        let center = Self::plan_center(source_width, source_height);
        if center == CropPlan::Letterbox {
            // Nothing to track horizontally in a padded frame
            return PlannedCrop::clean(center);
        }

        match self
            .track(source, start, duration, source_width, source_height, work_dir)
            .await
        {
            Ok(Some(plan)) => PlannedCrop::clean(plan),
            Ok(None) => {
                debug!("No faces detected in any sample, using center crop");
                PlannedCrop::clean(center)
            }
            Err(e) => {
                warn!("Face detection unavailable, using center crop: {}", e);
                PlannedCrop::degraded(center, format!("face tracking degraded to center: {}", e))
            }
        }
    }

    async fn track(
        &self,
        source: &Path,
        start: f64,
        duration: f64,
        source_width: u32,
        source_height: u32,
        work_dir: &Path,
    ) -> RenderResult<Option<CropPlan>> {
        let frames = sample_frames(source, start, duration, self.sample_interval, work_dir).await?;
        if frames.is_empty() {
            return Err(RenderError::FaceDetectionUnavailable(
                "no frames could be sampled".to_string(),
            ));
        }

        let mut observations = Vec::with_capacity(frames.len());
        for (time, path) in &frames {
            observations.push((*time, self.locator.locate(path).await?));
        }

        Ok(keyframes_from_observations(
            &observations,
            source_width,
            source_height,
        ))
    }
}

/// Convert per-sample observations to a crop plan.
///
/// A sample with no detection keeps the previous window; leading
/// misses are backfilled from the first detection so the clip never
/// opens with a snap. All-miss input yields `None` (caller falls back
/// to center).
fn keyframes_from_observations(
    observations: &[(f64, Option<crate::face::FaceObservation>)],
    source_width: u32,
    source_height: u32,
) -> Option<CropPlan> {
    let first_window = observations
        .iter()
        .find_map(|(_, obs)| obs.map(|o| window_for_center(o.center_x, source_width, source_height)))?;

    let mut keyframes: Vec<CropKeyframe> = Vec::with_capacity(observations.len());
    let mut current = first_window;
    for (time, obs) in observations {
        if let Some(o) = obs {
            current = window_for_center(o.center_x, source_width, source_height);
        }
        // Skip redundant keyframes; interpolation between equal
        // windows is a no-op anyway
        if keyframes.last().map(|k| k.window) != Some(current) {
            keyframes.push(CropKeyframe::new(*time, current));
        }
    }

    if keyframes.len() <= 1 {
        return Some(CropPlan::Static(first_window));
    }
    Some(CropPlan::Tracked(keyframes))
}

fn window_for_center(center_x_norm: f64, source_width: u32, source_height: u32) -> CropWindow {
    let center_px = (center_x_norm.clamp(0.0, 1.0) * source_width as f64).round() as u32;
    CropWindow::centered_at(center_px, source_width, source_height, AspectRatio::PORTRAIT)
}

/// The window at time `t` under linear interpolation between
/// keyframes. Clamps outside the keyframe range.
pub fn window_at(keyframes: &[CropKeyframe], t: f64) -> Option<CropWindow> {
    let first = keyframes.first()?;
    let last = keyframes.last()?;
    if t <= first.time {
        return Some(first.window);
    }
    if t >= last.time {
        return Some(last.window);
    }

    for pair in keyframes.windows(2) {
        let (a, b) = (&pair[0], &pair[1]);
        if t >= a.time && t < b.time {
            let span = b.time - a.time;
            if span <= f64::EPSILON {
                return Some(b.window);
            }
            let frac = (t - a.time) / span;
            let lerp = |from: u32, to: u32| -> u32 {
                (from as f64 + (to as f64 - from as f64) * frac).round() as u32
            };
            return Some(CropWindow::new(
                lerp(a.window.x, b.window.x),
                lerp(a.window.y, b.window.y),
                a.window.width,
                a.window.height,
            ));
        }
    }
    Some(last.window)
}

/// Build the transcoder's time-varying crop-x expression: piecewise
/// linear between keyframes, clamped to the first/last window outside
/// the keyframe range.
pub fn crop_x_expression(keyframes: &[CropKeyframe]) -> String {
    match keyframes {
        [] => "0".to_string(),
        [only] => only.window.x.to_string(),
        [first, .., last] => {
            let mut expr = last.window.x.to_string();
            // Fold backwards so the expression reads left-to-right in time
            for pair in keyframes.windows(2).rev() {
                let (a, b) = (&pair[0], &pair[1]);
                let span = b.time - a.time;
                let segment = if span <= f64::EPSILON {
                    b.window.x.to_string()
                } else {
                    format!(
                        "{}+({}-{})*(t-{:.3})/{:.3}",
                        a.window.x, b.window.x as i64, a.window.x as i64, a.time, span
                    )
                };
                expr = format!("if(lt(t,{:.3}),{},{})", b.time, segment, expr);
            }
            format!("if(lt(t,{:.3}),{},{})", first.time, first.window.x, expr)
        }
    }
}
