//! Crop windows in source-pixel coordinates.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::AspectRatio;

/// A rectangular region of the source frame selected for output framing.
///
/// Coordinates are source pixels. Width and height are kept even because
/// most H.264 encoders reject odd dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct CropWindow {
    /// X of the top-left corner
    pub x: u32,
    /// Y of the top-left corner
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl CropWindow {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Largest window of the given aspect ratio that fits the source,
    /// horizontally centered at `center_x` and clamped to the frame.
    pub fn centered_at(
        center_x: u32,
        source_width: u32,
        source_height: u32,
        aspect: AspectRatio,
    ) -> Self {
        let height = even(source_height);
        let width = even(
            ((height as f64 * aspect.as_f64()).round() as u32).min(source_width),
        );
        let half = width / 2;
        let x = center_x
            .saturating_sub(half)
            .min(source_width.saturating_sub(width));
        Self::new(even(x), 0, width, height)
    }

    /// Whether the window lies fully within a source frame of the given size.
    pub fn fits(&self, source_width: u32, source_height: u32) -> bool {
        self.width > 0
            && self.height > 0
            && self.x + self.width <= source_width
            && self.y + self.height <= source_height
    }

    /// Aspect ratio of the window as a decimal.
    pub fn aspect(&self) -> f64 {
        self.width as f64 / self.height as f64
    }
}

/// Round down to the nearest even value.
fn even(v: u32) -> u32 {
    v & !1
}

/// A crop window pinned to a point in time, for tracked (face) plans.
///
/// A tracked plan is a sorted list of these; the renderer expresses the
/// motion between consecutive keyframes as linear interpolation inside
/// the transcoder's time-varying crop expression.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CropKeyframe {
    /// Time in seconds, relative to the clip start
    pub time: f64,
    pub window: CropWindow,
}

impl CropKeyframe {
    pub fn new(time: f64, window: CropWindow) -> Self {
        Self { time, window }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_centered_window_is_portrait_and_even() {
        let w = CropWindow::centered_at(960, 1920, 1080, AspectRatio::PORTRAIT);
        assert_eq!(w.height, 1080);
        assert_eq!(w.width % 2, 0);
        assert!((w.aspect() - 0.5625).abs() < 0.01);
        assert!(w.fits(1920, 1080));
    }

    #[test]
    fn test_centered_window_clamps_left_edge() {
        let w = CropWindow::centered_at(0, 1920, 1080, AspectRatio::PORTRAIT);
        assert_eq!(w.x, 0);
        assert!(w.fits(1920, 1080));
    }

    #[test]
    fn test_centered_window_clamps_right_edge() {
        let w = CropWindow::centered_at(1920, 1920, 1080, AspectRatio::PORTRAIT);
        assert!(w.fits(1920, 1080));
        assert!(w.x + w.width <= 1920);
    }

    #[test]
    fn test_narrow_source_caps_width() {
        // Source narrower than 9:16 at its height: width capped to source
        let w = CropWindow::centered_at(320, 640, 1280, AspectRatio::PORTRAIT);
        assert!(w.width <= 640);
        assert!(w.fits(640, 1280));
    }
}
