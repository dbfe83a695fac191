//! Caption style and crop strategy definitions.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Available caption styles.
///
/// Each style is a named preset over a shared ASS renderer; the
/// differences are data (colors, chunking, box/gradient flags), not
/// behavior, so this stays a plain enum dispatched at render time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum CaptionStyle {
    /// Full sentence with boxed active word, gradient band, optional logo
    Branded,
    /// 2-3 bold uppercase words at a time, active word pops
    Hormozi,
    /// Full sentence, words sweep from base to highlight color as spoken
    Karaoke,
    /// Plain bottom-anchored text, no highlighting
    Subtle,
}

impl CaptionStyle {
    /// All available styles.
    pub const ALL: &'static [CaptionStyle] = &[
        CaptionStyle::Branded,
        CaptionStyle::Hormozi,
        CaptionStyle::Karaoke,
        CaptionStyle::Subtle,
    ];

    /// Returns the style name as used in filenames and the CLI protocol.
    pub fn as_str(&self) -> &'static str {
        match self {
            CaptionStyle::Branded => "branded",
            CaptionStyle::Hormozi => "hormozi",
            CaptionStyle::Karaoke => "karaoke",
            CaptionStyle::Subtle => "subtle",
        }
    }
}

impl Default for CaptionStyle {
    fn default() -> Self {
        CaptionStyle::Hormozi
    }
}

impl fmt::Display for CaptionStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for CaptionStyle {
    type Err = StyleParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "branded" => Ok(CaptionStyle::Branded),
            "hormozi" => Ok(CaptionStyle::Hormozi),
            "karaoke" => Ok(CaptionStyle::Karaoke),
            "subtle" => Ok(CaptionStyle::Subtle),
            _ => Err(StyleParseError(s.to_string())),
        }
    }
}

#[derive(Debug, Error)]
#[error("Unknown caption style: {0}")]
pub struct StyleParseError(String);

/// How the source frame is reframed to 9:16.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum CropStrategy {
    /// Static center crop
    #[default]
    Center,
    /// Face-tracking crop with interpolated window motion
    Face,
}

impl CropStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            CropStrategy::Center => "center",
            CropStrategy::Face => "face",
        }
    }
}

impl fmt::Display for CropStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for CropStrategy {
    type Err = StyleParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "center" => Ok(CropStrategy::Center),
            "face" => Ok(CropStrategy::Face),
            _ => Err(StyleParseError(s.to_string())),
        }
    }
}

/// Aspect ratio specification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct AspectRatio {
    pub width: u32,
    pub height: u32,
}

impl AspectRatio {
    /// Standard portrait (9:16) for TikTok/Reels/Shorts
    pub const PORTRAIT: AspectRatio = AspectRatio {
        width: 9,
        height: 16,
    };

    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Returns the aspect ratio as a decimal (width / height).
    pub fn as_f64(&self) -> f64 {
        self.width as f64 / self.height as f64
    }
}

impl Default for AspectRatio {
    fn default() -> Self {
        Self::PORTRAIT
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.width, self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_style_parse() {
        assert_eq!("branded".parse::<CaptionStyle>().unwrap(), CaptionStyle::Branded);
        assert_eq!("HORMOZI".parse::<CaptionStyle>().unwrap(), CaptionStyle::Hormozi);
        assert!("neon".parse::<CaptionStyle>().is_err());
    }

    #[test]
    fn test_style_display_roundtrip() {
        for style in CaptionStyle::ALL {
            assert_eq!(style.to_string().parse::<CaptionStyle>().unwrap(), *style);
        }
    }

    #[test]
    fn test_crop_strategy_parse() {
        assert_eq!("face".parse::<CropStrategy>().unwrap(), CropStrategy::Face);
        assert_eq!("Center".parse::<CropStrategy>().unwrap(), CropStrategy::Center);
        assert!("tracking".parse::<CropStrategy>().is_err());
    }

    #[test]
    fn test_portrait_ratio() {
        assert!((AspectRatio::PORTRAIT.as_f64() - 0.5625).abs() < 0.0001);
    }
}
