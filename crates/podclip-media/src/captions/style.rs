//! Caption style presets.
//!
//! The four styles share one renderer; everything that differs between
//! them is data in this table. ASS colors are `&HAABBGGRR` (blue-green-
//! red order, not RGB).

use podclip_models::CaptionStyle;

/// How the active word is revealed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reveal {
    /// Full chunk visible, active word in a filled box
    BoxedWord,
    /// Short rolling window, active word colored with a pop scale-in
    PopWord,
    /// Full sentence, instant two-color split at each word boundary
    KaraokeSplit,
    /// No highlighting
    Plain,
}

/// All knobs one caption style needs.
#[derive(Debug, Clone)]
pub struct StylePreset {
    pub font_name: &'static str,
    pub font_size: u32,
    /// Base text color
    pub primary_color: &'static str,
    /// Highlight color, when the style highlights
    pub active_color: Option<&'static str>,
    pub outline_color: &'static str,
    pub back_color: &'static str,
    pub bold: bool,
    pub outline_width: u32,
    pub shadow_depth: u32,
    /// ASS alignment (2 = bottom center)
    pub alignment: u32,
    pub margin_v: u32,
    pub margin_h: u32,
    /// Words per display chunk
    pub words_per_cue: usize,
    pub uppercase: bool,
    pub reveal: Reveal,
    /// Box fill behind the active word (branded)
    pub active_box_color: Option<&'static str>,
    /// Alpha-gradient band behind the caption region
    pub gradient_overlay: bool,
    pub gradient_opacity: f64,
    /// Logo compositing supported
    pub logo_support: bool,
    pub logo_height: u32,
    pub logo_margin_x: u32,
    pub logo_margin_y: u32,
}

const WHITE: &str = "&H00FFFFFF";
const BLACK: &str = "&H00000000";
const SHADOW: &str = "&H80000000";

static BRANDED: StylePreset = StylePreset {
    font_name: "Arial",
    font_size: 90,
    primary_color: WHITE,
    active_color: Some(WHITE),
    outline_color: BLACK,
    back_color: BLACK,
    bold: true,
    // Gradient band provides contrast, so no outline or shadow
    outline_width: 0,
    shadow_depth: 0,
    alignment: 2,
    margin_v: 360,
    margin_h: 80,
    words_per_cue: 7,
    uppercase: false,
    reveal: Reveal::BoxedWord,
    active_box_color: Some("&H00181818"),
    gradient_overlay: true,
    gradient_opacity: 0.7,
    logo_support: true,
    logo_height: 80,
    logo_margin_x: 30,
    logo_margin_y: 40,
};

static HORMOZI: StylePreset = StylePreset {
    font_name: "Arial",
    font_size: 80,
    primary_color: WHITE,
    active_color: Some("&H0000FFFF"), // yellow in BGR
    outline_color: BLACK,
    back_color: SHADOW,
    bold: true,
    outline_width: 4,
    shadow_depth: 2,
    alignment: 2,
    margin_v: 180,
    margin_h: 40,
    words_per_cue: 3,
    uppercase: true,
    reveal: Reveal::PopWord,
    active_box_color: None,
    gradient_overlay: false,
    gradient_opacity: 0.0,
    logo_support: false,
    logo_height: 0,
    logo_margin_x: 0,
    logo_margin_y: 0,
};

static KARAOKE: StylePreset = StylePreset {
    font_name: "Arial",
    font_size: 60,
    primary_color: "&H00808080", // gray base, unspoken
    active_color: Some(WHITE),   // spoken
    outline_color: BLACK,
    back_color: SHADOW,
    bold: false,
    outline_width: 3,
    shadow_depth: 1,
    alignment: 2,
    margin_v: 160,
    margin_h: 40,
    words_per_cue: 10,
    uppercase: false,
    reveal: Reveal::KaraokeSplit,
    active_box_color: None,
    gradient_overlay: false,
    gradient_opacity: 0.0,
    logo_support: false,
    logo_height: 0,
    logo_margin_x: 0,
    logo_margin_y: 0,
};

static SUBTLE: StylePreset = StylePreset {
    font_name: "Arial",
    font_size: 52,
    primary_color: WHITE,
    active_color: None,
    outline_color: BLACK,
    back_color: SHADOW,
    bold: false,
    outline_width: 2,
    shadow_depth: 2,
    alignment: 2,
    margin_v: 100,
    margin_h: 40,
    words_per_cue: 7,
    uppercase: false,
    reveal: Reveal::Plain,
    active_box_color: None,
    gradient_overlay: false,
    gradient_opacity: 0.0,
    logo_support: false,
    logo_height: 0,
    logo_margin_x: 0,
    logo_margin_y: 0,
};

/// Look up the preset for a style.
pub fn preset(style: CaptionStyle) -> &'static StylePreset {
    match style {
        CaptionStyle::Branded => &BRANDED,
        CaptionStyle::Hormozi => &HORMOZI,
        CaptionStyle::Karaoke => &KARAOKE,
        CaptionStyle::Subtle => &SUBTLE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_branded_composites() {
        assert!(preset(CaptionStyle::Branded).gradient_overlay);
        assert!(preset(CaptionStyle::Branded).logo_support);
        for style in [CaptionStyle::Hormozi, CaptionStyle::Karaoke, CaptionStyle::Subtle] {
            assert!(!preset(style).gradient_overlay);
            assert!(!preset(style).logo_support);
        }
    }

    #[test]
    fn test_highlight_presence() {
        assert!(preset(CaptionStyle::Subtle).active_color.is_none());
        assert!(preset(CaptionStyle::Karaoke).active_color.is_some());
        assert_eq!(preset(CaptionStyle::Hormozi).reveal, Reveal::PopWord);
    }
}
