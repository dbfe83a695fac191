//! ASS (Advanced SubStation Alpha) document generation.
//!
//! Produces the burn-in subtitle document from grouped cues. Each
//! style maps to a different event-generation scheme; the shared
//! header carries the style definition the events reference.

use podclip_models::seconds_to_ass;

use super::style::{Reveal, StylePreset};
use super::CaptionCue;
use crate::config::{OUTPUT_HEIGHT, OUTPUT_WIDTH};

/// Generate the full ASS document for a cue list.
pub fn render_document(cues: &[CaptionCue], preset: &StylePreset) -> String {
    let mut doc = header(preset);
    let events = match preset.reveal {
        Reveal::BoxedWord => boxed_word_events(cues, preset),
        Reveal::PopWord => pop_word_events(cues, preset),
        Reveal::KaraokeSplit => karaoke_events(cues, preset),
        Reveal::Plain => plain_events(cues),
    };
    doc.push_str(&events.join("\n"));
    doc.push('\n');
    doc
}

fn header(preset: &StylePreset) -> String {
    let bold = if preset.bold { -1 } else { 0 };
    format!(
        "[Script Info]\n\
         Title: podclip captions\n\
         ScriptType: v4.00+\n\
         PlayResX: {width}\n\
         PlayResY: {height}\n\
         WrapStyle: 0\n\
         ScaledBorderAndShadow: yes\n\
         \n\
         [V4+ Styles]\n\
         Format: Name, Fontname, Fontsize, PrimaryColour, SecondaryColour, OutlineColour, BackColour, Bold, Italic, Underline, StrikeOut, ScaleX, ScaleY, Spacing, Angle, BorderStyle, Outline, Shadow, Alignment, MarginL, MarginR, MarginV, Encoding\n\
         Style: Default,{font},{size},{primary},{secondary},{outline_c},{back},{bold},0,0,0,100,100,0,0,1,{outline_w},{shadow},{align},{mh},{mh},{mv},1\n\
         \n\
         [Events]\n\
         Format: Layer, Start, End, Style, Name, MarginL, MarginR, MarginV, Effect, Text\n",
        width = OUTPUT_WIDTH,
        height = OUTPUT_HEIGHT,
        font = preset.font_name,
        size = preset.font_size,
        primary = preset.primary_color,
        // Karaoke sweeps from secondary to primary; everything else
        // never shows the secondary color
        secondary = preset.active_color.unwrap_or(preset.primary_color),
        outline_c = preset.outline_color,
        back = preset.back_color,
        bold = bold,
        outline_w = preset.outline_width,
        shadow = preset.shadow_depth,
        align = preset.alignment,
        mh = preset.margin_h,
        mv = preset.margin_v,
    )
}

fn dialogue(start: f64, end: f64, text: &str) -> String {
    format!(
        "Dialogue: 0,{},{},Default,,0,0,0,,{}",
        seconds_to_ass(start),
        seconds_to_ass(end),
        text
    )
}

fn display_text(word: &str, uppercase: bool) -> String {
    if uppercase {
        word.to_uppercase()
    } else {
        word.to_string()
    }
}

/// End of the event for word `idx`: held until the next word starts so
/// the cue stays visible across pauses inside it.
fn hold_until(cue: &CaptionCue, idx: usize) -> f64 {
    cue.words
        .get(idx + 1)
        .map(|next| next.start)
        .unwrap_or(cue.end)
        .max(cue.words[idx].end)
}

/// Branded: whole chunk visible, active word gets a dark filled box
/// via border-color overrides.
fn boxed_word_events(cues: &[CaptionCue], preset: &StylePreset) -> Vec<String> {
    let box_color = preset.active_box_color.unwrap_or("&H00181818");
    let mut events = Vec::new();

    for cue in cues {
        for (idx, active) in cue.words.iter().enumerate() {
            let parts: Vec<String> = cue
                .words
                .iter()
                .enumerate()
                .map(|(j, w)| {
                    let text = display_text(&w.word, preset.uppercase);
                    if j == idx {
                        // Thick border painted in the box color reads as
                        // a filled rounded box behind the word
                        format!(
                            "{{\\bord10\\xbord14\\ybord8\\3c{}&\\shad0}}{}{{\\bord0\\3c{}&}}",
                            box_color, text, preset.outline_color
                        )
                    } else {
                        text
                    }
                })
                .collect();

            events.push(dialogue(
                active.start.max(0.0),
                hold_until(cue, idx),
                &parts.join(" "),
            ));
        }
    }
    events
}

/// Hormozi: rolling window, active word colored with a pop scale-in.
fn pop_word_events(cues: &[CaptionCue], preset: &StylePreset) -> Vec<String> {
    let active_color = preset.active_color.unwrap_or(preset.primary_color);
    let mut events = Vec::new();

    for cue in cues {
        for (idx, active) in cue.words.iter().enumerate() {
            let parts: Vec<String> = cue
                .words
                .iter()
                .enumerate()
                .map(|(j, w)| {
                    let text = display_text(&w.word, preset.uppercase);
                    if j == idx {
                        format!(
                            "{{\\c{}&\\fscx80\\fscy80\\t(0,120,\\fscx100\\fscy100)}}{}{{\\c{}&\\fscx100\\fscy100}}",
                            active_color, text, preset.primary_color
                        )
                    } else {
                        text
                    }
                })
                .collect();

            events.push(dialogue(
                active.start.max(0.0),
                hold_until(cue, idx),
                &parts.join(" "),
            ));
        }
    }
    events
}

/// Karaoke: one event per cue; `\k` switches each word from base to
/// highlight color exactly at its start. An instant split, not a fade.
fn karaoke_events(cues: &[CaptionCue], preset: &StylePreset) -> Vec<String> {
    let active_color = preset.active_color.unwrap_or(preset.primary_color);
    let mut events = Vec::new();

    for cue in cues {
        let mut text = format!("{{\\c{}&\\2c{}&}}", active_color, preset.primary_color);
        let mut cursor = cue.start;

        for (i, w) in cue.words.iter().enumerate() {
            // Burn inter-word gap time into the leading space so the
            // cumulative karaoke clock stays aligned with real time
            let gap_cs = ((w.start - cursor).max(0.0) * 100.0).round() as u32;
            if i > 0 {
                text.push_str(&format!("{{\\k{}}} ", gap_cs));
            } else if gap_cs > 0 {
                text.push_str(&format!("{{\\k{}}}", gap_cs));
            }
            let dur_cs = (w.duration() * 100.0).round() as u32;
            text.push_str(&format!(
                "{{\\k{}}}{}",
                dur_cs,
                display_text(&w.word, preset.uppercase)
            ));
            cursor = w.end;
        }

        events.push(dialogue(cue.start.max(0.0), cue.end, &text));
    }
    events
}

/// Subtle: plain line per cue.
fn plain_events(cues: &[CaptionCue]) -> Vec<String> {
    cues.iter()
        .map(|cue| dialogue(cue.start.max(0.0), cue.end, &cue.text))
        .collect()
}
