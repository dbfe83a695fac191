//! Cross-module pipeline properties that don't need a live FFmpeg:
//! caption building, timeline compression, and graph assembly working
//! together the way a real render wires them.

use podclip_media::captions::CaptionRenderer;
use podclip_media::overlay::{build_render_graph, GraphSpec};
use podclip_media::{CropPlanner, RenderConfig, RenderError, TimelinePlan};
use podclip_models::{CaptionStyle, WordTimestamp};

fn transcript(specs: &[(&str, f64, f64)]) -> Vec<WordTimestamp> {
    specs
        .iter()
        .map(|(w, s, e)| WordTimestamp::new(*w, *s, *e))
        .collect()
}

#[test]
fn captions_then_compression_keeps_words_on_the_compressed_clock() {
    let config = RenderConfig::default();
    let renderer = CaptionRenderer::new(&config);

    // "um" removal leaves a 2.4s hole between "so" and "anyway"
    let words = transcript(&[
        ("so", 10.0, 10.5),
        ("um", 10.6, 12.8),
        ("anyway", 12.9, 13.4),
        ("listen", 13.5, 14.0),
    ]);

    let track = renderer
        .render(&words, CaptionStyle::Karaoke, 10.0, 40.0, true)
        .unwrap();
    assert_eq!(track.displayed_words.len(), 3);

    let plan = TimelinePlan::from_word_gaps(
        &track.displayed_words,
        30.0,
        config.silence_gap_threshold,
        config.compressed_gap,
    )
    .expect("2.4s gap must cross the 1.5s threshold");

    // 2.4s gap compressed to 0.3s
    assert!((plan.removed() - 2.1).abs() < 1e-9);
    assert!((plan.compressed_duration() - 27.9).abs() < 1e-9);

    let remapped = plan.remap_words(&track.displayed_words);
    let compressed_track = renderer
        .render_clip_relative(remapped, CaptionStyle::Karaoke)
        .unwrap();

    // "anyway" started at 2.9 clip-relative; on the compressed clock
    // it starts right after the kept 0.3s beat of the pause
    let anyway = &compressed_track.displayed_words[1];
    assert!((anyway.start - 0.8).abs() < 1e-9);
    assert!((anyway.duration() - 0.5).abs() < 1e-9);
}

#[test]
fn no_threshold_crossing_leaves_duration_untouched() {
    let config = RenderConfig::default();
    let renderer = CaptionRenderer::new(&config);

    // Filler removal leaves only a 1.0s hole: below the 1.5s threshold
    let words = transcript(&[("so", 10.0, 10.5), ("um", 10.6, 11.4), ("anyway", 11.5, 12.0)]);

    let track = renderer
        .render(&words, CaptionStyle::Subtle, 10.0, 40.0, true)
        .unwrap();
    assert_eq!(track.displayed_words.len(), 2);

    let plan = TimelinePlan::from_word_gaps(
        &track.displayed_words,
        30.0,
        config.silence_gap_threshold,
        config.compressed_gap,
    );
    assert!(plan.is_none(), "sub-threshold gaps must not touch the timeline");
}

#[test]
fn out_of_window_words_are_recoverable_not_fatal() {
    let config = RenderConfig::default();
    let renderer = CaptionRenderer::new(&config);
    let words = transcript(&[("way", 200.0, 200.4), ("later", 200.5, 201.0)]);

    let err = renderer
        .render(&words, CaptionStyle::Branded, 10.0, 40.0, true)
        .unwrap_err();
    assert!(matches!(err, RenderError::EmptyTranscript));
}

#[test]
fn branded_render_graph_orders_layers_correctly() {
    let config = RenderConfig::default();
    let renderer = CaptionRenderer::new(&config);
    let words = transcript(&[("layered", 11.0, 11.5), ("look", 11.6, 12.1)]);
    let track = renderer
        .render(&words, CaptionStyle::Branded, 10.0, 40.0, true)
        .unwrap();
    assert!(track.needs_gradient);

    let crop = CropPlanner::plan_center(1920, 1080);
    let gradient = std::path::PathBuf::from("/work/gradient.png");
    let subs = std::path::PathBuf::from("/work/captions.ass");
    let logo = std::path::PathBuf::from("/assets/logo.png");
    let graph = build_render_graph(&GraphSpec {
        crop: Some(&crop),
        subtitle_path: Some(&subs),
        gradient_path: Some(&gradient),
        logo_path: Some(&logo),
        logo_height: track.logo_height,
        logo_margin_x: track.logo_margin_x,
        logo_margin_y: track.logo_margin_y,
        loudnorm: Some("loudnorm=I=-14:TP=-1.5:LRA=11"),
        ..Default::default()
    });

    // Fixed order: crop/scale, gradient, logo, caption burn
    let fc = &graph.filter_complex;
    let crop_pos = fc.find("crop=").unwrap();
    let gradient_pos = fc.find("overlay=0:0").unwrap();
    let logo_pos = fc.find("[logo]overlay=30:40").unwrap();
    let ass_pos = fc.find("ass='").unwrap();
    assert!(crop_pos < gradient_pos);
    assert!(gradient_pos < logo_pos);
    assert!(logo_pos < ass_pos);
}

#[test]
fn cue_slices_stay_contiguous_across_styles() {
    let config = RenderConfig::default();
    let renderer = CaptionRenderer::new(&config);
    let words: Vec<WordTimestamp> = (0..40)
        .map(|i| WordTimestamp::new(format!("w{:02}", i), 5.0 + i as f64 * 0.5, 5.3 + i as f64 * 0.5))
        .collect();

    for style in CaptionStyle::ALL {
        let track = renderer.render(&words, *style, 5.0, 30.0, false).unwrap();
        let flattened: Vec<String> = track
            .cues
            .iter()
            .flat_map(|c| c.words.iter().map(|w| w.word.clone()))
            .collect();

        // Never reordered, never duplicated, always a contiguous run
        let mut expected: Vec<String> = Vec::new();
        let mut i = 0;
        while expected.len() < flattened.len() {
            expected.push(format!("w{:02}", i));
            i += 1;
        }
        assert_eq!(flattened, expected, "style {} broke cue contiguity", style);
    }
}
