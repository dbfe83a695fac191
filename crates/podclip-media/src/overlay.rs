//! Filter-graph assembly and overlay asset generation.
//!
//! One render is one transcoder invocation: the graph composites
//! crop/scale, optional timeline compression, the gradient band, the
//! logo, and the burned caption track in that fixed order, then runs
//! audio through loudness normalization and optionally concatenates a
//! normalized outro. The gradient sits *under* the text layer; burning
//! text first and fading over it would band the gradient across the
//! glyph edges.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::config::{AUDIO_SAMPLE_RATE, OUTPUT_FPS, OUTPUT_HEIGHT, OUTPUT_WIDTH};
use crate::crop::{crop_x_expression, CropPlan};
use crate::error::RenderResult;
use crate::timeline::TimelinePlan;

/// A fully assembled filter graph plus the extra inputs it references,
/// in the order they must be added after the source input.
#[derive(Debug, Clone)]
pub struct RenderGraph {
    pub filter_complex: String,
    pub extra_inputs: Vec<PathBuf>,
    pub video_label: String,
    pub audio_label: String,
}

/// Everything the graph builder needs to know about one render.
#[derive(Debug, Default)]
pub struct GraphSpec<'a> {
    pub crop: Option<&'a CropPlan>,
    /// ASS document on disk, burned in when present
    pub subtitle_path: Option<&'a Path>,
    pub gradient_path: Option<&'a Path>,
    pub logo_path: Option<&'a Path>,
    /// Logo render height / top-left insets, used when `logo_path` is set
    pub logo_height: u32,
    pub logo_margin_x: u32,
    pub logo_margin_y: u32,
    pub outro_path: Option<&'a Path>,
    pub timeline: Option<&'a TimelinePlan>,
    /// Audio loudness filter directive
    pub loudnorm: Option<&'a str>,
}

/// Build the single-pass render graph.
pub fn build_render_graph(spec: &GraphSpec<'_>) -> RenderGraph {
    let mut parts: Vec<String> = Vec::new();
    let mut extra_inputs: Vec<PathBuf> = Vec::new();
    // Source is input 0; overlays and the outro follow in push order
    let mut next_input = 1usize;

    // -- video: crop/scale first, always to the fixed output frame
    let mut chain = vec![reframe_filter(spec.crop)];
    if let Some(plan) = spec.timeline {
        // Compression comes after the crop so the tracked crop
        // expression still sees source-relative time
        chain.push(plan.video_filter());
    }
    chain.push(format!("fps={},format=yuv420p", OUTPUT_FPS));
    parts.push(format!("[0:v]{}[vbase]", chain.join(",")));
    let mut video = "vbase".to_string();

    // -- gradient band under everything else
    if let Some(gradient) = spec.gradient_path {
        extra_inputs.push(gradient.to_path_buf());
        parts.push(format!(
            "[{video}][{idx}:v]overlay=0:0:format=auto[vgrad]",
            video = video,
            idx = next_input
        ));
        video = "vgrad".to_string();
        next_input += 1;
    }

    // -- logo above the gradient, below the text
    if let Some(logo) = spec.logo_path {
        extra_inputs.push(logo.to_path_buf());
        parts.push(format!(
            "[{idx}:v]scale=-1:{h}[logo]",
            idx = next_input,
            h = spec.logo_height.max(1)
        ));
        parts.push(format!(
            "[{video}][logo]overlay={x}:{y}[vlogo]",
            video = video,
            x = spec.logo_margin_x,
            y = spec.logo_margin_y
        ));
        video = "vlogo".to_string();
        next_input += 1;
    }

    // -- caption burn-in last, over every composited layer
    if let Some(subs) = spec.subtitle_path {
        parts.push(format!(
            "[{video}]ass='{path}'[vcap]",
            video = video,
            path = escape_filter_path(subs)
        ));
        video = "vcap".to_string();
    }

    // -- audio: optional compression, loudness, fixed output format
    let mut audio_chain: Vec<String> = Vec::new();
    if let Some(plan) = spec.timeline {
        audio_chain.push(plan.audio_filter());
    }
    if let Some(loudnorm) = spec.loudnorm {
        audio_chain.push(loudnorm.to_string());
    }
    audio_chain.push(format!(
        "aformat=sample_rates={}:channel_layouts=stereo",
        AUDIO_SAMPLE_RATE
    ));
    parts.push(format!("[0:a]{}[abase]", audio_chain.join(",")));
    let mut audio = "abase".to_string();

    // -- outro: normalized to the output frame, then concatenated
    if let Some(outro) = spec.outro_path {
        extra_inputs.push(outro.to_path_buf());
        parts.push(format!(
            "[{idx}:v]scale={w}:{h}:force_original_aspect_ratio=decrease,\
             pad={w}:{h}:(ow-iw)/2:(oh-ih)/2:black,fps={fps},format=yuv420p[vout_outro]",
            idx = next_input,
            w = OUTPUT_WIDTH,
            h = OUTPUT_HEIGHT,
            fps = OUTPUT_FPS
        ));
        parts.push(format!(
            "[{idx}:a]aformat=sample_rates={sr}:channel_layouts=stereo[aout_outro]",
            idx = next_input,
            sr = AUDIO_SAMPLE_RATE
        ));
        parts.push(format!(
            "[{video}][{audio}][vout_outro][aout_outro]concat=n=2:v=1:a=1[vfinal][afinal]",
            video = video,
            audio = audio
        ));
        video = "vfinal".to_string();
        audio = "afinal".to_string();
    }

    let graph = RenderGraph {
        filter_complex: parts.join(";"),
        extra_inputs,
        video_label: format!("[{}]", video),
        audio_label: format!("[{}]", audio),
    };
    debug!(graph = %graph.filter_complex, "Assembled render graph");
    graph
}

/// The crop/scale (or letterbox) stage for a crop plan.
fn reframe_filter(crop: Option<&CropPlan>) -> String {
    match crop {
        Some(CropPlan::Static(w)) => format!(
            "crop={}:{}:{}:{},scale={}:{}",
            w.width, w.height, w.x, w.y, OUTPUT_WIDTH, OUTPUT_HEIGHT
        ),
        Some(CropPlan::Tracked(keyframes)) => {
            let first = &keyframes[0].window;
            format!(
                "crop={}:{}:'{}':{},scale={}:{}",
                first.width,
                first.height,
                crop_x_expression(keyframes),
                first.y,
                OUTPUT_WIDTH,
                OUTPUT_HEIGHT
            )
        }
        Some(CropPlan::Letterbox) | None => format!(
            "scale={w}:{h}:force_original_aspect_ratio=decrease,\
             pad={w}:{h}:(ow-iw)/2:(oh-ih)/2:black",
            w = OUTPUT_WIDTH,
            h = OUTPUT_HEIGHT
        ),
    }
}

/// Escape a path for use inside a quoted filter argument.
fn escape_filter_path(path: &Path) -> String {
    path.to_string_lossy()
        .replace('\\', "/")
        .replace(':', "\\:")
}

/// Render the bottom-half transparent-to-black gradient band used by
/// the branded style. Produced once per render as a PNG input; the
/// alpha ramp runs from fully transparent at mid-frame to `opacity`
/// black at the bottom edge.
pub async fn create_gradient_png(
    output: impl AsRef<Path>,
    width: u32,
    height: u32,
    opacity: f64,
) -> RenderResult<()> {
    let max_alpha = (opacity.clamp(0.0, 1.0) * 255.0).round() as u32;
    let spec = format!(
        "color=black@0.0:size={w}x{h}:duration=1,format=rgba,\
         geq=r=0:g=0:b=0:a='if(lt(Y,H/2),0,min({a},{a}*(Y-H/2)/(H/2)))'",
        w = width,
        h = height,
        a = max_alpha
    );

    let cmd = FfmpegCommand::new(output.as_ref())
        .lavfi_input(spec)
        .single_frame();
    FfmpegRunner::new().run(&cmd).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use podclip_models::{CropKeyframe, CropWindow};

    fn static_plan() -> CropPlan {
        CropPlan::Static(CropWindow::new(656, 0, 608, 1080))
    }

    #[test]
    fn test_minimal_graph() {
        let crop = static_plan();
        let spec = GraphSpec {
            crop: Some(&crop),
            loudnorm: Some("loudnorm=I=-14:TP=-1.5:LRA=11"),
            ..Default::default()
        };
        let graph = build_render_graph(&spec);
        assert!(graph.filter_complex.starts_with("[0:v]crop=608:1080:656:0,scale=1080:1920"));
        assert!(graph.filter_complex.contains("[0:a]loudnorm="));
        assert!(graph.extra_inputs.is_empty());
        assert_eq!(graph.video_label, "[vbase]");
        assert_eq!(graph.audio_label, "[abase]");
    }

    #[test]
    fn test_gradient_before_captions() {
        let crop = static_plan();
        let gradient = PathBuf::from("/tmp/grad.png");
        let subs = PathBuf::from("/tmp/captions.ass");
        let spec = GraphSpec {
            crop: Some(&crop),
            gradient_path: Some(&gradient),
            subtitle_path: Some(&subs),
            loudnorm: Some("loudnorm=I=-14:TP=-1.5:LRA=11"),
            ..Default::default()
        };
        let graph = build_render_graph(&spec);
        let gradient_pos = graph.filter_complex.find("overlay=0:0").unwrap();
        let ass_pos = graph.filter_complex.find("ass=").unwrap();
        assert!(
            gradient_pos < ass_pos,
            "gradient must be composited before the text layer"
        );
        assert_eq!(graph.video_label, "[vcap]");
        assert_eq!(graph.extra_inputs, vec![gradient]);
    }

    #[test]
    fn test_full_branded_graph_input_order() {
        let crop = static_plan();
        let gradient = PathBuf::from("/tmp/grad.png");
        let logo = PathBuf::from("/tmp/logo.png");
        let subs = PathBuf::from("/tmp/captions.ass");
        let outro = PathBuf::from("/tmp/outro.mp4");
        let spec = GraphSpec {
            crop: Some(&crop),
            subtitle_path: Some(&subs),
            gradient_path: Some(&gradient),
            logo_path: Some(&logo),
            logo_height: 80,
            logo_margin_x: 30,
            logo_margin_y: 40,
            outro_path: Some(&outro),
            loudnorm: Some("loudnorm=I=-14:TP=-1.5:LRA=11"),
            ..Default::default()
        };
        let graph = build_render_graph(&spec);
        // Input order: gradient, logo, outro after the source
        assert_eq!(graph.extra_inputs, vec![gradient, logo, outro]);
        assert!(graph.filter_complex.contains("[1:v]overlay") || graph.filter_complex.contains("[vbase][1:v]"));
        assert!(graph.filter_complex.contains("[2:v]scale=-1:80[logo]"));
        assert!(graph.filter_complex.contains("[logo]overlay=30:40"));
        assert!(graph.filter_complex.contains("[3:v]scale=1080:1920"));
        assert!(graph.filter_complex.contains("concat=n=2:v=1:a=1"));
        assert_eq!(graph.video_label, "[vfinal]");
        assert_eq!(graph.audio_label, "[afinal]");
    }

    #[test]
    fn test_tracked_crop_uses_time_expression() {
        let plan = CropPlan::Tracked(vec![
            CropKeyframe::new(0.0, CropWindow::new(100, 0, 608, 1080)),
            CropKeyframe::new(2.0, CropWindow::new(300, 0, 608, 1080)),
        ]);
        let spec = GraphSpec {
            crop: Some(&plan),
            loudnorm: Some("loudnorm=I=-14:TP=-1.5:LRA=11"),
            ..Default::default()
        };
        let graph = build_render_graph(&spec);
        assert!(graph.filter_complex.contains("crop=608:1080:'if(lt(t,"));
    }

    #[test]
    fn test_letterbox_pads_instead_of_cropping() {
        let spec = GraphSpec {
            crop: Some(&CropPlan::Letterbox),
            loudnorm: Some("loudnorm=I=-14:TP=-1.5:LRA=11"),
            ..Default::default()
        };
        let graph = build_render_graph(&spec);
        assert!(graph.filter_complex.contains("pad=1080:1920"));
        assert!(!graph.filter_complex.contains("crop="));
    }

    #[test]
    fn test_timeline_compression_between_crop_and_overlays() {
        let words = vec![
            podclip_models::WordTimestamp::new("a", 0.0, 1.0),
            podclip_models::WordTimestamp::new("b", 5.0, 5.5),
        ];
        let plan = TimelinePlan::from_word_gaps(&words, 30.0, 1.5, 0.3).unwrap();
        let crop = static_plan();
        let spec = GraphSpec {
            crop: Some(&crop),
            timeline: Some(&plan),
            loudnorm: Some("loudnorm=I=-14:TP=-1.5:LRA=11"),
            ..Default::default()
        };
        let graph = build_render_graph(&spec);
        let crop_pos = graph.filter_complex.find("crop=").unwrap();
        let select_pos = graph.filter_complex.find("select=").unwrap();
        assert!(crop_pos < select_pos);
        assert!(graph.filter_complex.contains("aselect="));
    }

    #[test]
    fn test_ass_path_escaping() {
        assert_eq!(
            escape_filter_path(Path::new("/tmp/work/captions.ass")),
            "/tmp/work/captions.ass"
        );
        assert_eq!(
            escape_filter_path(Path::new("C:\\work\\captions.ass")),
            "C\\:/work/captions.ass"
        );
    }
}
