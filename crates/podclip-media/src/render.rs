//! Single-clip rendering: validate -> plan -> encode -> finalize.
//!
//! Validation failures are synchronous errors; once a request passes
//! validation, every later failure is caught and reported as a
//! `ClipResult` with error status so batch processing can continue.

use std::path::Path;
use std::sync::Arc;

use tokio::sync::watch;
use tracing::{info, warn};

use podclip_models::{ClipRequest, ClipResult, CropStrategy, WordTimestamp};

use crate::captions::CaptionRenderer;
use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::config::{RenderConfig, AUDIO_BITRATE, AUDIO_CODEC, OUTPUT_HEIGHT, OUTPUT_WIDTH};
use crate::crop::{CropPlan, CropPlanner};
use crate::encoder::{self, EncoderProfile};
use crate::error::{RenderError, RenderResult};
use crate::fs_utils::{collision_safe_path, move_file};
use crate::overlay::{build_render_graph, create_gradient_png, GraphSpec, RenderGraph};
use crate::timeline::TimelinePlan;
use crate::{loudness, probe};

/// Progress callback: `(percent, message)`.
pub type RenderProgress = Arc<dyn Fn(u8, &str) + Send + Sync>;

fn no_progress() -> RenderProgress {
    Arc::new(|_, _| {})
}

/// Renders one clip per call. Stateless across calls apart from the
/// process-wide cached encoder profile.
pub struct ClipRenderer {
    config: RenderConfig,
    planner: CropPlanner,
    cancel_rx: Option<watch::Receiver<bool>>,
}

impl ClipRenderer {
    pub fn new(config: RenderConfig) -> Self {
        let planner = CropPlanner::new(config.face_sample_interval);
        Self {
            config,
            planner,
            cancel_rx: None,
        }
    }

    /// Use a custom crop planner (e.g. a model-backed face locator).
    pub fn with_crop_planner(mut self, planner: CropPlanner) -> Self {
        self.planner = planner;
        self
    }

    /// Attach a cancellation signal; an in-flight encode is killed and
    /// its partial output removed when it fires.
    pub fn with_cancel(mut self, cancel_rx: watch::Receiver<bool>) -> Self {
        self.cancel_rx = Some(cancel_rx);
        self
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Render a clip.
    ///
    /// Returns `Err` only for validation failures and fatal
    /// environment problems (missing toolchain, no encoder); any
    /// failure after validation comes back as an error `ClipResult`.
    pub async fn render(
        &self,
        request: &ClipRequest,
        words: &[WordTimestamp],
    ) -> RenderResult<ClipResult> {
        self.render_with_progress(request, words, no_progress()).await
    }

    /// Render a clip with progress reporting.
    pub async fn render_with_progress(
        &self,
        request: &ClipRequest,
        words: &[WordTimestamp],
        progress: RenderProgress,
    ) -> RenderResult<ClipResult> {
        self.validate(request)?;
        progress(5, "Request validated");

        match self.run_pipeline(request, words, &progress).await {
            Ok(result) => Ok(result),
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                warn!(title = %request.title, "Clip render failed: {}", e);
                Ok(ClipResult::failure(e.to_string()))
            }
        }
    }

    /// Synchronous validation; rejects before any subprocess spawns.
    fn validate(&self, request: &ClipRequest) -> RenderResult<()> {
        if request.end_second <= request.start_second {
            return Err(RenderError::validation(
                "end_second must be greater than start_second",
            ));
        }
        let duration = request.duration();
        if duration > self.config.max_clip_secs {
            return Err(RenderError::validation(format!(
                "clip too long ({:.0}s); maximum is {:.0}s",
                duration, self.config.max_clip_secs
            )));
        }
        if !request.source_path.exists() {
            return Err(RenderError::AssetMissing(request.source_path.clone()));
        }
        for asset in [&request.logo_path, &request.outro_path].into_iter().flatten() {
            if !asset.exists() {
                return Err(RenderError::AssetMissing(asset.clone()));
            }
        }
        Ok(())
    }

    async fn run_pipeline(
        &self,
        request: &ClipRequest,
        words: &[WordTimestamp],
        progress: &RenderProgress,
    ) -> RenderResult<ClipResult> {
        let duration = request.duration();
        let mut warnings: Vec<String> = Vec::new();

        info!(
            source = %request.source_path.display(),
            start = request.start_second,
            end = request.end_second,
            style = %request.caption_style,
            crop = %request.crop_strategy,
            "Rendering clip"
        );

        let source_info = probe::probe_video(&request.source_path).await?;
        let work_dir = tempfile::tempdir()?;

        // -- plan the reframe
        progress(15, "Planning crop");
        let crop = match request.crop_strategy {
            CropStrategy::Center => {
                CropPlanner::plan_center(source_info.width, source_info.height)
            }
            CropStrategy::Face => {
                let planned = self
                    .planner
                    .plan_face(
                        &request.source_path,
                        request.start_second,
                        duration,
                        source_info.width,
                        source_info.height,
                        work_dir.path(),
                    )
                    .await;
                if let Some(warning) = planned.warning {
                    warnings.push(warning);
                }
                planned.plan
            }
        };

        // -- captions (recoverable when the window has no words)
        progress(25, "Rendering captions");
        let caption_renderer = CaptionRenderer::new(&self.config);
        let mut track = match caption_renderer.render(
            words,
            request.caption_style,
            request.start_second,
            request.end_second,
            request.clean_fillers,
        ) {
            Ok(track) => Some(track),
            Err(RenderError::EmptyTranscript) => {
                warnings.push("no transcript words in window; rendering without captions".into());
                None
            }
            Err(e) => return Err(e),
        };

        // -- compress dead air left by filler cleanup
        let timeline = if request.clean_fillers {
            track.as_ref().and_then(|t| {
                TimelinePlan::from_word_gaps(
                    &t.displayed_words,
                    duration,
                    self.config.silence_gap_threshold,
                    self.config.compressed_gap,
                )
            })
        } else {
            None
        };
        if let Some(plan) = &timeline {
            if let Some(existing) = track.take() {
                // Captions must follow the compressed clock
                let remapped = plan.remap_words(&existing.displayed_words);
                track = Some(
                    caption_renderer.render_clip_relative(remapped, request.caption_style)?,
                );
            }
        }

        // -- materialize overlay assets
        let subtitle_path = match &track {
            Some(t) => {
                let path = work_dir.path().join("captions.ass");
                tokio::fs::write(&path, &t.ass_document).await?;
                Some(path)
            }
            None => None,
        };
        let gradient_path = match &track {
            Some(t) if t.needs_gradient => {
                let path = work_dir.path().join("gradient.png");
                create_gradient_png(&path, OUTPUT_WIDTH, OUTPUT_HEIGHT, t.gradient_opacity)
                    .await?;
                Some(path)
            }
            _ => None,
        };
        let logo_path = match &track {
            Some(t) if t.supports_logo => request.logo_path.as_deref(),
            _ => None,
        };

        // -- assemble the single-pass graph
        let loudnorm = loudness::plan(self.config.target_lufs);
        let (logo_height, logo_margin_x, logo_margin_y) = track
            .as_ref()
            .map(|t| (t.logo_height, t.logo_margin_x, t.logo_margin_y))
            .unwrap_or((0, 0, 0));
        let graph = build_render_graph(&GraphSpec {
            crop: Some(&crop),
            subtitle_path: subtitle_path.as_deref(),
            gradient_path: gradient_path.as_deref(),
            logo_path,
            logo_height,
            logo_margin_x,
            logo_margin_y,
            outro_path: request.outro_path.as_deref(),
            timeline: timeline.as_ref(),
            loudnorm: Some(&loudnorm),
        });

        // -- encode
        progress(35, "Encoding");
        let profile = encoder::detect().await?;
        let encoded = work_dir.path().join("render.mp4");
        self.encode(request, &graph, profile, &encoded, duration, &mut warnings, progress)
            .await?;

        // -- finalize
        progress(95, "Saving final clip");
        let result = self
            .finalize(&encoded, &request.title, duration, &crop, timeline.as_ref())
            .await?;
        progress(100, "Clip complete");
        Ok(result.with_warnings(warnings))
    }

    /// Run the transcoder once; a hardware-profile failure gets one
    /// retry on the CPU profile before the clip is reported failed.
    #[allow(clippy::too_many_arguments)]
    async fn encode(
        &self,
        request: &ClipRequest,
        graph: &RenderGraph,
        profile: &EncoderProfile,
        output: &Path,
        duration: f64,
        warnings: &mut Vec<String>,
        progress: &RenderProgress,
    ) -> RenderResult<()> {
        let cmd = self.encode_command(request, graph, profile, output, duration);
        match self.run_encode(&cmd, duration, progress).await {
            Ok(()) => Ok(()),
            Err(e @ (RenderError::EncodeTimeout(_) | RenderError::Cancelled)) => Err(e),
            Err(e) if profile.is_hardware() => {
                warn!(
                    encoder = profile.kind.codec_name(),
                    "Hardware encode failed, retrying with libx264: {}", e
                );
                warnings.push(format!(
                    "{} failed; re-encoded with libx264",
                    profile.kind.codec_name()
                ));
                let cpu = EncoderProfile::cpu();
                let cmd = self.encode_command(request, graph, &cpu, output, duration);
                self.run_encode(&cmd, duration, progress).await
            }
            Err(e) => Err(e),
        }
    }

    fn encode_command(
        &self,
        request: &ClipRequest,
        graph: &RenderGraph,
        profile: &EncoderProfile,
        output: &Path,
        duration: f64,
    ) -> FfmpegCommand {
        let mut cmd = FfmpegCommand::new(output)
            .input(&request.source_path)
            .seek(request.start_second)
            .duration(duration);
        for extra in &graph.extra_inputs {
            cmd = cmd.input(extra);
        }
        cmd.filter_complex(graph.filter_complex.clone())
            .map(graph.video_label.clone())
            .map(graph.audio_label.clone())
            .output_args(profile.codec_args.clone())
            .audio_codec(AUDIO_CODEC)
            .audio_bitrate(AUDIO_BITRATE)
            .faststart()
    }

    async fn run_encode(
        &self,
        cmd: &FfmpegCommand,
        total_secs: f64,
        progress: &RenderProgress,
    ) -> RenderResult<()> {
        let mut runner = FfmpegRunner::new().with_timeout(self.config.encode_timeout_secs);
        if let Some(cancel) = &self.cancel_rx {
            runner = runner.with_cancel(cancel.clone());
        }
        let progress = Arc::clone(progress);
        runner
            .run_with_progress(cmd, move |p| {
                // Encoding spans the 35-90% band of the overall render
                let pct = 35 + (p.percent_of(total_secs) as u32 * 55 / 100) as u8;
                progress(pct, "Encoding");
            })
            .await
    }

    /// Verify the output, measure it, and move it into the output
    /// directory under a collision-safe name.
    async fn finalize(
        &self,
        encoded: &Path,
        title: &str,
        requested_duration: f64,
        crop: &CropPlan,
        timeline: Option<&TimelinePlan>,
    ) -> RenderResult<ClipResult> {
        let metadata = tokio::fs::metadata(encoded).await.map_err(|_| {
            RenderError::encode_failed("encoder produced no output file", None, None)
        })?;
        if metadata.len() == 0 {
            return Err(RenderError::encode_failed(
                "encoder produced an empty output file",
                None,
                None,
            ));
        }

        let final_duration = match probe::probe_video(encoded).await {
            Ok(info) if info.duration > 0.0 => info.duration,
            // Fall back to the planned duration when the container
            // probe is inconclusive
            _ => timeline
                .map(|t| t.compressed_duration())
                .unwrap_or(requested_duration),
        };
        let file_size_mb = (metadata.len() as f64 / (1024.0 * 1024.0) * 100.0).round() / 100.0;

        tokio::fs::create_dir_all(&self.config.output_dir).await?;
        let final_path = collision_safe_path(&self.config.output_dir, title);
        move_file(encoded, &final_path).await?;

        info!(
            output = %final_path.display(),
            duration = final_duration,
            size_mb = file_size_mb,
            crop = ?crop_kind(crop),
            "Clip finished"
        );
        Ok(ClipResult::success(final_path, final_duration, file_size_mb))
    }
}

fn crop_kind(crop: &CropPlan) -> &'static str {
    match crop {
        CropPlan::Static(_) => "static",
        CropPlan::Letterbox => "letterbox",
        CropPlan::Tracked(_) => "tracked",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use podclip_models::CaptionStyle;
    use tempfile::TempDir;

    fn renderer(dir: &TempDir) -> ClipRenderer {
        ClipRenderer::new(RenderConfig::default().with_output_dir(dir.path().join("out")))
    }

    fn request(dir: &TempDir, start: f64, end: f64) -> ClipRequest {
        // A real file on disk so source existence checks pass
        let source = dir.path().join("source.mp4");
        std::fs::write(&source, b"not a real video").unwrap();
        ClipRequest {
            source_path: source,
            start_second: start,
            end_second: end,
            caption_style: CaptionStyle::Subtle,
            crop_strategy: podclip_models::CropStrategy::Center,
            title: "test".to_string(),
            logo_path: None,
            outro_path: None,
            clean_fillers: true,
        }
    }

    #[tokio::test]
    async fn test_reversed_range_rejected_synchronously() {
        let dir = TempDir::new().unwrap();
        let r = renderer(&dir);
        let err = r.render(&request(&dir, 40.0, 10.0), &[]).await.unwrap_err();
        assert!(matches!(err, RenderError::Validation(_)));
    }

    #[tokio::test]
    async fn test_equal_range_rejected() {
        let dir = TempDir::new().unwrap();
        let r = renderer(&dir);
        let err = r.render(&request(&dir, 10.0, 10.0), &[]).await.unwrap_err();
        assert!(matches!(err, RenderError::Validation(_)));
    }

    #[tokio::test]
    async fn test_over_max_duration_rejected() {
        let dir = TempDir::new().unwrap();
        let r = renderer(&dir);
        let err = r.render(&request(&dir, 0.0, 200.0), &[]).await.unwrap_err();
        assert!(matches!(err, RenderError::Validation(_)));
    }

    #[tokio::test]
    async fn test_missing_source_rejected() {
        let dir = TempDir::new().unwrap();
        let r = renderer(&dir);
        let mut req = request(&dir, 0.0, 30.0);
        req.source_path = dir.path().join("missing.mp4");
        let err = r.render(&req, &[]).await.unwrap_err();
        assert!(matches!(err, RenderError::AssetMissing(_)));
    }

    #[tokio::test]
    async fn test_missing_logo_rejected() {
        let dir = TempDir::new().unwrap();
        let r = renderer(&dir);
        let mut req = request(&dir, 0.0, 30.0);
        req.logo_path = Some(dir.path().join("missing_logo.png"));
        let err = r.render(&req, &[]).await.unwrap_err();
        assert!(matches!(err, RenderError::AssetMissing(_)));
    }

    #[tokio::test]
    async fn test_missing_outro_rejected() {
        let dir = TempDir::new().unwrap();
        let r = renderer(&dir);
        let mut req = request(&dir, 0.0, 30.0);
        req.outro_path = Some(dir.path().join("missing_outro.mp4"));
        let err = r.render(&req, &[]).await.unwrap_err();
        assert!(matches!(err, RenderError::AssetMissing(_)));
    }

    #[tokio::test]
    async fn test_max_duration_boundary_accepted_by_validation() {
        // Exactly 180s passes validation (fails later at the probe on
        // the fake file, which is a pipeline error, not validation)
        let dir = TempDir::new().unwrap();
        let r = renderer(&dir);
        let req = request(&dir, 0.0, 180.0);
        match r.render(&req, &[]).await {
            Ok(result) => assert!(!result.is_success()),
            Err(e) => assert!(
                !matches!(e, RenderError::Validation(_)),
                "boundary duration must not be a validation error: {}",
                e
            ),
        }
    }
}
