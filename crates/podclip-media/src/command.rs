//! FFmpeg command builder and runner.
//!
//! The builder supports the multi-input graphs this pipeline assembles
//! (source + gradient + logo + outro in one invocation). The runner
//! adds progress parsing, cancellation, a hard wall-clock timeout, and
//! cleanup of partial output files.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::error::{RenderError, RenderResult};
use crate::progress::FfmpegProgress;

/// How many trailing stderr lines are kept for failure diagnostics.
const STDERR_TAIL_LINES: usize = 40;

/// One `-i` input with its preceding arguments (`-ss`, `-t`, `-f lavfi`, ...).
#[derive(Debug, Clone)]
struct FfmpegInput {
    pre_args: Vec<String>,
    source: String,
}

/// Builder for a single FFmpeg invocation.
#[derive(Debug, Clone)]
pub struct FfmpegCommand {
    inputs: Vec<FfmpegInput>,
    output: PathBuf,
    output_args: Vec<String>,
    overwrite: bool,
    log_level: String,
}

impl FfmpegCommand {
    /// Create a command writing to `output`.
    pub fn new(output: impl AsRef<Path>) -> Self {
        Self {
            inputs: Vec::new(),
            output: output.as_ref().to_path_buf(),
            output_args: Vec::new(),
            overwrite: true,
            log_level: "error".to_string(),
        }
    }

    /// Add a file input. Subsequent `seek`/`duration` calls apply to it.
    pub fn input(mut self, path: impl AsRef<Path>) -> Self {
        self.inputs.push(FfmpegInput {
            pre_args: Vec::new(),
            source: path.as_ref().to_string_lossy().to_string(),
        });
        self
    }

    /// Add a lavfi-generated input (test sources, gradients, silence).
    pub fn lavfi_input(mut self, spec: impl Into<String>) -> Self {
        self.inputs.push(FfmpegInput {
            pre_args: vec!["-f".to_string(), "lavfi".to_string()],
            source: spec.into(),
        });
        self
    }

    /// Seek the most recently added input (`-ss` before `-i`, fast seek).
    pub fn seek(mut self, seconds: f64) -> Self {
        self.last_input_args(&["-ss".to_string(), format!("{:.3}", seconds)]);
        self
    }

    /// Limit the most recently added input's read duration.
    pub fn duration(mut self, seconds: f64) -> Self {
        self.last_input_args(&["-t".to_string(), format!("{:.3}", seconds)]);
        self
    }

    fn last_input_args(&mut self, args: &[String]) {
        if let Some(input) = self.inputs.last_mut() {
            input.pre_args.extend_from_slice(args);
        }
    }

    /// Add an output argument.
    pub fn output_arg(mut self, arg: impl Into<String>) -> Self {
        self.output_args.push(arg.into());
        self
    }

    /// Add multiple output arguments.
    pub fn output_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.output_args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set a simple video filter chain (`-vf`).
    pub fn video_filter(self, filter: impl Into<String>) -> Self {
        self.output_arg("-vf").output_arg(filter)
    }

    /// Set a filter graph (`-filter_complex`).
    pub fn filter_complex(self, graph: impl Into<String>) -> Self {
        self.output_arg("-filter_complex").output_arg(graph)
    }

    /// Map a filter graph label or stream specifier into the output.
    pub fn map(self, label: impl Into<String>) -> Self {
        self.output_arg("-map").output_arg(label)
    }

    /// Set an audio filter chain (`-af`).
    pub fn audio_filter(self, filter: impl Into<String>) -> Self {
        self.output_arg("-af").output_arg(filter)
    }

    /// Stream-copy both streams (no re-encode).
    pub fn codec_copy(self) -> Self {
        self.output_arg("-c").output_arg("copy")
    }

    /// Set the audio codec.
    pub fn audio_codec(self, codec: impl Into<String>) -> Self {
        self.output_arg("-c:a").output_arg(codec)
    }

    /// Set the audio bitrate.
    pub fn audio_bitrate(self, bitrate: impl Into<String>) -> Self {
        self.output_arg("-b:a").output_arg(bitrate)
    }

    /// Set the audio sample rate.
    pub fn audio_sample_rate(self, rate: u32) -> Self {
        self.output_arg("-ar").output_arg(rate.to_string())
    }

    /// Move the moov atom up front for streaming playback.
    pub fn faststart(self) -> Self {
        self.output_arg("-movflags").output_arg("+faststart")
    }

    /// Emit a single output frame (thumbnails, gradient stills).
    pub fn single_frame(self) -> Self {
        self.output_arg("-frames:v").output_arg("1")
    }

    /// Override the log level (default "error").
    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    /// The output path this command writes to.
    pub fn output_path(&self) -> &Path {
        &self.output
    }

    /// Build the full argument vector.
    pub fn build_args(&self) -> Vec<String> {
        let mut args = Vec::new();

        if self.overwrite {
            args.push("-y".to_string());
        }

        args.push("-v".to_string());
        args.push(self.log_level.clone());

        // Progress key/value stream on stderr
        args.push("-progress".to_string());
        args.push("pipe:2".to_string());

        for input in &self.inputs {
            args.extend(input.pre_args.iter().cloned());
            args.push("-i".to_string());
            args.push(input.source.clone());
        }

        args.extend(self.output_args.iter().cloned());
        args.push(self.output.to_string_lossy().to_string());

        args
    }
}

/// Runner for FFmpeg commands with progress tracking, timeout, and
/// cancellation.
pub struct FfmpegRunner {
    cancel_rx: Option<watch::Receiver<bool>>,
    timeout_secs: Option<u64>,
}

impl Default for FfmpegRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl FfmpegRunner {
    pub fn new() -> Self {
        Self {
            cancel_rx: None,
            timeout_secs: None,
        }
    }

    /// Attach a cancellation signal. When it flips to `true` the
    /// subprocess is killed and the partial output deleted.
    pub fn with_cancel(mut self, cancel_rx: watch::Receiver<bool>) -> Self {
        self.cancel_rx = Some(cancel_rx);
        self
    }

    /// Set a hard wall-clock timeout for the invocation.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    /// Run a command, discarding progress.
    pub async fn run(&self, cmd: &FfmpegCommand) -> RenderResult<()> {
        self.run_with_progress(cmd, |_| {}).await
    }

    /// Run a command, invoking `progress_callback` with each parsed
    /// progress snapshot.
    pub async fn run_with_progress<F>(
        &self,
        cmd: &FfmpegCommand,
        progress_callback: F,
    ) -> RenderResult<()>
    where
        F: Fn(FfmpegProgress) + Send + 'static,
    {
        which::which("ffmpeg").map_err(|_| RenderError::FfmpegNotFound)?;

        let args = cmd.build_args();
        debug!("Running FFmpeg: ffmpeg {}", args.join(" "));

        let mut child = Command::new("ffmpeg")
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()?;

        let stderr = child.stderr.take().ok_or_else(|| {
            RenderError::encode_failed("stderr not captured", None, None)
        })?;
        let mut reader = BufReader::new(stderr).lines();

        // Parse progress lines and retain a tail of everything else for
        // failure diagnostics.
        let stderr_task = tokio::spawn(async move {
            let mut current = FfmpegProgress::default();
            let mut tail: Vec<String> = Vec::new();

            while let Ok(Some(line)) = reader.next_line().await {
                if let Some(progress) = parse_progress_line(&line, &mut current) {
                    progress_callback(progress);
                } else if !line.trim().is_empty() {
                    if tail.len() == STDERR_TAIL_LINES {
                        tail.remove(0);
                    }
                    tail.push(line);
                }
            }
            tail
        });

        let result = self.wait_for_completion(&mut child).await;
        let tail = stderr_task.await.unwrap_or_default();

        match result {
            Ok(()) => Ok(()),
            Err(RenderError::EncodeFailed {
                message, exit_code, ..
            }) => {
                self.remove_partial_output(cmd).await;
                Err(RenderError::EncodeFailed {
                    message,
                    stderr: (!tail.is_empty()).then(|| tail.join("\n")),
                    exit_code,
                })
            }
            Err(e @ (RenderError::EncodeTimeout(_) | RenderError::Cancelled)) => {
                // Never leave a half-written file in place
                self.remove_partial_output(cmd).await;
                Err(e)
            }
            Err(e) => Err(e),
        }
    }

    async fn wait_for_completion(&self, child: &mut Child) -> RenderResult<()> {
        let status = if let Some(timeout_secs) = self.timeout_secs {
            match tokio::time::timeout(
                std::time::Duration::from_secs(timeout_secs),
                child.wait(),
            )
            .await
            {
                Ok(result) => result?,
                Err(_) => {
                    warn!(
                        timeout_secs,
                        "FFmpeg exceeded wall-clock timeout, killing process"
                    );
                    let _ = child.kill().await;
                    return Err(RenderError::EncodeTimeout(timeout_secs));
                }
            }
        } else {
            child.wait().await?
        };

        if let Some(ref cancel_rx) = self.cancel_rx {
            if *cancel_rx.borrow() {
                info!("Render cancelled, killing FFmpeg");
                let _ = child.kill().await;
                return Err(RenderError::Cancelled);
            }
        }

        if status.success() {
            Ok(())
        } else {
            Err(RenderError::encode_failed(
                "FFmpeg exited with non-zero status",
                None,
                status.code(),
            ))
        }
    }

    async fn remove_partial_output(&self, cmd: &FfmpegCommand) {
        let output = cmd.output_path();
        if output.exists() {
            if let Err(e) = tokio::fs::remove_file(output).await {
                warn!("Failed to remove partial output {}: {}", output.display(), e);
            }
        }
    }
}

/// Parse one line of FFmpeg's `-progress` key/value output. Returns a
/// snapshot when a `progress=` terminator line arrives.
fn parse_progress_line(line: &str, current: &mut FfmpegProgress) -> Option<FfmpegProgress> {
    let (key, value) = line.trim().split_once('=')?;

    match key {
        "out_time_ms" | "out_time_us" => {
            // Both keys are microseconds in modern builds
            if let Ok(us) = value.parse::<i64>() {
                current.out_time_ms = us / 1000;
            }
        }
        "out_time" => {
            current.out_time = value.to_string();
        }
        "frame" => {
            if let Ok(frame) = value.parse() {
                current.frame = frame;
            }
        }
        "fps" => {
            if let Ok(fps) = value.parse() {
                current.fps = fps;
            }
        }
        "speed" => {
            if let Some(speed) = value.strip_suffix('x').and_then(|s| s.parse().ok()) {
                current.speed = speed;
            }
        }
        "progress" => {
            if value == "end" {
                current.is_complete = true;
            }
            return Some(current.clone());
        }
        _ => return None,
    }

    None
}

/// Check if FFmpeg is available.
pub fn check_ffmpeg() -> RenderResult<PathBuf> {
    which::which("ffmpeg").map_err(|_| RenderError::FfmpegNotFound)
}

/// Check if FFprobe is available.
pub fn check_ffprobe() -> RenderResult<PathBuf> {
    which::which("ffprobe").map_err(|_| RenderError::FfprobeNotFound)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_multi_input_ordering() {
        let cmd = FfmpegCommand::new("out.mp4")
            .input("source.mp4")
            .seek(10.0)
            .duration(30.0)
            .input("gradient.png")
            .filter_complex("[0:v][1:v]overlay[out]")
            .map("[out]");

        let args = cmd.build_args();
        let src_pos = args.iter().position(|a| a == "source.mp4").unwrap();
        let grad_pos = args.iter().position(|a| a == "gradient.png").unwrap();
        let ss_pos = args.iter().position(|a| a == "-ss").unwrap();

        assert!(ss_pos < src_pos, "-ss must precede its input");
        assert!(src_pos < grad_pos);
        assert!(args.contains(&"-filter_complex".to_string()));
        assert_eq!(args.last().unwrap(), "out.mp4");
    }

    #[test]
    fn test_seek_applies_to_last_input_only() {
        let cmd = FfmpegCommand::new("out.mp4")
            .input("a.mp4")
            .input("b.mp4")
            .seek(5.0);

        let args = cmd.build_args();
        let a_pos = args.iter().position(|a| a == "a.mp4").unwrap();
        let ss_pos = args.iter().position(|a| a == "-ss").unwrap();
        assert!(ss_pos > a_pos, "-ss belongs to the second input");
    }

    #[test]
    fn test_lavfi_input() {
        let cmd = FfmpegCommand::new("probe.mp4")
            .lavfi_input("color=black:s=320x240:d=0.5:r=24")
            .single_frame();
        let args = cmd.build_args();
        assert!(args.contains(&"lavfi".to_string()));
        assert!(args.contains(&"-frames:v".to_string()));
    }

    #[test]
    fn test_progress_parsing() {
        let mut progress = FfmpegProgress::default();

        assert!(parse_progress_line("out_time_ms=5000000", &mut progress).is_none());
        assert_eq!(progress.out_time_ms, 5000);

        parse_progress_line("speed=1.5x", &mut progress);
        assert!((progress.speed - 1.5).abs() < 0.01);

        let snapshot = parse_progress_line("progress=end", &mut progress);
        assert!(snapshot.is_some());
        assert!(progress.is_complete);
    }

    #[test]
    fn test_non_progress_line_ignored() {
        let mut progress = FfmpegProgress::default();
        assert!(parse_progress_line("random stderr noise", &mut progress).is_none());
        assert!(parse_progress_line("speed=N/A", &mut progress).is_none());
    }
}
