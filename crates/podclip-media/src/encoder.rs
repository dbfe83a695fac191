//! Hardware encoder detection.
//!
//! Probes the host for a usable H.264 encoder in priority order:
//! platform-native hardware first, then generic acceleration APIs,
//! then `libx264` as the universal CPU fallback. Each candidate is
//! validated with a trivial half-second test encode; failure means
//! "unavailable", not an error. The selected profile is memoized for
//! the process lifetime, so concurrent first callers probe once and
//! no caller branches on encoder kind afterwards.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use crate::command::FfmpegCommand;
use crate::error::{RenderError, RenderResult};

/// Probe encode timeout. Hardware encoders that hang are treated as
/// unavailable rather than blocking detection.
const PROBE_TIMEOUT: Duration = Duration::from_secs(15);

/// Minimum probe output size for a candidate to count as working.
const PROBE_MIN_BYTES: u64 = 100;

static DETECTED: OnceCell<EncoderProfile> = OnceCell::const_new();

/// A video encoder backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EncoderKind {
    /// macOS media acceleration
    VideoToolbox,
    /// NVIDIA GPU encoder
    Nvenc,
    /// AMD GPU encoder (Windows)
    Amf,
    /// Intel Quick Sync
    Qsv,
    /// Generic Linux video acceleration API
    Vaapi,
    /// Software x264, always available
    Cpu,
}

impl EncoderKind {
    /// FFmpeg codec name for this backend.
    pub fn codec_name(&self) -> &'static str {
        match self {
            EncoderKind::VideoToolbox => "h264_videotoolbox",
            EncoderKind::Nvenc => "h264_nvenc",
            EncoderKind::Amf => "h264_amf",
            EncoderKind::Qsv => "h264_qsv",
            EncoderKind::Vaapi => "h264_vaapi",
            EncoderKind::Cpu => "libx264",
        }
    }

    /// Candidate chain for the current platform, best first. Always
    /// ends with `Cpu`.
    pub fn candidate_chain() -> Vec<EncoderKind> {
        let mut chain = if cfg!(target_os = "macos") {
            vec![EncoderKind::VideoToolbox]
        } else if cfg!(target_os = "windows") {
            vec![EncoderKind::Nvenc, EncoderKind::Amf, EncoderKind::Qsv]
        } else {
            vec![EncoderKind::Nvenc, EncoderKind::Vaapi]
        };
        chain.push(EncoderKind::Cpu);
        chain
    }
}

/// A detected encoder and the exact output flags it needs.
///
/// Rate-control flags differ per backend (`-crf` vs `-cq` vs `-qp`),
/// so callers append `codec_args` verbatim instead of branching.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncoderProfile {
    pub kind: EncoderKind,
    pub codec_args: Vec<String>,
}

impl EncoderProfile {
    /// Build the profile for a backend with its tuned flag set.
    pub fn for_kind(kind: EncoderKind) -> Self {
        let codec_args: Vec<&str> = match kind {
            EncoderKind::VideoToolbox => vec![
                "-c:v",
                "h264_videotoolbox",
                "-b:v",
                "12M",
                "-profile:v",
                "high",
                "-allow_sw",
                "1",
            ],
            EncoderKind::Nvenc => vec![
                "-c:v",
                "h264_nvenc",
                "-preset",
                "p6",
                "-cq",
                "18",
                "-profile:v",
                "high",
            ],
            EncoderKind::Amf => vec![
                "-c:v", "h264_amf", "-quality", "quality", "-rc", "cqp", "-qp_i", "18", "-qp_p",
                "18",
            ],
            EncoderKind::Qsv => vec!["-c:v", "h264_qsv", "-preset", "slow", "-global_quality", "18"],
            EncoderKind::Vaapi => vec!["-c:v", "h264_vaapi", "-qp", "18"],
            EncoderKind::Cpu => vec![
                "-c:v",
                "libx264",
                "-crf",
                "18",
                "-preset",
                "slow",
                "-profile:v",
                "high",
            ],
        };
        Self {
            kind,
            codec_args: codec_args.into_iter().map(String::from).collect(),
        }
    }

    /// The guaranteed software profile.
    pub fn cpu() -> Self {
        Self::for_kind(EncoderKind::Cpu)
    }

    pub fn is_hardware(&self) -> bool {
        self.kind != EncoderKind::Cpu
    }
}

/// Detect the best available encoder, probing once per process.
///
/// Concurrent first callers share a single probe pass; later callers
/// get the cached profile. Only a missing/broken `libx264` makes this
/// fail, surfaced as `EncoderUnavailable`.
pub async fn detect() -> RenderResult<&'static EncoderProfile> {
    DETECTED.get_or_try_init(probe_chain).await
}

/// Probe the platform candidate chain, returning the first working
/// profile. Uncached; prefer [`detect`].
pub async fn probe_chain() -> RenderResult<EncoderProfile> {
    for kind in EncoderKind::candidate_chain() {
        let profile = EncoderProfile::for_kind(kind);
        if try_probe(&profile).await {
            info!(encoder = profile.kind.codec_name(), "Selected video encoder");
            return Ok(profile);
        }
        debug!(
            encoder = profile.kind.codec_name(),
            "Encoder candidate unavailable"
        );
    }
    // Unreachable in practice: the chain ends with libx264, which only
    // fails when the ffmpeg install itself is broken.
    warn!("All encoder candidates failed, including libx264");
    Err(RenderError::EncoderUnavailable)
}

/// Validate a candidate by encoding a trivial test pattern to a temp
/// file. Some hardware encoders accept `-f null` output and then fail
/// on real files, so a real container write is required.
async fn try_probe(profile: &EncoderProfile) -> bool {
    let Ok(dir) = tempfile::tempdir() else {
        return false;
    };
    let out = dir.path().join("probe.mp4");

    let cmd = FfmpegCommand::new(&out)
        .lavfi_input("color=black:s=320x240:d=0.5:r=24")
        .lavfi_input("anullsrc=r=44100:cl=mono")
        .duration(0.5)
        .output_args(profile.codec_args.clone())
        .audio_codec("aac")
        .output_arg("-shortest");

    let runner = crate::command::FfmpegRunner::new().with_timeout(PROBE_TIMEOUT.as_secs());
    let run = runner.run(&cmd);

    match run.await {
        Ok(()) => tokio::fs::metadata(&out)
            .await
            .map(|m| m.len() > PROBE_MIN_BYTES)
            .unwrap_or(false),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_ends_with_cpu() {
        let chain = EncoderKind::candidate_chain();
        assert_eq!(*chain.last().unwrap(), EncoderKind::Cpu);
        let cpus = chain.iter().filter(|k| **k == EncoderKind::Cpu).count();
        assert_eq!(cpus, 1);
    }

    #[test]
    fn test_cpu_profile_flags() {
        let profile = EncoderProfile::cpu();
        assert!(!profile.is_hardware());
        assert!(profile.codec_args.contains(&"libx264".to_string()));
        assert!(profile.codec_args.contains(&"-crf".to_string()));
        // No hardware rate-control flags on the CPU profile
        assert!(!profile.codec_args.contains(&"-cq".to_string()));
        assert!(!profile.codec_args.contains(&"-qp".to_string()));
    }

    #[test]
    fn test_nvenc_uses_cq_not_crf() {
        let profile = EncoderProfile::for_kind(EncoderKind::Nvenc);
        assert!(profile.is_hardware());
        assert!(profile.codec_args.contains(&"-cq".to_string()));
        assert!(!profile.codec_args.contains(&"-crf".to_string()));
    }

    #[test]
    fn test_codec_names() {
        assert_eq!(EncoderKind::VideoToolbox.codec_name(), "h264_videotoolbox");
        assert_eq!(EncoderKind::Vaapi.codec_name(), "h264_vaapi");
        assert_eq!(EncoderKind::Cpu.codec_name(), "libx264");
    }
}
