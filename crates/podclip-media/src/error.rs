//! Error types for the rendering pipeline.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for rendering operations.
pub type RenderResult<T> = Result<T, RenderError>;

/// Errors that can occur while rendering clips.
///
/// Anything recoverable at the clip level is converted to a
/// `ClipResult` with error status by the clip renderer; nothing here
/// crosses a batch boundary as an unhandled fault.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("FFmpeg not found in PATH")]
    FfmpegNotFound,

    #[error("FFprobe not found in PATH")]
    FfprobeNotFound,

    #[error("Invalid clip request: {0}")]
    Validation(String),

    #[error("Referenced asset not found: {0}")]
    AssetMissing(PathBuf),

    #[error("No usable video encoder (CPU fallback probe failed)")]
    EncoderUnavailable,

    #[error("No transcript words fall within the clip window")]
    EmptyTranscript,

    #[error("Face detection unavailable: {0}")]
    FaceDetectionUnavailable(String),

    #[error("Encode failed: {message}")]
    EncodeFailed {
        message: String,
        stderr: Option<String>,
        exit_code: Option<i32>,
    },

    #[error("Encode timed out after {0} seconds")]
    EncodeTimeout(u64),

    #[error("Render cancelled")]
    Cancelled,

    #[error("Invalid video file: {0}")]
    InvalidVideo(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

impl RenderError {
    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create an encode failure with optional stderr context.
    pub fn encode_failed(
        message: impl Into<String>,
        stderr: Option<String>,
        exit_code: Option<i32>,
    ) -> Self {
        Self::EncodeFailed {
            message: message.into(),
            stderr,
            exit_code,
        }
    }

    /// Whether this failure should stop the whole batch. Only a missing
    /// toolchain or a dead CPU fallback qualifies; everything else is a
    /// per-clip outcome.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::FfmpegNotFound | Self::FfprobeNotFound | Self::EncoderUnavailable
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        assert!(RenderError::EncoderUnavailable.is_fatal());
        assert!(RenderError::FfmpegNotFound.is_fatal());
        assert!(!RenderError::validation("end before start").is_fatal());
        assert!(!RenderError::EncodeTimeout(600).is_fatal());
        assert!(!RenderError::EmptyTranscript.is_fatal());
    }
}
