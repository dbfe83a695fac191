//! Clip request, result, and batch report models.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{CaptionStyle, CropStrategy};

/// A request to render one short-form clip from a source recording.
///
/// Invariants (`end_second > start_second`, duration within the
/// configured maximum, referenced assets exist) are enforced by the
/// renderer's validation step before any encoder work starts.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ClipRequest {
    /// Path to the source recording
    pub source_path: PathBuf,
    /// Clip start, seconds into the source
    pub start_second: f64,
    /// Clip end, seconds into the source
    pub end_second: f64,
    #[serde(default)]
    pub caption_style: CaptionStyle,
    #[serde(default)]
    pub crop_strategy: CropStrategy,
    /// Title used to derive the output filename
    #[serde(default = "default_title")]
    pub title: String,
    /// Logo image composited top-left (branded style)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo_path: Option<PathBuf>,
    /// Outro video concatenated after the main segment
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outro_path: Option<PathBuf>,
    /// Drop filler words from caption text (timing is preserved)
    #[serde(default = "default_clean_fillers")]
    pub clean_fillers: bool,
}

fn default_title() -> String {
    "clip".to_string()
}

fn default_clean_fillers() -> bool {
    true
}

impl ClipRequest {
    /// Requested clip duration in seconds. May be non-positive for a
    /// malformed request; validation rejects those.
    pub fn duration(&self) -> f64 {
        self.end_second - self.start_second
    }
}

/// Outcome status of a single clip render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ClipStatus {
    Success,
    Error,
}

/// Result of rendering one clip. Exactly one of these is produced per
/// requested clip; a failure never propagates past the clip boundary.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ClipResult {
    pub status: ClipStatus,
    /// Final output location (success only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_path: Option<PathBuf>,
    /// Rendered duration in seconds (success only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    /// Output size in megabytes (success only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_size_mb: Option<f64>,
    /// Human-readable failure reason (error only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Non-fatal degradations (e.g. face tracking fell back to center)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    pub completed_at: DateTime<Utc>,
}

impl ClipResult {
    /// Build a success result.
    pub fn success(output_path: PathBuf, duration: f64, file_size_mb: f64) -> Self {
        Self {
            status: ClipStatus::Success,
            output_path: Some(output_path),
            duration: Some(duration),
            file_size_mb: Some(file_size_mb),
            error_message: None,
            warnings: Vec::new(),
            completed_at: Utc::now(),
        }
    }

    /// Build an error result with a human-readable reason.
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            status: ClipStatus::Error,
            output_path: None,
            duration: None,
            file_size_mb: None,
            error_message: Some(message.into()),
            warnings: Vec::new(),
            completed_at: Utc::now(),
        }
    }

    /// Attach non-fatal warnings.
    pub fn with_warnings(mut self, warnings: Vec<String>) -> Self {
        self.warnings = warnings;
        self
    }

    pub fn is_success(&self) -> bool {
        self.status == ClipStatus::Success
    }
}

/// Summary of a batch render: one result per request, input order.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct BatchReport {
    pub total_requested: usize,
    pub total_succeeded: usize,
    pub results: Vec<ClipResult>,
}

impl BatchReport {
    pub fn new(results: Vec<ClipResult>) -> Self {
        let total_requested = results.len();
        let total_succeeded = results.iter().filter(|r| r.is_success()).count();
        Self {
            total_requested,
            total_succeeded,
            results,
        }
    }
}
