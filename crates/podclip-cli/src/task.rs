//! JSON task protocol.
//!
//! One task request arrives as a JSON document on stdin; progress
//! events stream to stderr and the terminal result goes to stdout, so
//! a supervising process can multiplex both without parsing logs.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use podclip_models::{ClipRequest, WordTimestamp};

/// An incoming task.
#[derive(Debug, Clone, Deserialize)]
pub struct TaskRequest {
    #[serde(default = "random_task_id")]
    pub task_id: String,
    pub task_type: TaskType,
    #[serde(default)]
    pub params: Value,
}

fn random_task_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    /// Health check
    Ping,
    /// Render one clip
    CreateClip,
    /// Render a list of clips sequentially
    BatchClips,
    /// Score segments by audio energy
    AnalyzeEnergy,
    /// Report the detected encoder profile
    EncoderInfo,
}

/// Parameters for `create_clip`.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateClipParams {
    #[serde(flatten)]
    pub request: ClipRequest,
    #[serde(default)]
    pub transcript_words: Vec<WordTimestamp>,
    #[serde(default)]
    pub output_dir: Option<String>,
    #[serde(default)]
    pub preset: Option<String>,
}

/// Parameters for `batch_clips`.
#[derive(Debug, Clone, Deserialize)]
pub struct BatchClipsParams {
    pub clips: Vec<ClipRequest>,
    #[serde(default)]
    pub transcript_words: Vec<WordTimestamp>,
    #[serde(default)]
    pub output_dir: Option<String>,
    #[serde(default)]
    pub preset: Option<String>,
}

/// Parameters for `analyze_energy`.
#[derive(Debug, Clone, Deserialize)]
pub struct AnalyzeEnergyParams {
    pub source_path: String,
    pub segments: Vec<(f64, f64)>,
}

/// A progress event, one JSON object per stderr line.
#[derive(Debug, Clone, Serialize)]
pub struct ProgressEvent {
    pub task_id: String,
    pub stage: String,
    pub percent: u8,
    pub message: String,
}

/// The terminal result written to stdout.
#[derive(Debug, Clone, Serialize)]
pub struct TaskResult {
    pub task_id: String,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TaskResult {
    pub fn success(task_id: impl Into<String>, data: Value) -> Self {
        Self {
            task_id: task_id.into(),
            status: "success",
            data: Some(data),
            error: None,
        }
    }

    pub fn error(task_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
            status: "error",
            data: None,
            error: Some(message.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_request_parses_with_defaults() {
        let req: TaskRequest =
            serde_json::from_str(r#"{"task_type":"ping"}"#).unwrap();
        assert_eq!(req.task_type, TaskType::Ping);
        assert!(!req.task_id.is_empty());
    }

    #[test]
    fn test_create_clip_params_flatten() {
        let params: CreateClipParams = serde_json::from_value(serde_json::json!({
            "source_path": "/media/episode.mp4",
            "start_second": 12.0,
            "end_second": 42.0,
            "caption_style": "branded",
            "title": "Best moment",
            "transcript_words": [
                {"word": "hello", "start": 13.0, "end": 13.4}
            ]
        }))
        .unwrap();
        assert_eq!(params.request.title, "Best moment");
        assert_eq!(params.transcript_words.len(), 1);
        assert!(params.output_dir.is_none());
    }

    #[test]
    fn test_result_serialization_shape() {
        let ok = TaskResult::success("t1", serde_json::json!({"n": 1}));
        let json = serde_json::to_string(&ok).unwrap();
        assert!(json.contains(r#""status":"success""#));
        assert!(!json.contains("error"));

        let err = TaskResult::error("t2", "boom");
        let json = serde_json::to_string(&err).unwrap();
        assert!(json.contains(r#""status":"error""#));
        assert!(!json.contains("data"));
    }
}
