//! Shared data models for the podclip rendering pipeline.
//!
//! This crate provides Serde-serializable types for:
//! - Word-level transcript timestamps
//! - Clip requests, results, and batch reports
//! - Caption styles and crop strategies
//! - Crop windows and tracked keyframes
//! - Timestamp formatting for FFmpeg and ASS subtitles

pub mod rect;
pub mod request;
pub mod style;
pub mod timestamp;
pub mod word;

// Re-export common types
pub use rect::{CropKeyframe, CropWindow};
pub use request::{BatchReport, ClipRequest, ClipResult, ClipStatus};
pub use style::{AspectRatio, CaptionStyle, CropStrategy, StyleParseError};
pub use timestamp::{format_seconds, seconds_to_ass};
pub use word::WordTimestamp;
