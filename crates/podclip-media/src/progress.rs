//! FFmpeg progress reporting.

/// Progress snapshot parsed from FFmpeg's `-progress pipe:2` output.
#[derive(Debug, Clone, Default)]
pub struct FfmpegProgress {
    /// Output timestamp in milliseconds
    pub out_time_ms: i64,
    /// Output timestamp as HH:MM:SS.microseconds
    pub out_time: String,
    /// Frames encoded so far
    pub frame: u64,
    /// Current encoding fps
    pub fps: f64,
    /// Encoding speed relative to realtime (1.0 = realtime)
    pub speed: f64,
    /// Whether encoding is complete
    pub is_complete: bool,
}

impl FfmpegProgress {
    /// Percent complete against a known total duration, clamped to 100.
    pub fn percent_of(&self, total_secs: f64) -> u8 {
        if total_secs <= 0.0 {
            return 0;
        }
        let done = self.out_time_ms as f64 / 1000.0;
        ((done / total_secs) * 100.0).clamp(0.0, 100.0) as u8
    }
}

/// Callback invoked with each parsed progress snapshot.
pub type ProgressCallback = Box<dyn Fn(FfmpegProgress) + Send + Sync>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percent_of() {
        let progress = FfmpegProgress {
            out_time_ms: 15_000,
            ..Default::default()
        };
        assert_eq!(progress.percent_of(30.0), 50);
        assert_eq!(progress.percent_of(0.0), 0);
        assert_eq!(progress.percent_of(10.0), 100);
    }
}
