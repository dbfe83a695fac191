//! Batch rendering: sequential fan-out with per-clip fault isolation.
//!
//! Clips are rendered one at a time; hardware encoders only sustain a
//! single efficient session, so parallel encodes either serialize in
//! the driver or degrade every stream. One bad request never aborts
//! the rest of the batch.

use tracing::{info, warn};

use podclip_models::{BatchReport, ClipRequest, ClipResult, WordTimestamp};

use crate::error::RenderResult;
use crate::render::{ClipRenderer, RenderProgress};

/// Renders a list of clip requests against one shared transcript.
pub struct BatchRenderer {
    renderer: ClipRenderer,
}

impl BatchRenderer {
    pub fn new(renderer: ClipRenderer) -> Self {
        Self { renderer }
    }

    /// Render all requests, producing one result per request in input
    /// order. Only fatal environment failures (missing toolchain, no
    /// encoder at all) abort the batch.
    pub async fn render_all(
        &self,
        requests: &[ClipRequest],
        words: &[WordTimestamp],
    ) -> RenderResult<BatchReport> {
        self.render_all_with_progress(requests, words, |_, _, _| {})
            .await
    }

    /// Render all requests with per-clip progress callbacks:
    /// `(clip_index, percent, message)`.
    pub async fn render_all_with_progress<F>(
        &self,
        requests: &[ClipRequest],
        words: &[WordTimestamp],
        progress: F,
    ) -> RenderResult<BatchReport>
    where
        F: Fn(usize, u8, &str) + Send + Sync + 'static,
    {
        let progress = std::sync::Arc::new(progress);
        let mut results: Vec<ClipResult> = Vec::with_capacity(requests.len());

        for (index, request) in requests.iter().enumerate() {
            info!(
                clip = index + 1,
                total = requests.len(),
                title = %request.title,
                "Processing batch clip"
            );

            let clip_progress: RenderProgress = {
                let progress = std::sync::Arc::clone(&progress);
                std::sync::Arc::new(move |pct: u8, msg: &str| progress(index, pct, msg))
            };

            let result = match self
                .renderer
                .render_with_progress(request, words, clip_progress)
                .await
            {
                Ok(result) => result,
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    warn!(clip = index + 1, "Request rejected: {}", e);
                    ClipResult::failure(e.to_string())
                }
            };
            results.push(result);
        }

        let report = BatchReport::new(results);
        info!(
            issued = report.total_requested,
            succeeded = report.total_succeeded,
            "Batch complete"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RenderConfig;
    use podclip_models::{CaptionStyle, ClipStatus, CropStrategy};
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn batch(dir: &TempDir) -> BatchRenderer {
        BatchRenderer::new(ClipRenderer::new(
            RenderConfig::default().with_output_dir(dir.path().join("out")),
        ))
    }

    fn bad_request(kind: usize) -> ClipRequest {
        let (start, end, source) = match kind {
            // Reversed range
            0 => (40.0, 10.0, PathBuf::from("/tmp/whatever.mp4")),
            // Over the duration cap
            1 => (0.0, 500.0, PathBuf::from("/tmp/whatever.mp4")),
            // Missing source
            _ => (0.0, 30.0, PathBuf::from("/definitely/missing.mp4")),
        };
        ClipRequest {
            source_path: source,
            start_second: start,
            end_second: end,
            caption_style: CaptionStyle::Subtle,
            crop_strategy: CropStrategy::Center,
            title: format!("bad_{}", kind),
            logo_path: None,
            outro_path: None,
            clean_fillers: true,
        }
    }

    #[tokio::test]
    async fn test_batch_is_never_short_circuited() {
        let dir = TempDir::new().unwrap();
        let requests: Vec<ClipRequest> = (0..3).map(bad_request).collect();

        let report = batch(&dir).render_all(&requests, &[]).await.unwrap();

        // Every request produced a result, in order, all failed for
        // their own reason
        assert_eq!(report.results.len(), 3);
        assert_eq!(report.total_requested, 3);
        assert_eq!(report.total_succeeded, 0);
        for result in &report.results {
            assert_eq!(result.status, ClipStatus::Error);
            assert!(result.error_message.is_some());
        }
        // Distinct failure reasons prove each clip was processed
        // individually rather than one error being cloned
        assert_ne!(
            report.results[0].error_message,
            report.results[1].error_message
        );
        assert_ne!(
            report.results[1].error_message,
            report.results[2].error_message
        );
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let dir = TempDir::new().unwrap();
        let report = batch(&dir).render_all(&[], &[]).await.unwrap();
        assert_eq!(report.total_requested, 0);
        assert_eq!(report.total_succeeded, 0);
    }
}
