//! Filesystem utilities: safe output naming and cross-device moves.

use std::path::{Path, PathBuf};

use regex::Regex;
use tokio::fs;

use crate::error::{RenderError, RenderResult};

/// Sanitize a clip title into a filename stem: alphanumerics, dashes,
/// underscores; spaces collapse to underscores; capped at 50 chars.
pub fn sanitize_title(title: &str) -> String {
    let allowed = Regex::new(r"[^A-Za-z0-9\-_ ]").expect("static pattern");
    let cleaned = allowed.replace_all(title, "");
    let stem: String = cleaned.trim().replace(' ', "_").chars().take(50).collect();
    if stem.is_empty() {
        "clip".to_string()
    } else {
        stem
    }
}

/// Build a collision-safe output path `<dir>/<title>_short.mp4`,
/// appending `_2`, `_3`, ... while a file already exists.
pub fn collision_safe_path(dir: &Path, title: &str) -> PathBuf {
    let stem = sanitize_title(title);
    let base = dir.join(format!("{}_short.mp4", stem));
    if !base.exists() {
        return base;
    }
    for n in 2.. {
        let candidate = dir.join(format!("{}_short_{}.mp4", stem, n));
        if !candidate.exists() {
            return candidate;
        }
    }
    unreachable!()
}

/// Move a file, falling back to copy+delete for cross-device moves.
///
/// The copy lands in a temp file next to the destination first, then
/// renames into place, so a crash never leaves a half-copied file
/// under the final name.
pub async fn move_file(src: impl AsRef<Path>, dst: impl AsRef<Path>) -> RenderResult<()> {
    let src = src.as_ref();
    let dst = dst.as_ref();

    if let Some(parent) = dst.parent() {
        if !parent.exists() {
            fs::create_dir_all(parent).await?;
        }
    }

    match fs::rename(src, dst).await {
        Ok(()) => Ok(()),
        Err(e) if is_cross_device_error(&e) => {
            tracing::debug!(
                "Cross-device rename, copying instead: {} -> {}",
                src.display(),
                dst.display()
            );
            copy_and_delete(src, dst).await
        }
        Err(e) => Err(RenderError::from(e)),
    }
}

/// EXDEV: rename across filesystems.
fn is_cross_device_error(e: &std::io::Error) -> bool {
    e.raw_os_error() == Some(18)
}

async fn copy_and_delete(src: &Path, dst: &Path) -> RenderResult<()> {
    let tmp_dst = dst.with_extension("tmp");

    fs::copy(src, &tmp_dst).await?;

    if let Err(e) = fs::rename(&tmp_dst, dst).await {
        let _ = std::fs::remove_file(&tmp_dst);
        return Err(RenderError::from(e));
    }

    if let Err(e) = fs::remove_file(src).await {
        tracing::warn!(
            "Failed to remove source after cross-device move {}: {}",
            src.display(),
            e
        );
    }
    Ok(())
}
