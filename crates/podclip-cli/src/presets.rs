//! Named render presets.
//!
//! Saved as JSON under `$PODCLIP_HOME/presets` (default
//! `~/.podclip/presets`) so callers don't re-send full configuration
//! per episode. Loading merges saved keys over the defaults, so
//! presets written by older versions keep working as fields are added.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use podclip_models::{CaptionStyle, CropStrategy};

/// A saved configuration bundle.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Preset {
    pub caption_style: CaptionStyle,
    pub crop_strategy: CropStrategy,
    /// Global caption timing offset in seconds
    pub time_adjust: f64,
    pub logo_path: Option<PathBuf>,
    pub outro_path: Option<PathBuf>,
    pub clean_fillers: bool,
    pub target_lufs: f64,
    pub max_clip_duration: f64,
}

impl Default for Preset {
    fn default() -> Self {
        Self {
            caption_style: CaptionStyle::Branded,
            crop_strategy: CropStrategy::Center,
            time_adjust: -1.0,
            logo_path: None,
            outro_path: None,
            clean_fillers: true,
            target_lufs: -14.0,
            max_clip_duration: 90.0,
        }
    }
}

/// Directory presets are stored in.
pub fn presets_dir() -> PathBuf {
    let home = std::env::var("PODCLIP_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            std::env::var("HOME")
                .map(|h| PathBuf::from(h).join(".podclip"))
                .unwrap_or_else(|_| PathBuf::from(".podclip"))
        });
    home.join("presets")
}

/// List all saved presets by name.
pub fn list_presets() -> Vec<String> {
    let dir = presets_dir();
    let Ok(entries) = std::fs::read_dir(&dir) else {
        return Vec::new();
    };
    let mut names: Vec<String> = entries
        .flatten()
        .filter_map(|e| {
            let name = e.file_name().to_string_lossy().to_string();
            name.strip_suffix(".json").map(str::to_string)
        })
        .collect();
    names.sort();
    names
}

/// Load a preset by name. `default` always resolves, even unsaved.
pub fn get_preset(name: &str) -> anyhow::Result<Preset> {
    let path = presets_dir().join(format!("{}.json", name));
    if !path.exists() {
        if name == "default" {
            return Ok(Preset::default());
        }
        anyhow::bail!("preset not found: {}", name);
    }
    // `#[serde(default)]` fills anything the saved file predates
    let raw = std::fs::read_to_string(&path)?;
    Ok(serde_json::from_str(&raw)?)
}

/// Save a preset, creating the presets directory if needed.
pub fn save_preset(name: &str, preset: &Preset) -> anyhow::Result<PathBuf> {
    let dir = presets_dir();
    std::fs::create_dir_all(&dir)?;
    let path = dir.join(format!("{}.json", name));
    std::fs::write(&path, serde_json::to_string_pretty(preset)?)?;
    Ok(path)
}

/// Delete a preset. Returns whether it existed.
pub fn delete_preset(name: &str) -> anyhow::Result<bool> {
    let path = presets_dir().join(format!("{}.json", name));
    if path.exists() {
        std::fs::remove_file(&path)?;
        Ok(true)
    } else {
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_preset() {
        let preset = Preset::default();
        assert_eq!(preset.caption_style, CaptionStyle::Branded);
        assert!((preset.target_lufs - -14.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_partial_json_merges_over_defaults() {
        let preset: Preset =
            serde_json::from_str(r#"{"caption_style":"karaoke","time_adjust":0.0}"#).unwrap();
        assert_eq!(preset.caption_style, CaptionStyle::Karaoke);
        assert!((preset.time_adjust - 0.0).abs() < f64::EPSILON);
        // Unset fields come from defaults
        assert!(preset.clean_fillers);
        assert!((preset.max_clip_duration - 90.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_unknown_keys_ignored() {
        let preset: Preset =
            serde_json::from_str(r#"{"caption_style":"subtle","whisper_model":"base"}"#).unwrap();
        assert_eq!(preset.caption_style, CaptionStyle::Subtle);
    }

    #[test]
    fn test_save_load_roundtrip() {
        let dir = tempfile::TempDir::new().unwrap();
        std::env::set_var("PODCLIP_HOME", dir.path());

        let mut preset = Preset::default();
        preset.caption_style = CaptionStyle::Hormozi;
        save_preset("episode42", &preset).unwrap();

        let loaded = get_preset("episode42").unwrap();
        assert_eq!(loaded.caption_style, CaptionStyle::Hormozi);
        assert!(list_presets().contains(&"episode42".to_string()));
        assert!(delete_preset("episode42").unwrap());
        assert!(!delete_preset("episode42").unwrap());

        std::env::remove_var("PODCLIP_HOME");
    }
}
