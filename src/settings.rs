//! Persistence model and configuration IO.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// File name used under the data directory.
const SETTINGS_FILE: &str = "settings.json";
/// Machine-wide data directory name under `%PROGRAMDATA%`.
#[cfg_attr(not(windows), allow(dead_code))]
const PROGRAM_DATA_DIR: &str = "BgStatusService";

/// Settings persisted to `settings.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Monospace font file; system fonts are searched when unset.
    pub font_path: Option<PathBuf>,
    /// JPEG quality of the rendered login image.
    pub jpeg_quality: u8,
    /// Canvas width when no background can be found.
    pub fallback_width: u32,
    /// Canvas height when no background can be found.
    pub fallback_height: u32,
    /// Smallest Spotlight asset considered a wallpaper.
    pub spotlight_min_bytes: u64,
    /// Restart LogonUI after a boot-time update.
    pub restart_logonui_on_boot: bool,
    /// Additional service names listed under "Critical Services".
    pub extra_critical_services: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            font_path: None,
            jpeg_quality: crate::image_ops::OUTPUT_JPEG_QUALITY,
            fallback_width: crate::display::FALLBACK_RESOLUTION.0,
            fallback_height: crate::display::FALLBACK_RESOLUTION.1,
            spotlight_min_bytes: 100_000,
            restart_logonui_on_boot: true,
            extra_critical_services: Vec::new(),
        }
    }
}

impl Settings {
    pub fn fallback_size(&self) -> (u32, u32) {
        (self.fallback_width.max(1), self.fallback_height.max(1))
    }

    /// Quality clamped to the range the JPEG encoder accepts.
    pub fn quality(&self) -> u8 {
        self.jpeg_quality.clamp(1, 100)
    }
}

/// Default data directory: `%PROGRAMDATA%\BgStatusService` on Windows, the
/// per-user data directory elsewhere.
pub fn data_dir() -> Result<PathBuf> {
    #[cfg(windows)]
    {
        if let Some(program_data) = std::env::var_os("PROGRAMDATA") {
            return Ok(PathBuf::from(program_data).join(PROGRAM_DATA_DIR));
        }
    }
    let proj_dirs = ProjectDirs::from("dev", "bgstatus", "bgstatus")
        .ok_or_else(|| anyhow!("cannot determine data directory"))?;
    Ok(proj_dirs.data_dir().to_path_buf())
}

pub fn settings_path(dir: &Path) -> PathBuf {
    dir.join(SETTINGS_FILE)
}

/// Load settings from `dir`, returning defaults when missing or invalid.
pub fn load(dir: &Path) -> Settings {
    let path = settings_path(dir);
    let contents = match fs::read_to_string(&path) {
        Ok(contents) => contents,
        Err(_) => return Settings::default(),
    };
    match serde_json::from_str(&contents) {
        Ok(settings) => settings,
        Err(err) => {
            warn!(path = %path.display(), error = %err, "ignoring invalid settings file");
            Settings::default()
        }
    }
}

/// Persist settings to `dir` as pretty JSON.
pub fn save(dir: &Path, settings: &Settings) -> Result<()> {
    fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))?;
    let contents = serde_json::to_string_pretty(settings)?;
    let path = settings_path(dir);
    fs::write(&path, contents).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

/// Rewrite the settings file with every key present, keeping values already
/// set. Returns the effective settings and the file written.
pub fn materialize(dir: &Path) -> Result<(Settings, PathBuf)> {
    let settings = load(dir);
    save(dir, &settings)?;
    Ok((settings, settings_path(dir)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempdir().unwrap();
        let settings = load(dir.path());
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.jpeg_quality, 95);
        assert_eq!(settings.fallback_size(), (1920, 1080));
        assert!(settings.restart_logonui_on_boot);
    }

    #[test]
    fn save_then_load() {
        let dir = tempdir().unwrap();
        let settings = Settings {
            font_path: Some(PathBuf::from(r"C:\Fonts\JetBrainsMono-Regular.ttf")),
            extra_critical_services: vec!["Tailscale".into()],
            ..Settings::default()
        };
        save(&dir.path().join("nested"), &settings).unwrap();
        assert_eq!(load(&dir.path().join("nested")), settings);
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempdir().unwrap();
        fs::write(settings_path(dir.path()), r#"{ "jpeg_quality": 80 }"#).unwrap();
        let settings = load(dir.path());
        assert_eq!(settings.jpeg_quality, 80);
        assert_eq!(settings.spotlight_min_bytes, 100_000);
    }

    #[test]
    fn invalid_file_yields_defaults() {
        let dir = tempdir().unwrap();
        fs::write(settings_path(dir.path()), "{ not json").unwrap();
        assert_eq!(load(dir.path()), Settings::default());
    }

    #[test]
    fn quality_is_clamped() {
        let settings = Settings {
            jpeg_quality: 0,
            ..Settings::default()
        };
        assert_eq!(settings.quality(), 1);
    }

    #[test]
    fn materialize_fills_missing_keys_and_keeps_values() {
        let dir = tempdir().unwrap();
        fs::write(settings_path(dir.path()), r#"{ "jpeg_quality": 80 }"#).unwrap();

        let (settings, path) = materialize(dir.path()).unwrap();
        assert_eq!(path, settings_path(dir.path()));
        assert_eq!(settings.jpeg_quality, 80);

        let written: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["jpeg_quality"], 80);
        assert_eq!(written["spotlight_min_bytes"], 100_000);
        assert_eq!(written["restart_logonui_on_boot"], true);
        assert_eq!(load(dir.path()), settings);
    }

    #[test]
    fn materialize_creates_the_data_dir() {
        let dir = tempdir().unwrap();
        let data = dir.path().join("BgStatusService");
        let (settings, path) = materialize(&data).unwrap();
        assert_eq!(settings, Settings::default());
        assert!(path.is_file());
    }
}
