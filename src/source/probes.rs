//! Places Windows keeps the current login background.

use std::path::{Path, PathBuf};

use anyhow::Result;
use walkdir::WalkDir;

use super::Probe;

/// Policy key holding an administrator-chosen lock screen image.
pub const POLICY_KEY: &str = r"SOFTWARE\Policies\Microsoft\Windows\Personalization";
pub const POLICY_VALUE: &str = "LockScreenImage";
/// Configuration Service Provider key for personalization.
pub const CSP_KEY: &str = r"SOFTWARE\Microsoft\Windows\CurrentVersion\PersonalizationCSP";
pub const CSP_PATH_VALUE: &str = "LockScreenImagePath";
/// Spotlight asset cache, relative to `%LOCALAPPDATA%`.
pub const SPOTLIGHT_ASSETS: &str =
    r"Packages\Microsoft.Windows.ContentDeliveryManager_cw5n1h2txyewy\LocalState\Assets";

/// `%SystemRoot%\System32\oobe\info\backgrounds`.
pub fn oobe_backgrounds_dir() -> Option<PathBuf> {
    let root = std::env::var_os("SystemRoot")?;
    Some(
        PathBuf::from(root)
            .join("System32")
            .join("oobe")
            .join("info")
            .join("backgrounds"),
    )
}

/// The probes in priority order.
pub fn default_probes(spotlight_min_bytes: u64) -> Vec<Probe> {
    let mut probes = Vec::new();
    #[cfg(windows)]
    probes.push(Probe::new("policy registry", || {
        registry::hklm_path(POLICY_KEY, POLICY_VALUE)
    }));
    probes.push(Probe::new("oobe default", || {
        Ok(oobe_backgrounds_dir().map(|dir| dir.join("backgroundDefault.jpg")))
    }));
    #[cfg(windows)]
    probes.push(Probe::new("csp registry", || {
        registry::hklm_path(CSP_KEY, CSP_PATH_VALUE)
    }));
    probes.push(Probe::new("spotlight cache", move || {
        let Some(local) = std::env::var_os("LOCALAPPDATA") else {
            return Ok(None);
        };
        largest_file(&PathBuf::from(local).join(SPOTLIGHT_ASSETS), spotlight_min_bytes)
    }));
    probes
}

/// Largest regular file directly inside `dir`, if it is strictly bigger than
/// `min_bytes`. Spotlight stores landscape wallpapers alongside thumbnails
/// and icons; size is the only reliable way to tell them apart.
pub fn largest_file(dir: &Path, min_bytes: u64) -> Result<Option<PathBuf>> {
    if !dir.is_dir() {
        return Ok(None);
    }
    let mut largest: Option<(u64, PathBuf)> = None;
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let Ok(entry) = entry else { continue };
        if !entry.file_type().is_file() {
            continue;
        }
        let Ok(meta) = entry.metadata() else { continue };
        if largest.as_ref().is_none_or(|(size, _)| meta.len() > *size) {
            largest = Some((meta.len(), entry.into_path()));
        }
    }
    Ok(largest
        .filter(|(size, _)| *size > min_bytes)
        .map(|(_, path)| path))
}

#[cfg(windows)]
mod registry {
    use std::io;
    use std::path::PathBuf;

    use anyhow::{Context, Result};
    use winreg::enums::{HKEY_LOCAL_MACHINE, KEY_QUERY_VALUE};
    use winreg::RegKey;

    /// Read a non-empty string value under HKLM as a path.
    pub fn hklm_path(subkey: &str, value: &str) -> Result<Option<PathBuf>> {
        let hklm = RegKey::predef(HKEY_LOCAL_MACHINE);
        let key = match hklm.open_subkey_with_flags(subkey, KEY_QUERY_VALUE) {
            Ok(key) => key,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err).with_context(|| format!("failed to open {subkey}")),
        };
        match key.get_value::<String, _>(value) {
            Ok(path) if !path.trim().is_empty() => Ok(Some(PathBuf::from(path.trim()))),
            Ok(_) => Ok(None),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err).with_context(|| format!("failed to read {subkey}\\{value}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn picks_largest_file_above_threshold() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("thumb"), vec![0u8; 10]).unwrap();
        fs::write(dir.path().join("wallpaper"), vec![0u8; 500]).unwrap();
        fs::write(dir.path().join("icon"), vec![0u8; 50]).unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("sub").join("huge"), vec![0u8; 5000]).unwrap();

        let found = largest_file(dir.path(), 100).unwrap();
        assert_eq!(found, Some(dir.path().join("wallpaper")));
    }

    #[test]
    fn rejects_when_largest_is_too_small() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("thumb"), vec![0u8; 100]).unwrap();
        assert_eq!(largest_file(dir.path(), 100).unwrap(), None);
    }

    #[test]
    fn missing_directory_is_a_miss() {
        let dir = tempdir().unwrap();
        assert_eq!(largest_file(&dir.path().join("absent"), 0).unwrap(), None);
    }
}
