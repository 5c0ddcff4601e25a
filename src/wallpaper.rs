//! Desktop wallpaper for the `set --target desktop` command.

#[cfg(windows)]
pub use self::win::{set_wallpaper, set_wallpaper_style};
#[cfg(windows)]
pub(crate) use self::win::to_wide_null;

#[derive(Copy, Clone, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum StyleMode {
    Fill,
    Fit,
    Stretch,
    Tile,
    Center,
    Span,
}

impl StyleMode {
    /// `(WallpaperStyle, TileWallpaper)` registry values.
    pub fn registry_values(self) -> (&'static str, &'static str) {
        match self {
            StyleMode::Fill => ("10", "0"),
            StyleMode::Fit => ("6", "0"),
            StyleMode::Stretch => ("2", "0"),
            StyleMode::Tile => ("0", "1"),
            StyleMode::Center => ("0", "0"),
            StyleMode::Span => ("22", "0"),
        }
    }
}

#[cfg(not(windows))]
pub fn set_wallpaper(
    _image: &std::path::Path,
    _cache_dir: &std::path::Path,
    _style: Option<StyleMode>,
) -> anyhow::Result<()> {
    anyhow::bail!("setting the desktop wallpaper is only supported on Windows")
}

#[cfg(windows)]
mod win {
    use std::ffi::OsStr;
    use std::os::windows::ffi::OsStrExt;
    use std::path::Path;

    use anyhow::{anyhow, Context, Result};
    use tracing::info;
    use winreg::enums::{HKEY_CURRENT_USER, KEY_SET_VALUE};
    use winreg::RegKey;
    use windows::Win32::UI::WindowsAndMessaging::{
        SystemParametersInfoW, SPI_SETDESKWALLPAPER, SPIF_SENDCHANGE, SPIF_UPDATEINIFILE,
    };

    use super::StyleMode;
    use crate::image_ops;

    pub fn set_wallpaper_style(mode: StyleMode) -> Result<()> {
        let (style, tile) = mode.registry_values();
        let hkcu = RegKey::predef(HKEY_CURRENT_USER);
        let desktop = hkcu
            .open_subkey_with_flags(r"Control Panel\Desktop", KEY_SET_VALUE)
            .context("failed to open Control Panel\\Desktop")?;
        desktop.set_value("WallpaperStyle", &style)?;
        desktop.set_value("TileWallpaper", &tile)?;
        Ok(())
    }

    /// Convert `image` to a cached BMP under `cache_dir` and make it the
    /// desktop wallpaper, optionally changing the style first.
    pub fn set_wallpaper(image: &Path, cache_dir: &Path, style: Option<StyleMode>) -> Result<()> {
        if let Some(style) = style {
            set_wallpaper_style(style)?;
        }
        let bmp = image_ops::cache_bmp(image, cache_dir)?;
        let wide_path = to_wide_null(&bmp);
        unsafe {
            SystemParametersInfoW(
                SPI_SETDESKWALLPAPER,
                0,
                Some(wide_path.as_ptr() as *mut _),
                SPIF_UPDATEINIFILE | SPIF_SENDCHANGE,
            )
        }
        .map_err(|err| anyhow!("SystemParametersInfoW failed: {err}"))?;
        info!(path = %bmp.display(), "desktop wallpaper set");
        Ok(())
    }

    pub(crate) fn to_wide_null(path: &Path) -> Vec<u16> {
        OsStr::new(path)
            .encode_wide()
            .chain(std::iter::once(0))
            .collect()
    }
}
