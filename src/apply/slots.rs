//! Folders Windows reads lock screen images from.

use std::path::{Path, PathBuf};

use crate::source::probes::SPOTLIGHT_ASSETS;

/// `%ProgramData%`-relative folder checked for a `bg.*` lock image.
pub const SYSTEM_DATA_DIR: &str = r"Microsoft\Windows\SystemData";

/// Unique copy of `image` in the content delivery assets folder.
pub fn assets_copy(local_app_data: &Path, image: &Path, nanos: u128) -> PathBuf {
    local_app_data
        .join(SPOTLIGHT_ASSETS)
        .join(with_extension_of(format!("LockScreen_{nanos}"), image))
}

/// `bg.<ext>` in the SystemData folder; each apply replaces the last.
pub fn system_data_copy(program_data: &Path, image: &Path) -> PathBuf {
    program_data
        .join(SYSTEM_DATA_DIR)
        .join(with_extension_of("bg".to_string(), image))
}

fn with_extension_of(mut stem: String, image: &Path) -> String {
    if let Some(ext) = image.extension().and_then(|ext| ext.to_str()) {
        stem.push('.');
        stem.push_str(ext);
    }
    stem
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assets_copy_keeps_the_extension() {
        let local = Path::new("local");
        let copy = assets_copy(local, Path::new("out/loginscreen_7.jpg"), 42);
        assert_eq!(copy.file_name().unwrap(), "LockScreen_42.jpg");
        assert!(copy.starts_with(local.join(SPOTLIGHT_ASSETS)));
        assert_ne!(copy, assets_copy(local, Path::new("out/loginscreen_7.jpg"), 43));
    }

    #[test]
    fn system_data_copy_is_a_fixed_name() {
        let data = Path::new("data");
        assert_eq!(
            system_data_copy(data, Path::new("x/photo.png")),
            data.join(SYSTEM_DATA_DIR).join("bg.png")
        );
        assert_eq!(
            system_data_copy(data, Path::new("x/noext")),
            data.join(SYSTEM_DATA_DIR).join("bg")
        );
    }
}
