//! Image decoding, atomic encoding, and discovery utilities.

use std::ffi::{OsStr, OsString};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use image::buffer::ConvertBuffer;
use image::codecs::jpeg::JpegEncoder;
use image::{ImageFormat, ImageReader, Rgba, RgbaImage, RgbImage};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaChaRng;
use walkdir::WalkDir;

/// Quality used for rendered login-screen outputs.
pub const OUTPUT_JPEG_QUALITY: u8 = 95;
/// Quality used when a platform slot forces a JPEG re-encode.
pub const SLOT_JPEG_QUALITY: u8 = 90;

/// Decode an image, sniffing the format from content rather than extension.
pub fn load_image(path: &Path) -> Result<RgbaImage> {
    let reader = ImageReader::open(path)
        .with_context(|| format!("failed to open {}", path.display()))?
        .with_guessed_format()
        .with_context(|| format!("failed to read {}", path.display()))?;
    let img = reader
        .decode()
        .with_context(|| format!("failed to decode {}", path.display()))?;
    Ok(img.to_rgba8())
}

/// Encode as JPEG into `<path>.tmp`, then rename over `path`.
///
/// The temp file is removed when encoding fails so no partial output is
/// ever observable at the final location.
pub fn save_jpeg(img: &RgbaImage, path: &Path, quality: u8) -> Result<()> {
    let rgb: RgbImage = img.convert();
    write_atomic(path, |writer| {
        let mut encoder = JpegEncoder::new_with_quality(writer, quality);
        encoder.encode_image(&rgb)?;
        Ok(())
    })
}

/// Copy a file through a temp sibling so readers never see a partial copy.
pub fn copy_atomic(src: &Path, dst: &Path) -> Result<()> {
    let bytes = fs::read(src).with_context(|| format!("failed to read {}", src.display()))?;
    write_atomic(dst, |writer| {
        writer.write_all(&bytes)?;
        Ok(())
    })
}

/// Place `src` at `dst` as a JPEG: JPEG input is copied byte for byte, any
/// other decodable format is re-encoded at `quality`.
pub fn export_jpeg(src: &Path, dst: &Path, quality: u8) -> Result<()> {
    let format = ImageReader::open(src)
        .with_context(|| format!("failed to open {}", src.display()))?
        .with_guessed_format()?
        .format();
    if format == Some(ImageFormat::Jpeg) {
        return copy_atomic(src, dst);
    }
    let img = load_image(src)?;
    save_jpeg(&img, dst, quality)
}

/// Solid black canvas used when no real background can be found.
pub fn default_canvas(width: u32, height: u32) -> RgbaImage {
    RgbaImage::from_pixel(width, height, Rgba([0, 0, 0, 255]))
}

/// Return true when the file extension is a decodable background format.
pub fn is_supported_image(path: &Path) -> bool {
    match path.extension().and_then(OsStr::to_str) {
        Some(ext) => matches!(
            ext.to_ascii_lowercase().as_str(),
            "jpg" | "jpeg" | "png" | "bmp"
        ),
        None => false,
    }
}

/// Collect every supported image below `dir`, sorted.
pub fn collect_images(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut images = Vec::new();
    for entry in WalkDir::new(dir).follow_links(true) {
        let entry = entry?;
        if entry.file_type().is_file() && is_supported_image(entry.path()) {
            images.push(entry.path().to_path_buf());
        }
    }
    images.sort();
    Ok(images)
}

/// Pick one image at random.
pub fn pick_random(images: &[PathBuf]) -> Result<PathBuf> {
    let mut rng = ChaChaRng::from_entropy();
    images
        .choose(&mut rng)
        .cloned()
        .ok_or_else(|| anyhow!("no images available"))
}

/// Re-encode an image as BMP in `dir` for the desktop wallpaper API.
pub fn cache_bmp(src: &Path, dir: &Path) -> Result<PathBuf> {
    let img = load_image(src)?;
    fs::create_dir_all(dir)
        .with_context(|| format!("failed to create {}", dir.display()))?;
    let cache_path = dir.join("desktop_wallpaper.bmp");
    // Windows wallpaper APIs are most reliable with BMP input.
    let rgb: RgbImage = img.convert();
    write_atomic(&cache_path, |writer| {
        rgb.write_to(writer, ImageFormat::Bmp)?;
        Ok(())
    })?;
    Ok(cache_path)
}

fn temp_sibling(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".tmp");
    PathBuf::from(name)
}

fn write_atomic<F>(path: &Path, write: F) -> Result<()>
where
    F: FnOnce(&mut BufWriter<File>) -> Result<()>,
{
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let tmp = temp_sibling(path);
    let result = (|| -> Result<()> {
        let file = File::create(&tmp)?;
        let mut writer = BufWriter::new(file);
        write(&mut writer)?;
        writer.flush()?;
        writer.get_ref().sync_all()?;
        Ok(())
    })();
    if let Err(err) = result {
        let _ = fs::remove_file(&tmp);
        return Err(err.context(format!("failed to write {}", path.display())));
    }
    fs::rename(&tmp, path).map_err(|err| {
        let _ = fs::remove_file(&tmp);
        anyhow!("failed to move {} into place: {err}", path.display())
    })
}
