//! Monospace font discovery and glyph rasterization.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use ab_glyph::{point, Font, FontArc, FontVec, PxScale, ScaleFont};
use fontdb::{Database, Family, Query};
use image::{Rgba, RgbaImage};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::render::blend_pixel;

/// DejaVu Sans Mono, used when the host offers no monospace face.
const EMBEDDED_FONT: &[u8] = include_bytes!("../../assets/fonts/DejaVuSansMono.ttf");
const EMBEDDED_SOURCE: &str = "embedded DejaVu Sans Mono";

/// Family names tried through the system font database, best first.
const MONOSPACE_FAMILIES: &[&str] = &[
    "JetBrains Mono",
    "Consolas",
    "Cascadia Mono",
    "Lucida Console",
    "Courier New",
    "DejaVu Sans Mono",
    "Liberation Mono",
];

/// Font files under `%WINDIR%\Fonts`, checked before the database scan.
const WINDOWS_FONT_FILES: &[&str] = &[
    "consola.ttf",
    "CascadiaMono.ttf",
    "lucon.ttf",
    "cour.ttf",
];

const UNIX_FONT_FILES: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSansMono.ttf",
    "/usr/share/fonts/dejavu/DejaVuSansMono.ttf",
    "/usr/share/fonts/TTF/DejaVuSansMono.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationMono-Regular.ttf",
];

#[derive(Debug, Clone, Error)]
pub enum FontError {
    #[error("failed to read font {path}: {reason}")]
    Read { path: PathBuf, reason: String },
    #[error("{path} is not a usable TrueType font")]
    Invalid { path: PathBuf },
    #[error("no monospace font found on this system")]
    NotFound,
}

/// Anything that can measure and draw a single line of text.
pub trait Typeface: Send + Sync {
    /// Advance width of `text` at `size` pixels.
    fn measure(&self, text: &str, size: f32) -> f32;

    /// Draw `text` with its baseline starting at (`x`, `baseline`).
    fn draw(
        &self,
        canvas: &mut RgbaImage,
        text: &str,
        x: f32,
        baseline: f32,
        size: f32,
        color: Rgba<u8>,
    );
}

/// A loaded TrueType face.
#[derive(Clone)]
pub struct FontFace {
    font: FontArc,
    source: String,
}

impl std::fmt::Debug for FontFace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FontFace").field("source", &self.source).finish()
    }
}

impl FontFace {
    pub fn from_path(path: &Path) -> Result<Self, FontError> {
        let bytes = fs::read(path).map_err(|err| FontError::Read {
            path: path.to_path_buf(),
            reason: err.to_string(),
        })?;
        let font = FontArc::try_from_vec(bytes).map_err(|_| FontError::Invalid {
            path: path.to_path_buf(),
        })?;
        Ok(Self {
            font,
            source: path.display().to_string(),
        })
    }

    /// The face compiled into the binary.
    pub fn embedded() -> Result<Self, FontError> {
        let font = FontArc::try_from_slice(EMBEDDED_FONT).map_err(|_| FontError::Invalid {
            path: PathBuf::from(EMBEDDED_SOURCE),
        })?;
        Ok(Self {
            font,
            source: EMBEDDED_SOURCE.to_string(),
        })
    }

    /// Where the face was loaded from, for logging.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Treat `size` as the em size, matching point sizes at 72 DPI.
    fn px_scale(&self, size: f32) -> PxScale {
        match self.font.units_per_em() {
            Some(units) if units > 0.0 => {
                PxScale::from(size * self.font.height_unscaled() / units)
            }
            _ => PxScale::from(size),
        }
    }
}

impl Typeface for FontFace {
    fn measure(&self, text: &str, size: f32) -> f32 {
        let scaled = self.font.as_scaled(self.px_scale(size));
        let mut width = 0.0;
        let mut previous = None;
        for ch in text.chars().filter(|c| !c.is_control()) {
            let glyph = scaled.glyph_id(ch);
            if let Some(prev) = previous {
                width += scaled.kern(prev, glyph);
            }
            width += scaled.h_advance(glyph);
            previous = Some(glyph);
        }
        width
    }

    fn draw(
        &self,
        canvas: &mut RgbaImage,
        text: &str,
        x: f32,
        baseline: f32,
        size: f32,
        color: Rgba<u8>,
    ) {
        let scale = self.px_scale(size);
        let scaled = self.font.as_scaled(scale);
        let mut caret = x;
        let mut previous = None;
        for ch in text.chars().filter(|c| !c.is_control()) {
            let glyph_id = scaled.glyph_id(ch);
            if let Some(prev) = previous {
                caret += scaled.kern(prev, glyph_id);
            }
            let glyph = glyph_id.with_scale_and_position(scale, point(caret, baseline));
            if let Some(outlined) = self.font.outline_glyph(glyph) {
                let bounds = outlined.px_bounds();
                let origin_x = bounds.min.x.floor() as i64;
                let origin_y = bounds.min.y.floor() as i64;
                outlined.draw(|gx, gy, coverage| {
                    blend_pixel(
                        canvas,
                        origin_x + i64::from(gx),
                        origin_y + i64::from(gy),
                        color,
                        coverage,
                    );
                });
            }
            caret += scaled.h_advance(glyph_id);
            previous = Some(glyph_id);
        }
    }
}

static SHARED: OnceLock<Result<FontFace, FontError>> = OnceLock::new();

/// The process-wide overlay font, loaded on first use.
///
/// Concurrent first callers block until the single load finishes; the
/// outcome, success or failure, is cached for the life of the process. The
/// override only matters on the first call; a different one later is logged
/// and ignored.
pub fn shared(override_path: Option<&Path>) -> Result<&'static FontFace, FontError> {
    let mut loaded_here = false;
    let loaded = SHARED.get_or_init(|| {
        loaded_here = true;
        let loaded = locate(override_path);
        match &loaded {
            Ok(face) => info!(font = face.source(), "loaded overlay font"),
            Err(err) => debug!(error = %err, "overlay font unavailable"),
        }
        loaded
    });
    let ignored = override_path.filter(|path| !loaded_here && ignores_override(loaded, path));
    if let Some(path) = ignored {
        warn!(
            requested = %path.display(),
            "font override ignored, overlay font was already loaded"
        );
    }
    loaded.as_ref().map_err(Clone::clone)
}

/// Whether an already settled load did not come from `path`.
fn ignores_override(loaded: &Result<FontFace, FontError>, path: &Path) -> bool {
    match loaded {
        Ok(face) => face.source != path.display().to_string(),
        Err(FontError::Read { path: tried, .. } | FontError::Invalid { path: tried }) => {
            tried != path
        }
        Err(FontError::NotFound) => true,
    }
}

fn locate(override_path: Option<&Path>) -> Result<FontFace, FontError> {
    // An explicit choice is honored or fails; it never silently falls back.
    if let Some(path) = override_path {
        return FontFace::from_path(path);
    }
    for path in candidate_files() {
        if !path.is_file() {
            continue;
        }
        match FontFace::from_path(&path) {
            Ok(face) => return Ok(face),
            Err(err) => debug!(error = %err, "skipping font candidate"),
        }
    }
    query_system_database().or_else(|err| {
        debug!(error = %err, "no system monospace font, using the embedded face");
        FontFace::embedded()
    })
}

fn candidate_files() -> Vec<PathBuf> {
    let mut files = Vec::new();
    if let Some(windir) = std::env::var_os("WINDIR").or_else(|| std::env::var_os("SystemRoot")) {
        let fonts = PathBuf::from(windir).join("Fonts");
        files.extend(WINDOWS_FONT_FILES.iter().map(|name| fonts.join(name)));
    }
    files.extend(UNIX_FONT_FILES.iter().map(PathBuf::from));
    files
}

fn query_system_database() -> Result<FontFace, FontError> {
    let mut db = Database::new();
    db.load_system_fonts();
    let mut families: Vec<Family<'_>> = MONOSPACE_FAMILIES
        .iter()
        .map(|name| Family::Name(*name))
        .collect();
    families.push(Family::Monospace);
    let query = Query {
        families: &families,
        ..Query::default()
    };
    let id = db.query(&query).ok_or(FontError::NotFound)?;
    let source = db
        .face(id)
        .map(|face| {
            face.families
                .first()
                .map(|(name, _)| name.clone())
                .unwrap_or_else(|| face.post_script_name.clone())
        })
        .unwrap_or_else(|| "system monospace".to_string());
    let font = db
        .with_face_data(id, |data, index| {
            FontVec::try_from_vec_and_index(data.to_vec(), index)
                .ok()
                .map(FontArc::new)
        })
        .flatten()
        .ok_or(FontError::NotFound)?;
    Ok(FontFace { font, source })
}
