//! Resolution of the background the overlay is drawn on.
//!
//! Once a pristine backup exists it is the perpetual source, so repeated
//! runs never stack panels on top of earlier panels. Before that, the
//! probes run in priority order and the first decodable hit wins; with no
//! hit a synthetic canvas is used, which is never backed up.

use std::fmt;
use std::path::PathBuf;

use anyhow::{Context, Result};
use image::RgbaImage;
use tracing::{debug, info, warn};

use crate::image_ops;

mod backup;
pub mod probes;

pub use backup::{BackupStore, BACKUP_FILE};
pub use probes::default_probes;

type Locate = Box<dyn Fn() -> Result<Option<PathBuf>> + Send + Sync>;

/// A named place to look for the current background.
pub struct Probe {
    name: &'static str,
    locate: Locate,
}

impl Probe {
    pub fn new<F>(name: &'static str, locate: F) -> Self
    where
        F: Fn() -> Result<Option<PathBuf>> + Send + Sync + 'static,
    {
        Self {
            name,
            locate: Box::new(locate),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl fmt::Debug for Probe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Probe").field("name", &self.name).finish()
    }
}

/// Where the resolved image came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceOrigin {
    Backup(PathBuf),
    Discovered { probe: &'static str, path: PathBuf },
    Synthetic,
}

impl fmt::Display for SourceOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceOrigin::Backup(path) => write!(f, "backup {}", path.display()),
            SourceOrigin::Discovered { probe, path } => {
                write!(f, "{probe} {}", path.display())
            }
            SourceOrigin::Synthetic => f.write_str("synthetic canvas"),
        }
    }
}

#[derive(Debug)]
pub struct ResolvedSource {
    pub image: RgbaImage,
    pub origin: SourceOrigin,
}

#[derive(Debug)]
pub struct SourceResolver {
    backup: BackupStore,
    probes: Vec<Probe>,
    fallback: (u32, u32),
}

impl SourceResolver {
    pub fn new(backup: BackupStore, probes: Vec<Probe>, fallback: (u32, u32)) -> Self {
        Self {
            backup,
            probes,
            fallback,
        }
    }

    pub fn backup(&self) -> &BackupStore {
        &self.backup
    }

    /// Find the background to draw on, backing up a discovered original.
    pub fn resolve(&self) -> Result<ResolvedSource> {
        if self.backup.exists() {
            let path = self.backup.path().to_path_buf();
            let image = image_ops::load_image(&path).context("failed to load backup image")?;
            info!(path = %path.display(), "using pristine backup");
            return Ok(ResolvedSource {
                image,
                origin: SourceOrigin::Backup(path),
            });
        }

        for probe in &self.probes {
            let path = match (probe.locate)() {
                Ok(Some(path)) if path.is_file() => path,
                Ok(Some(path)) => {
                    debug!(probe = probe.name, path = %path.display(), "probe path missing");
                    continue;
                }
                Ok(None) => {
                    debug!(probe = probe.name, "probe found nothing");
                    continue;
                }
                Err(err) => {
                    debug!(probe = probe.name, error = %format!("{err:#}"), "probe failed");
                    continue;
                }
            };
            let image = match image_ops::load_image(&path) {
                Ok(image) => image,
                Err(err) => {
                    debug!(
                        probe = probe.name,
                        error = %format!("{err:#}"),
                        "probe hit is not decodable"
                    );
                    continue;
                }
            };
            info!(probe = probe.name, path = %path.display(), "found current login background");
            match self.backup.store_from(&path) {
                Ok(true) => {
                    info!(path = %self.backup.path().display(), "backed up original background")
                }
                Ok(false) => {}
                Err(err) => {
                    warn!(error = %format!("{err:#}"), "failed to back up original background")
                }
            }
            return Ok(ResolvedSource {
                image,
                origin: SourceOrigin::Discovered {
                    probe: probe.name,
                    path,
                },
            });
        }

        let (width, height) = self.fallback;
        info!(width, height, "no login background found, using default canvas");
        Ok(ResolvedSource {
            image: image_ops::default_canvas(width, height),
            origin: SourceOrigin::Synthetic,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use image::{ImageFormat, Rgba};
    use std::fs;
    use std::path::Path;
    use tempfile::tempdir;

    fn write_png(path: &Path, value: u8) {
        RgbaImage::from_pixel(32, 18, Rgba([value, value, value, 255]))
            .save_with_format(path, ImageFormat::Png)
            .unwrap();
    }

    fn fixed(path: PathBuf) -> impl Fn() -> Result<Option<PathBuf>> + Send + Sync + 'static {
        move || Ok(Some(path.clone()))
    }

    #[test]
    fn first_decodable_candidate_wins_and_is_backed_up() {
        let dir = tempdir().unwrap();
        let second = dir.path().join("second.png");
        let third = dir.path().join("third.png");
        write_png(&second, 200);
        write_png(&third, 10);

        let resolver = SourceResolver::new(
            BackupStore::in_dir(&dir.path().join("data")),
            vec![
                Probe::new("erroring", || Err(anyhow!("registry denied"))),
                Probe::new("empty", || Ok(None)),
                Probe::new("missing", fixed(dir.path().join("nope.jpg"))),
                Probe::new("second", fixed(second.clone())),
                Probe::new("third", fixed(third)),
            ],
            (1920, 1080),
        );

        let resolved = resolver.resolve().unwrap();
        assert_eq!(
            resolved.origin,
            SourceOrigin::Discovered {
                probe: "second",
                path: second.clone()
            }
        );
        assert_eq!(resolved.image.get_pixel(0, 0).0, [200, 200, 200, 255]);
        assert_eq!(
            fs::read(resolver.backup().path()).unwrap(),
            fs::read(&second).unwrap()
        );
    }

    #[test]
    fn undecodable_hit_advances_to_next_probe() {
        let dir = tempdir().unwrap();
        let corrupt = dir.path().join("corrupt.jpg");
        fs::write(&corrupt, b"garbage").unwrap();
        let good = dir.path().join("good.png");
        write_png(&good, 90);

        let resolver = SourceResolver::new(
            BackupStore::in_dir(dir.path()),
            vec![
                Probe::new("corrupt", fixed(corrupt)),
                Probe::new("good", fixed(good)),
            ],
            (1920, 1080),
        );
        let resolved = resolver.resolve().unwrap();
        assert!(matches!(
            resolved.origin,
            SourceOrigin::Discovered { probe: "good", .. }
        ));
    }

    #[test]
    fn existing_backup_beats_every_probe() {
        let dir = tempdir().unwrap();
        let backup = BackupStore::in_dir(dir.path());
        write_png(backup.path(), 50);
        let found = dir.path().join("probe.png");
        write_png(&found, 250);

        let resolver = SourceResolver::new(
            backup.clone(),
            vec![Probe::new("probe", fixed(found))],
            (1920, 1080),
        );
        let resolved = resolver.resolve().unwrap();
        assert_eq!(resolved.origin, SourceOrigin::Backup(backup.path().to_path_buf()));
        assert_eq!(resolved.image.get_pixel(0, 0).0, [50, 50, 50, 255]);
    }

    #[test]
    fn corrupt_backup_is_fatal() {
        let dir = tempdir().unwrap();
        let backup = BackupStore::in_dir(dir.path());
        fs::write(backup.path(), b"garbage").unwrap();
        let resolver = SourceResolver::new(backup, Vec::new(), (1920, 1080));
        assert!(resolver.resolve().is_err());
    }

    #[test]
    fn exhausted_probes_synthesize_without_backup() {
        let dir = tempdir().unwrap();
        let resolver = SourceResolver::new(
            BackupStore::in_dir(dir.path()),
            vec![Probe::new("empty", || Ok(None))],
            (1920, 1080),
        );
        let resolved = resolver.resolve().unwrap();
        assert_eq!(resolved.origin, SourceOrigin::Synthetic);
        assert_eq!(resolved.image.dimensions(), (1920, 1080));
        assert_eq!(resolved.image.get_pixel(5, 5).0, [0, 0, 0, 255]);
        assert!(!resolver.backup().exists());
    }
}
