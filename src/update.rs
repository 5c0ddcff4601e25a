//! One update cycle: resolve, render, save, prune, apply.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use image::RgbaImage;
use tracing::{debug, info, warn};

use crate::apply::{ApplyReport, ScreenApplier};
use crate::display;
use crate::image_ops;
use crate::overlay::{self, font, PanelContent, ScaledDimensions, Typeface};
use crate::settings::Settings;
use crate::source::{self, BackupStore, Probe, SourceOrigin, SourceResolver};
use crate::status::{HostInfo, ServicesSource, StatusSource};

const OUTPUT_PREFIX: &str = "loginscreen_";
const OUTPUT_EXTENSION: &str = ".jpg";
/// Fixed output name used by older releases.
pub const LEGACY_OUTPUT: &str = "current_loginscreen.jpg";

/// What a successful cycle produced.
#[derive(Debug)]
pub struct UpdateOutcome {
    pub output: PathBuf,
    pub origin: SourceOrigin,
    pub report: ApplyReport,
}

/// A finished render that has not been written anywhere yet.
#[derive(Debug)]
pub struct Rendered {
    pub image: RgbaImage,
    pub origin: SourceOrigin,
}

pub struct Updater {
    data_dir: PathBuf,
    settings: Settings,
    resolver: SourceResolver,
    left: Box<dyn StatusSource>,
    right: Box<dyn StatusSource>,
    display: (u32, u32),
    applier: ScreenApplier,
    typeface: Option<Box<dyn Typeface>>,
    boot: bool,
}

impl Updater {
    /// Live collaborators for this machine.
    pub fn new(data_dir: &Path, settings: Settings) -> Self {
        let resolver = SourceResolver::new(
            BackupStore::in_dir(data_dir),
            source::default_probes(settings.spotlight_min_bytes),
            settings.fallback_size(),
        );
        Self {
            data_dir: data_dir.to_path_buf(),
            left: Box::new(ServicesSource::new(settings.extra_critical_services.clone())),
            right: Box::new(HostInfo),
            resolver,
            display: display::primary_resolution(),
            applier: ScreenApplier::login_screen(),
            typeface: None,
            boot: false,
            settings,
        }
    }

    pub fn with_probes(mut self, probes: Vec<Probe>) -> Self {
        self.resolver = SourceResolver::new(
            BackupStore::in_dir(&self.data_dir),
            probes,
            self.settings.fallback_size(),
        );
        self
    }

    pub fn with_sources(
        mut self,
        left: impl StatusSource + 'static,
        right: impl StatusSource + 'static,
    ) -> Self {
        self.left = Box::new(left);
        self.right = Box::new(right);
        self
    }

    pub fn with_display(mut self, display: (u32, u32)) -> Self {
        self.display = display;
        self
    }

    pub fn with_applier(mut self, applier: ScreenApplier) -> Self {
        self.applier = applier;
        self
    }

    /// Draw with `typeface` instead of the process-wide system font.
    pub fn with_typeface(mut self, typeface: impl Typeface + 'static) -> Self {
        self.typeface = Some(Box::new(typeface));
        self
    }

    /// Boot mode restarts LogonUI after a successful apply.
    pub fn boot(mut self, boot: bool) -> Self {
        self.boot = boot;
        self
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Resolve the source and draw both panels onto it.
    pub fn render(&self) -> Result<Rendered> {
        let source = self.resolver.resolve()?;
        let content = self.gather()?;

        let dims = ScaledDimensions::for_resolution(self.display.0, self.display.1)
            .corrected_for_image(source.image.dimensions(), self.display);
        debug!(
            font_size = dims.font_size,
            scale = dims.scale_factor,
            "computed overlay dimensions"
        );

        let face: &dyn Typeface = match &self.typeface {
            Some(face) => face.as_ref(),
            None => font::shared(self.settings.font_path.as_deref())
                .context("no usable overlay font")?,
        };
        let panels = overlay::layout_panels(&source.image, &content, face, &dims);
        let image = overlay::render_panels(&source.image, &panels, face, &dims);
        Ok(Rendered {
            image,
            origin: source.origin,
        })
    }

    /// Run a full cycle. A rendered file stays on disk even if every apply
    /// mechanism fails.
    pub fn run(&self) -> Result<UpdateOutcome> {
        let rendered = self.render()?;

        fs::create_dir_all(&self.data_dir)
            .with_context(|| format!("failed to create {}", self.data_dir.display()))?;
        let output = output_path(&self.data_dir, Utc::now().timestamp());
        image_ops::save_jpeg(&rendered.image, &output, self.settings.quality())
            .context("failed to save login image")?;
        info!(path = %output.display(), source = %rendered.origin, "rendered login image");

        let removed = prune_outputs(&self.data_dir, &output);
        if removed > 0 {
            debug!(removed, "pruned previous login images");
        }

        let report = self
            .applier
            .apply(&output)
            .context("failed to apply login image")?;
        info!(
            mechanisms = ?report.succeeded().collect::<Vec<_>>(),
            "login image applied"
        );

        if self.boot && self.settings.restart_logonui_on_boot {
            refresh_logonui();
        }

        Ok(UpdateOutcome {
            output,
            origin: rendered.origin,
            report,
        })
    }

    fn gather(&self) -> Result<PanelContent> {
        let left = match self.left.lines() {
            Ok(lines) => lines,
            Err(err) => {
                warn!(
                    source = self.left.name(),
                    error = %format!("{err:#}"),
                    "status unavailable, leaving panel empty"
                );
                Vec::new()
            }
        };
        let right = self
            .right
            .lines()
            .with_context(|| format!("failed to gather {} status", self.right.name()))?;
        Ok(PanelContent { left, right })
    }
}

#[cfg(windows)]
fn refresh_logonui() {
    if let Err(err) = crate::apply::logonui::refresh() {
        warn!(error = %format!("{err:#}"), "LogonUI restart failed");
    }
}

#[cfg(not(windows))]
fn refresh_logonui() {
    debug!("LogonUI restart is only available on Windows");
}

/// `loginscreen_<ts>.jpg` in `dir`, bumping `ts` past any existing file.
pub fn output_path(dir: &Path, mut timestamp: i64) -> PathBuf {
    loop {
        let path = dir.join(format!("{OUTPUT_PREFIX}{timestamp}{OUTPUT_EXTENSION}"));
        if !path.exists() {
            return path;
        }
        timestamp += 1;
    }
}

fn is_output_name(name: &str) -> bool {
    name == LEGACY_OUTPUT
        || name
            .strip_prefix(OUTPUT_PREFIX)
            .is_some_and(|rest| rest.ends_with(OUTPUT_EXTENSION))
}

/// Delete every earlier output in `dir` except `keep`. Failures are logged
/// and skipped. Returns how many files were removed.
pub fn prune_outputs(dir: &Path, keep: &Path) -> usize {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) => {
            warn!(dir = %dir.display(), error = %err, "cannot list outputs for pruning");
            return 0;
        }
    };
    let keep_name = keep.file_name();
    let mut removed = 0;
    for entry in entries.flatten() {
        let name = entry.file_name();
        if Some(name.as_os_str()) == keep_name {
            continue;
        }
        let Some(name) = name.to_str() else { continue };
        if !is_output_name(name) || !entry.path().is_file() {
            continue;
        }
        match fs::remove_file(entry.path()) {
            Ok(()) => removed += 1,
            Err(err) => warn!(file = name, error = %err, "failed to remove old output"),
        }
    }
    removed
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn output_name_skips_existing_files() {
        let dir = tempdir().unwrap();
        assert_eq!(
            output_path(dir.path(), 1_700_000_000),
            dir.path().join("loginscreen_1700000000.jpg")
        );
        fs::write(dir.path().join("loginscreen_1700000000.jpg"), b"x").unwrap();
        fs::write(dir.path().join("loginscreen_1700000001.jpg"), b"x").unwrap();
        assert_eq!(
            output_path(dir.path(), 1_700_000_000),
            dir.path().join("loginscreen_1700000002.jpg")
        );
    }

    #[test]
    fn prune_keeps_only_the_current_output() {
        let dir = tempdir().unwrap();
        for name in [
            "loginscreen_1.jpg",
            "loginscreen_2.jpg",
            "current_loginscreen.jpg",
            "loginscreen_.jpg",
            "original_background.jpg",
            "settings.json",
        ] {
            fs::write(dir.path().join(name), b"x").unwrap();
        }
        let keep = dir.path().join("loginscreen_3.jpg");
        fs::write(&keep, b"x").unwrap();

        assert_eq!(prune_outputs(dir.path(), &keep), 4);
        let mut left: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        left.sort();
        assert_eq!(
            left,
            vec![
                "loginscreen_3.jpg",
                "original_background.jpg",
                "settings.json",
            ]
        );
    }

    #[test]
    fn output_names() {
        assert!(is_output_name("loginscreen_1712345678.jpg"));
        assert!(is_output_name(LEGACY_OUTPUT));
        assert!(is_output_name("loginscreen_.jpg"));
        assert!(is_output_name("loginscreen_backup.jpg"));
        assert!(!is_output_name("loginscreen_1.png"));
        assert!(!is_output_name("loginscreen.jpg"));
        assert!(!is_output_name("original_background.jpg"));
    }
}
