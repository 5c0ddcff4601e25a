//! Pushing a finished image into the OS login and lock screens.
//!
//! Which mechanism works depends on Windows edition, version, and policy
//! state, none of which can be predicted up front. Every mechanism is
//! therefore attempted, in order of observed reliability, and the push
//! succeeds if any one of them did.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{info, warn};

#[cfg(windows)]
pub mod logonui;
pub mod slots;
#[cfg(windows)]
pub mod win;

#[cfg(windows)]
use self::win as platform;

#[cfg(not(windows))]
mod platform {
    use super::Mechanism;

    pub fn login_mechanisms() -> Vec<Mechanism> {
        Vec::new()
    }

    pub fn lock_mechanisms() -> Vec<Mechanism> {
        Vec::new()
    }
}

type MechanismFn = Box<dyn Fn(&Path) -> anyhow::Result<()> + Send + Sync>;

/// One named way of installing an image.
pub struct Mechanism {
    name: &'static str,
    run: MechanismFn,
}

impl Mechanism {
    pub fn new<F>(name: &'static str, run: F) -> Self
    where
        F: Fn(&Path) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        Self {
            name,
            run: Box::new(run),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl fmt::Debug for Mechanism {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mechanism").field("name", &self.name).finish()
    }
}

/// Result of a single mechanism.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MechanismOutcome {
    pub name: &'static str,
    /// `None` on success, otherwise the rendered error chain.
    pub error: Option<String>,
}

impl MechanismOutcome {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// Per-mechanism outcomes of a successful apply.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyReport {
    pub outcomes: Vec<MechanismOutcome>,
}

impl ApplyReport {
    pub fn succeeded(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.outcomes
            .iter()
            .filter(|o| o.succeeded())
            .map(|o| o.name)
    }

    pub fn failed(&self) -> impl Iterator<Item = &MechanismOutcome> + '_ {
        self.outcomes.iter().filter(|o| !o.succeeded())
    }
}

#[derive(Debug, Error)]
pub enum ApplyError {
    #[error("no apply mechanisms are available on this platform")]
    NoMechanisms,
    #[error("image {path} is not accessible")]
    MissingImage {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("all {attempted} mechanisms failed, last error: {last:#}")]
    AllFailed {
        attempted: usize,
        last: anyhow::Error,
    },
}

/// Ordered list of mechanisms that are all attempted on every apply.
#[derive(Debug, Default)]
pub struct ScreenApplier {
    mechanisms: Vec<Mechanism>,
}

impl ScreenApplier {
    pub fn new(mechanisms: Vec<Mechanism>) -> Self {
        Self { mechanisms }
    }

    /// Login screen mechanisms for this platform.
    pub fn login_screen() -> Self {
        Self::new(platform::login_mechanisms())
    }

    /// Lock screen mechanisms for this platform.
    pub fn lock_screen() -> Self {
        Self::new(platform::lock_mechanisms())
    }

    pub fn mechanisms(&self) -> &[Mechanism] {
        &self.mechanisms
    }

    /// Run every mechanism against `image`.
    ///
    /// Fails only when the image is missing or every mechanism failed, in
    /// which case the last observed failure is returned.
    pub fn apply(&self, image: &Path) -> Result<ApplyReport, ApplyError> {
        if self.mechanisms.is_empty() {
            return Err(ApplyError::NoMechanisms);
        }
        let path = std::path::absolute(image).map_err(|source| ApplyError::MissingImage {
            path: image.to_path_buf(),
            source,
        })?;
        std::fs::metadata(&path).map_err(|source| ApplyError::MissingImage {
            path: path.clone(),
            source,
        })?;

        let mut report = ApplyReport::default();
        let mut last_error = None;
        for mechanism in &self.mechanisms {
            match (mechanism.run)(&path) {
                Ok(()) => {
                    info!(mechanism = mechanism.name, "apply mechanism succeeded");
                    report.outcomes.push(MechanismOutcome {
                        name: mechanism.name,
                        error: None,
                    });
                }
                Err(err) => {
                    warn!(
                        mechanism = mechanism.name,
                        error = %format!("{err:#}"),
                        "apply mechanism failed"
                    );
                    report.outcomes.push(MechanismOutcome {
                        name: mechanism.name,
                        error: Some(format!("{err:#}")),
                    });
                    last_error = Some(err);
                }
            }
        }

        if report.succeeded().next().is_some() {
            return Ok(report);
        }
        Err(ApplyError::AllFailed {
            attempted: self.mechanisms.len(),
            last: last_error.unwrap_or_else(|| anyhow::anyhow!("no mechanism reported")),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tempfile::tempdir;

    fn image_file() -> (tempfile::TempDir, PathBuf) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("loginscreen_1.jpg");
        std::fs::write(&path, b"jpeg").unwrap();
        (dir, path)
    }

    #[test]
    fn one_success_is_enough() {
        let (_dir, path) = image_file();
        let applier = ScreenApplier::new(vec![
            Mechanism::new("m1", |_| Err(anyhow!("policy blocked"))),
            Mechanism::new("m2", |_| Ok(())),
        ]);
        let report = applier.apply(&path).unwrap();
        assert_eq!(report.succeeded().collect::<Vec<_>>(), vec!["m2"]);
        let failed: Vec<_> = report.failed().collect();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].name, "m1");
        assert!(failed[0].error.as_deref().unwrap().contains("policy blocked"));
    }

    #[cfg(windows)]
    #[test]
    fn lock_screen_tries_every_known_location() {
        let names: Vec<_> = ScreenApplier::lock_screen()
            .mechanisms()
            .iter()
            .map(Mechanism::name)
            .collect();
        assert_eq!(
            names,
            vec![
                "winrt lock screen",
                "user personalization csp",
                "assets folder",
                "system data folder",
                "machine lock policy",
            ]
        );
    }

    #[test]
    fn every_mechanism_runs_even_after_success() {
        let (_dir, path) = image_file();
        let calls = Arc::new(AtomicUsize::new(0));
        let mechanisms = (0..3)
            .map(|_| {
                let calls = Arc::clone(&calls);
                Mechanism::new("counting", move |_| {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                })
            })
            .collect();
        ScreenApplier::new(mechanisms).apply(&path).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn all_failures_return_the_last_error() {
        let (_dir, path) = image_file();
        let applier = ScreenApplier::new(vec![
            Mechanism::new("m1", |_| Err(anyhow!("first"))),
            Mechanism::new("m2", |_| Err(anyhow!("second"))),
        ]);
        match applier.apply(&path) {
            Err(ApplyError::AllFailed { attempted, last }) => {
                assert_eq!(attempted, 2);
                assert_eq!(last.to_string(), "second");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn mechanisms_receive_an_absolute_path() {
        let (_dir, path) = image_file();
        let applier = ScreenApplier::new(vec![Mechanism::new("abs", |p| {
            anyhow::ensure!(p.is_absolute(), "relative path {}", p.display());
            Ok(())
        })]);
        applier.apply(&path).unwrap();
    }

    #[test]
    fn missing_image_is_rejected_before_any_mechanism() {
        let dir = tempdir().unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let applier = ScreenApplier::new(vec![Mechanism::new("m", move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })]);
        let err = applier.apply(&dir.path().join("absent.jpg")).unwrap_err();
        assert!(matches!(err, ApplyError::MissingImage { .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn empty_applier_reports_no_mechanisms() {
        let (_dir, path) = image_file();
        let err = ScreenApplier::default().apply(&path).unwrap_err();
        assert!(matches!(err, ApplyError::NoMechanisms));
    }
}
