//! One-time copy of the pristine login background.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::image_ops;

/// File name of the pristine copy inside the data directory.
pub const BACKUP_FILE: &str = "original_background.jpg";

/// The pristine background, written at most once.
#[derive(Debug, Clone)]
pub struct BackupStore {
    path: PathBuf,
}

impl BackupStore {
    pub fn in_dir(data_dir: &Path) -> Self {
        Self {
            path: data_dir.join(BACKUP_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Copy `src` into place unless a backup already exists.
    ///
    /// Returns `true` when a copy was written.
    pub fn store_from(&self, src: &Path) -> Result<bool> {
        if self.exists() {
            return Ok(false);
        }
        image_ops::copy_atomic(src, &self.path)
            .with_context(|| format!("failed to back up {}", src.display()))?;
        Ok(true)
    }

    /// Remove the backup so the next run discovers a fresh original.
    pub fn invalidate(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err)
                .with_context(|| format!("failed to remove {}", self.path.display())),
        }
    }
}
