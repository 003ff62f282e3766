// odootool/src/utils/staging.rs
//! Per-job scratch directories.
//!
//! A [`StagingDir`] is removed when it goes out of scope, so every exit path
//! of a job (success, error return, panic unwinding) cleans up after itself.
//! A killed process leaks its directory; nothing here reaps stale ones.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::errors::Result;

/// Root under which staging directories are created.
#[derive(Debug, Clone)]
pub struct StagingArea {
    root: PathBuf,
}

impl StagingArea {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Creates `root/job_key`. An already existing directory is reused.
    pub fn acquire(&self, job_key: &str) -> Result<StagingDir> {
        let path = self.root.join(job_key);
        if path.exists() {
            warn!("Staging directory {} already exists, reusing it", path.display());
        }
        fs::create_dir_all(&path)?;
        debug!("Acquired staging directory {}", path.display());
        Ok(StagingDir {
            path,
            released: false,
        })
    }
}

/// Exclusively owned working directory of one backup or restore job.
#[derive(Debug)]
pub struct StagingDir {
    path: PathBuf,
    released: bool,
}

impl StagingDir {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn join(&self, name: impl AsRef<Path>) -> PathBuf {
        self.path.join(name)
    }

    /// Removes the directory and everything below it.
    pub fn release(mut self) -> io::Result<()> {
        self.released = true;
        remove(&self.path)
    }
}

impl Drop for StagingDir {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        if let Err(e) = remove(&self.path) {
            warn!("Failed to remove staging directory {}: {}", self.path.display(), e);
        }
    }
}

fn remove(path: &Path) -> io::Result<()> {
    match fs::remove_dir_all(path) {
        Ok(()) => {
            debug!("Released staging directory {}", path.display());
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}
