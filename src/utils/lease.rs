// odootool/src/utils/lease.rs
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::errors::{AppError, Result};

/// Advisory per-database lock held for the duration of a job.
///
/// The lock is a `.{database}.lock` file created with create-new semantics in
/// the backups directory, which every job of a project shares. A second job on
/// the same database fails with [`AppError::Locked`] instead of racing on the
/// drop/create or the staging path.
#[derive(Debug)]
pub struct DatabaseLease {
    path: PathBuf,
}

impl DatabaseLease {
    pub fn acquire(lock_dir: &Path, database: &str) -> Result<Self> {
        fs::create_dir_all(lock_dir)?;
        let path = lock_dir.join(format!(".{database}.lock"));
        let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                warn!(
                    "Lease {} is held; remove it manually if no job is running",
                    path.display()
                );
                return Err(AppError::Locked(database.to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        writeln!(file, "{}", std::process::id())?;
        debug!("Acquired lease {}", path.display());
        Ok(Self { path })
    }
}

impl Drop for DatabaseLease {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            warn!("Failed to release lease {}: {}", self.path.display(), e);
        }
    }
}
