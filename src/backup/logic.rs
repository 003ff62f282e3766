// odootool/src/backup/logic.rs
use std::fs;
use std::path::PathBuf;

use tracing::{info, warn};

use super::db_dump::{DumpFormat, dump_database};
use crate::archive::{FILESTORE_DIR, SQL_DUMP, STRUCTURED_DUMP, create_tar_gz_archive};
use crate::catalog::Snapshot;
use crate::config::Settings;
use crate::container::{ContainerRuntime, container_path};
use crate::errors::{AppError, Result};
use crate::utils::lease::DatabaseLease;
use crate::utils::staging::{StagingArea, StagingDir};

/// Runs the backup job for `snapshot` and returns the path of the archive.
///
/// Steps run in order and the first failure aborts the job. The staging
/// directory is removed on every exit path.
pub fn perform_backup_orchestration(
    runtime: &dyn ContainerRuntime,
    settings: &Settings,
    snapshot: &Snapshot,
) -> Result<PathBuf> {
    let database = snapshot.database.as_str();
    if database.trim().is_empty() {
        return Err(AppError::Config("database name cannot be empty".into()));
    }

    let backups_dir = settings.backups_dir();
    fs::create_dir_all(&backups_dir)?;
    let _lease = DatabaseLease::acquire(&backups_dir, database)?;
    info!("🚀 Starting backup {}", snapshot);

    let staging = StagingArea::new(&settings.tmp_root).acquire(&snapshot.name())?;

    info!("📦 Dumping database {} (binary)...", database);
    dump_database(runtime, settings, database, DumpFormat::Custom, &staging.join(STRUCTURED_DUMP))?;

    info!("📄 Dumping database {} (plain SQL)...", database);
    dump_database(runtime, settings, database, DumpFormat::Plain, &staging.join(SQL_DUMP))?;

    capture_filestore(runtime, settings, database, &staging)?;

    let archive_path = backups_dir.join(snapshot.archive_file_name());
    info!("🗜️ Compressing to {}...", archive_path.display());
    create_tar_gz_archive(staging.path(), &archive_path)?;

    if let Err(e) = staging.release() {
        warn!("Failed to remove staging directory after backup of {}: {}", database, e);
    }
    Ok(archive_path)
}

/// Copies the database's object store into `staging/filestore`. A database
/// without one (e.g. freshly created) is backed up without it.
fn capture_filestore(
    runtime: &dyn ContainerRuntime,
    settings: &Settings,
    database: &str,
    staging: &StagingDir,
) -> Result<()> {
    let container = settings.app_container();
    let filestore_path = settings.filestore_path(database);

    info!("🗃️ Copying filestore...");
    if !runtime.path_exists(&container, &filestore_path)? {
        warn!(
            "Filestore path {} not found in container {}. Continuing backup without filestore (database may be new or unused).",
            filestore_path, container
        );
        return Ok(());
    }

    runtime.copy(
        &container_path(&container, &filestore_path),
        &staging.join(FILESTORE_DIR).to_string_lossy(),
    )
}
