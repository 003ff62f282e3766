// odootool/src/restore/logic.rs
use std::fmt;
use std::path::PathBuf;

use chrono::Local;
use tracing::{debug, error, info, warn};

use super::db_restore::{load_sql_dump, recreate_database, restore_filestore};
use crate::archive::{self, ArchiveFormat, FILESTORE_DIR, SQL_DUMP};
use crate::catalog::{self, TIMESTAMP_FORMAT};
use crate::config::Settings;
use crate::container::ContainerRuntime;
use crate::errors::{AppError, Result};
use crate::utils::lease::DatabaseLease;
use crate::utils::staging::StagingArea;

/// Steps of a restore job, in the order they run. None is ever re-entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreStage {
    Resolving,
    Extracting,
    Validating,
    Recreating,
    Loading,
    RestoringFilestore,
    CleaningUp,
    Done,
}

impl fmt::Display for RestoreStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RestoreStage::Resolving => "resolving archive",
            RestoreStage::Extracting => "extracting archive",
            RestoreStage::Validating => "validating archive",
            RestoreStage::Recreating => "recreating database",
            RestoreStage::Loading => "loading SQL dump",
            RestoreStage::RestoringFilestore => "restoring filestore",
            RestoreStage::CleaningUp => "cleaning up",
            RestoreStage::Done => "done",
        };
        f.write_str(name)
    }
}

/// What a finished restore did.
#[derive(Debug, Clone)]
pub struct RestoreSummary {
    pub archive: PathBuf,
    pub format: ArchiveFormat,
    pub target: String,
    pub filestore_restored: bool,
}

/// Restores the newest archive matching `source_name` into `target`.
///
/// The archive is validated before the target database is touched: an archive
/// without `dump.sql` fails with [`AppError::InvalidArchive`] and leaves the
/// target as it was.
pub fn perform_restore_orchestration(
    runtime: &dyn ContainerRuntime,
    settings: &Settings,
    source_name: &str,
    target: &str,
) -> Result<RestoreSummary> {
    let mut stage = RestoreStage::Resolving;
    let result = run_stages(runtime, settings, source_name, target, &mut stage);
    match &result {
        Ok(_) => debug!("Restore of {} reached stage: {}", target, stage),
        Err(e) => error!("Restore of {} failed while {}: {}", target, stage, e),
    }
    result
}

fn enter(stage: &mut RestoreStage, next: RestoreStage) {
    debug!("Restore stage: {} -> {}", stage, next);
    *stage = next;
}

fn run_stages(
    runtime: &dyn ContainerRuntime,
    settings: &Settings,
    source_name: &str,
    target: &str,
    stage: &mut RestoreStage,
) -> Result<RestoreSummary> {
    if target.trim().is_empty() {
        return Err(AppError::Config("target database name cannot be empty".into()));
    }
    let backups_dir = settings.backups_dir();
    let _lease = DatabaseLease::acquire(&backups_dir, target)?;

    let archive_path = catalog::resolve(&backups_dir, source_name)?;
    info!("Using backup {}", archive_path.display());

    enter(stage, RestoreStage::Extracting);
    let job_key = format!("restore_{}_{}", target, Local::now().format(TIMESTAMP_FORMAT));
    let staging = StagingArea::new(&settings.tmp_root).acquire(&job_key)?;
    let format = archive::extract(&archive_path, staging.path())?;

    enter(stage, RestoreStage::Validating);
    let sql_dump = staging.join(SQL_DUMP);
    if !sql_dump.is_file() {
        return Err(AppError::invalid_archive(
            &archive_path,
            format!("SQL dump file '{SQL_DUMP}' not found in backup"),
        ));
    }

    enter(stage, RestoreStage::Recreating);
    recreate_database(runtime, settings, target)?;

    enter(stage, RestoreStage::Loading);
    load_sql_dump(runtime, settings, target, &sql_dump)?;

    enter(stage, RestoreStage::RestoringFilestore);
    let staged_filestore = staging.join(FILESTORE_DIR);
    let filestore_restored = staged_filestore.is_dir();
    if filestore_restored {
        restore_filestore(runtime, settings, target, &staged_filestore)?;
    } else {
        warn!("⚠️ No filestore found in backup. Skipping filestore restore.");
    }

    enter(stage, RestoreStage::CleaningUp);
    if let Err(e) = staging.release() {
        warn!("Failed to remove staging directory after restore of {}: {}", target, e);
    }

    enter(stage, RestoreStage::Done);
    Ok(RestoreSummary {
        archive: archive_path,
        format,
        target: target.to_string(),
        filestore_restored,
    })
}
