mod db_dump;
mod logic;

use std::path::PathBuf;

use crate::catalog::Snapshot;
use crate::config::Settings;
use crate::container::ContainerRuntime;
use crate::errors::Result;

/// Public entry point for the backup process.
///
/// Snapshots `database` as of now into `backups/{database}_{timestamp}.gz`.
pub fn run_backup_flow(
    runtime: &dyn ContainerRuntime,
    settings: &Settings,
    database: &str,
) -> Result<PathBuf> {
    logic::perform_backup_orchestration(runtime, settings, &Snapshot::now(database))
}
