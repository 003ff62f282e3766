mod db_restore;
mod logic;

use crate::config::Settings;
use crate::container::ContainerRuntime;
use crate::errors::Result;

pub use logic::RestoreSummary;

/// Public entry point for the restore process.
///
/// Picks the newest backup matching `source_name` and restores it into the
/// database `target`, replacing that database and merging its filestore.
pub fn run_restore_flow(
    runtime: &dyn ContainerRuntime,
    settings: &Settings,
    source_name: &str,
    target: &str,
) -> Result<RestoreSummary> {
    logic::perform_restore_orchestration(runtime, settings, source_name, target)
}
