// odootool/src/backup/db_dump.rs
use std::path::Path;

use tracing::{debug, info, warn};

use crate::config::Settings;
use crate::container::{ContainerRuntime, container_path};
use crate::errors::Result;

/// Output formats of `pg_dump` captured by a backup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DumpFormat {
    /// `-Fc`, the engine's binary archive format.
    Custom,
    /// `-Fp`, plain SQL replayable with `psql`.
    Plain,
}

impl DumpFormat {
    fn flag(self) -> &'static str {
        match self {
            DumpFormat::Custom => "-Fc",
            DumpFormat::Plain => "-Fp",
        }
    }

    fn container_tmp_path(self, database: &str) -> String {
        match self {
            DumpFormat::Custom => format!("/tmp/{database}.dump"),
            DumpFormat::Plain => format!("/tmp/{database}.sql"),
        }
    }
}

/// Dumps `database` inside the database container and copies the result to
/// `host_dest`.
///
/// The in-container temporary file is removed whether or not the dump or the
/// copy succeeded. The first failure of dump, copy, cleanup is returned.
pub fn dump_database(
    runtime: &dyn ContainerRuntime,
    settings: &Settings,
    database: &str,
    format: DumpFormat,
    host_dest: &Path,
) -> Result<()> {
    let container = settings.db_container();
    let tmp_path = format.container_tmp_path(database);
    debug!("Dumping {} with pg_dump {} to {}:{}", database, format.flag(), container, tmp_path);

    let dumped = runtime.exec(
        &container,
        &[("PGPASSWORD", settings.db_password.as_str())],
        &[
            "pg_dump",
            format.flag(),
            "-h",
            "localhost",
            "-U",
            &settings.db_user,
            "-d",
            database,
            "-f",
            &tmp_path,
        ],
    );

    let copied = dumped.and_then(|_| {
        runtime.copy(
            &container_path(&container, &tmp_path),
            &host_dest.to_string_lossy(),
        )
    });

    let cleaned = runtime.exec(&container, &[], &["rm", "-f", &tmp_path]);
    if let (Err(_), Err(e)) = (&copied, &cleaned) {
        warn!("Could not remove {} from {}: {}", tmp_path, container, e);
    }

    copied?;
    cleaned?;
    info!("✓ {:?} dump of {} saved to {}", format, database, host_dest.display());
    Ok(())
}
