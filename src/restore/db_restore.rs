// odootool/src/restore/db_restore.rs
use std::path::Path;

use tracing::{info, warn};

use crate::config::Settings;
use crate::container::{ContainerRuntime, container_path};
use crate::errors::Result;

/// Drops `database` if it exists and creates it empty.
pub fn recreate_database(
    runtime: &dyn ContainerRuntime,
    settings: &Settings,
    database: &str,
) -> Result<()> {
    let container = settings.db_container();
    let env = [("PGPASSWORD", settings.db_password.as_str())];

    info!("🗑️ Dropping existing database {} (if any)...", database);
    runtime.exec(
        &container,
        &env,
        &["dropdb", "--if-exists", "-h", "localhost", "-U", &settings.db_user, database],
    )?;

    info!("🧱 Creating database {}...", database);
    runtime.exec(
        &container,
        &env,
        &["createdb", "-h", "localhost", "-U", &settings.db_user, database],
    )?;
    Ok(())
}

/// Replays the plain SQL dump at `sql_dump` into `database` with `psql`.
///
/// The dump is staged inside the database container under a name unique to
/// the target and removed afterwards, also when `psql` fails.
pub fn load_sql_dump(
    runtime: &dyn ContainerRuntime,
    settings: &Settings,
    database: &str,
    sql_dump: &Path,
) -> Result<()> {
    let container = settings.db_container();
    let tmp_path = format!("/tmp/restore_{database}.sql");

    info!("📄 Restoring {} from SQL dump...", database);
    runtime.copy(&sql_dump.to_string_lossy(), &container_path(&container, &tmp_path))?;

    let loaded = runtime.exec(
        &container,
        &[("PGPASSWORD", settings.db_password.as_str())],
        &["psql", "-h", "localhost", "-U", &settings.db_user, "-d", database, "-f", &tmp_path],
    );
    let cleaned = runtime.exec(&container, &[], &["rm", "-f", &tmp_path]);
    if let (Err(_), Err(e)) = (&loaded, &cleaned) {
        warn!("Could not remove {} from {}: {}", tmp_path, container, e);
    }

    let output = loaded?;
    cleaned?;
    // without ON_ERROR_STOP psql keeps going past failing statements
    for line in output.stderr.lines().filter(|l| l.contains("ERROR")) {
        warn!("psql: {}", line);
    }
    Ok(())
}

/// Copies the contents of the staged filestore into the object store of
/// `database`. Files already present there and not in the backup are kept.
pub fn restore_filestore(
    runtime: &dyn ContainerRuntime,
    settings: &Settings,
    database: &str,
    staged_filestore: &Path,
) -> Result<()> {
    let container = settings.app_container();
    let filestore_path = settings.filestore_path(database);

    info!("🗃️ Restoring filestore to {}:{}...", container, filestore_path);
    runtime.exec(&container, &[], &["mkdir", "-p", &filestore_path])?;
    runtime.copy(
        &format!("{}/.", staged_filestore.display()),
        &container_path(&container, &filestore_path),
    )?;
    Ok(())
}
