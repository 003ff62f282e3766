//! Database housekeeping commands that run next to backup and restore.

use tracing::info;

use crate::config::Settings;
use crate::container::ContainerRuntime;
use crate::errors::{AppError, Result};
use crate::utils::lease::DatabaseLease;

const LIST_QUERY: &str = "SELECT datname FROM pg_database WHERE datistemplate = false;";

/// Names of all non-template databases on the database server.
pub fn list_databases(runtime: &dyn ContainerRuntime, settings: &Settings) -> Result<Vec<String>> {
    let output = runtime.exec(
        &settings.db_container(),
        &[("PGPASSWORD", settings.db_password.as_str())],
        &["psql", "-U", &settings.db_user, "-d", "postgres", "-At", "-c", LIST_QUERY],
    )?;
    Ok(output
        .stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

/// Terminates open connections to `database` and drops it.
pub fn drop_database(runtime: &dyn ContainerRuntime, settings: &Settings, database: &str) -> Result<()> {
    if database.trim().is_empty() {
        return Err(AppError::Config("database name cannot be empty".into()));
    }
    if database.eq_ignore_ascii_case("postgres") {
        return Err(AppError::Config(
            "'postgres' is the maintenance database and cannot be dropped".into(),
        ));
    }
    let _lease = DatabaseLease::acquire(&settings.backups_dir(), database)?;

    let container = settings.db_container();
    let env = [("PGPASSWORD", settings.db_password.as_str())];
    let terminate_sql = format!(
        "SELECT pg_terminate_backend(pid) FROM pg_stat_activity WHERE datname = '{}' AND pid <> pg_backend_pid();",
        database.replace('\'', "''")
    );
    runtime.exec(
        &container,
        &env,
        &["psql", "-U", &settings.db_user, "-d", "postgres", "-c", &terminate_sql],
    )?;
    runtime.exec(&container, &env, &["dropdb", "-U", &settings.db_user, database])?;
    info!("Database '{}' dropped", database);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::fake::FakeRuntime;
    use tempfile::tempdir;

    #[test]
    fn lists_databases_from_psql_output() {
        let tmp = tempdir().unwrap();
        let runtime = FakeRuntime::new(tmp.path())
            .with_database("shop", "")
            .with_database("crm", "");
        let settings = Settings::from_lookup(tmp.path().to_path_buf(), |_| None).unwrap();

        assert_eq!(list_databases(&runtime, &settings).unwrap(), ["crm", "shop"]);
    }

    #[test]
    fn drop_terminates_connections_then_drops() {
        let tmp = tempdir().unwrap();
        let runtime = FakeRuntime::new(tmp.path()).with_database("shop", "");
        let settings = Settings::from_lookup(tmp.path().to_path_buf(), |_| None).unwrap();

        drop_database(&runtime, &settings, "shop").unwrap();

        assert!(runtime.database("shop").is_none());
        let commands = runtime.commands();
        assert!(commands[0].contains("pg_terminate_backend"));
        assert_eq!(commands[1], "exec odoo_postgres dropdb -U odoo shop");

        let err = drop_database(&runtime, &settings, "shop").unwrap_err();
        assert!(matches!(err, AppError::Command { .. }));
    }

    #[test]
    fn maintenance_database_is_protected() {
        let tmp = tempdir().unwrap();
        let runtime = FakeRuntime::new(tmp.path());
        let settings = Settings::from_lookup(tmp.path().to_path_buf(), |_| None).unwrap();

        assert!(drop_database(&runtime, &settings, "postgres").is_err());
        assert!(runtime.commands().is_empty());
    }
}
