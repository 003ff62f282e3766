// odootool/src/config/mod.rs
use std::env;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::errors::{AppError, Result};

/// File that marks the root of a compose project.
pub const PROJECT_MARKER: &str = "compose.yaml";
pub const BACKUPS_DIR_NAME: &str = "backups";
pub const DEFAULT_FILESTORE_ROOT: &str = "/var/lib/odoo/filestore";

const DEFAULT_PROJECT_NAME: &str = "odoo";
const DEFAULT_DB_USER: &str = "odoo";
const DEFAULT_DB_PASSWORD: &str = "odoo";
const DEFAULT_RESET_PASSWORD: &str = "admin";

/// Everything a job needs to know about the project it runs against.
///
/// Built once at process start and handed to each job by reference.
#[derive(Debug, Clone)]
pub struct Settings {
    pub project_root: PathBuf,
    pub project_name: String,
    pub db_user: String,
    pub db_password: String,
    pub reset_password: String,
    pub tmp_root: PathBuf,
    pub filestore_root: String,
}

impl Settings {
    /// Locates the project from the current directory, loads its `.env`
    /// and reads the recognized options from the environment.
    pub fn discover() -> Result<Self> {
        let cwd = env::current_dir()?;
        let home = env::var_os("HOME").map(PathBuf::from);
        let root = find_project_root(&cwd, home.as_deref()).ok_or_else(|| {
            AppError::Config(format!(
                "Project not found: no {} in {} or its parents. Run from the project root.",
                PROJECT_MARKER,
                cwd.display()
            ))
        })?;

        let env_path = root.join(".env");
        if env_path.is_file() {
            // Variables already set in the process environment take precedence.
            dotenv::from_path(&env_path).map_err(|e| {
                AppError::Config(format!("Failed to load {}: {}", env_path.display(), e))
            })?;
            debug!("Loaded environment from {}", env_path.display());
        }

        Self::from_lookup(root, |key| env::var(key).ok())
    }

    /// Builds settings from an arbitrary key lookup, applying defaults for
    /// absent keys and rejecting empty required values.
    pub fn from_lookup<F>(project_root: PathBuf, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let project_name = get("PROJECT_NAME", DEFAULT_PROJECT_NAME);
        let db_user = get("POSTGRES_USER", DEFAULT_DB_USER);
        if project_name.trim().is_empty() {
            return Err(AppError::Config("PROJECT_NAME cannot be empty".into()));
        }
        if db_user.trim().is_empty() {
            return Err(AppError::Config("POSTGRES_USER cannot be empty".into()));
        }

        let tmp_root = lookup("ODOOTOOL_TMP_ROOT")
            .filter(|s| !s.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(env::temp_dir);

        Ok(Settings {
            project_root,
            project_name,
            db_user,
            db_password: get("POSTGRES_PASSWORD", DEFAULT_DB_PASSWORD),
            reset_password: get("RESET_PASSWORD", DEFAULT_RESET_PASSWORD),
            tmp_root,
            filestore_root: DEFAULT_FILESTORE_ROOT.to_string(),
        })
    }

    pub fn db_container(&self) -> String {
        format!("{}_postgres", self.project_name)
    }

    pub fn app_container(&self) -> String {
        format!("{}_odoo", self.project_name)
    }

    pub fn backups_dir(&self) -> PathBuf {
        self.project_root.join(BACKUPS_DIR_NAME)
    }

    /// Object-store path of `database` inside the application container.
    pub fn filestore_path(&self, database: &str) -> String {
        format!("{}/{}", self.filestore_root.trim_end_matches('/'), database)
    }
}

/// Walks upward from `start` looking for [`PROJECT_MARKER`]. The search
/// stops after checking `home` when `start` lies below it.
pub fn find_project_root(start: &Path, home: Option<&Path>) -> Option<PathBuf> {
    for dir in start.ancestors() {
        if dir.join(PROJECT_MARKER).is_file() {
            return Some(dir.to_path_buf());
        }
        if Some(dir) == home {
            break;
        }
    }
    None
}
