use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    /// Project root or a required setting is missing.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A container, database or archiver command exited non-zero.
    #[error("Command `{command}` failed: {stderr}")]
    Command { command: String, stderr: String },

    #[error("No backup found for '{0}'")]
    NotFound(String),

    #[error("Invalid archive {}: {reason}", .archive.display())]
    InvalidArchive { archive: PathBuf, reason: String },

    #[error("Database '{0}' is busy: another backup or restore job holds its lease")]
    Locked(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Directory walk error: {0}")]
    WalkDir(#[from] walkdir::Error),
}

impl AppError {
    pub fn command(command: impl Into<String>, stderr: impl Into<String>) -> Self {
        AppError::Command {
            command: command.into(),
            stderr: stderr.into(),
        }
    }

    pub fn invalid_archive(archive: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        AppError::InvalidArchive {
            archive: archive.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
