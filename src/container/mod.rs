//! Access to the containers of the compose project.
//!
//! Jobs only ever talk to containers through [`ContainerRuntime`], which keeps
//! the orchestration logic independent of the docker CLI.

mod docker;
#[cfg(test)]
pub(crate) mod fake;

pub use docker::Docker;

use crate::errors::Result;

/// Captured output of a command that exited successfully.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Synchronous command execution and file transfer against named containers.
///
/// A command exiting non-zero is reported as [`crate::errors::AppError::Command`]
/// carrying the command's stderr.
pub trait ContainerRuntime {
    /// Runs `command` inside `container` with the extra environment `env`.
    fn exec(&self, container: &str, env: &[(&str, &str)], command: &[&str]) -> Result<ExecOutput>;

    /// Copies `src` to `dst`; either side may be `container:path`
    /// (see [`container_path`]). A `src` ending in `/.` copies the
    /// directory's contents rather than the directory itself.
    fn copy(&self, src: &str, dst: &str) -> Result<()>;

    /// Whether `path` is an existing directory inside `container`.
    fn path_exists(&self, container: &str, path: &str) -> Result<bool>;
}

/// Formats a `container:path` copy endpoint.
pub fn container_path(container: &str, path: &str) -> String {
    format!("{container}:{path}")
}
