// odootool/src/container/docker.rs
use std::path::PathBuf;
use std::process::{Command, Output};

use tracing::{debug, trace};
use which::which;

use super::{ContainerRuntime, ExecOutput};
use crate::errors::{AppError, Result};

/// [`ContainerRuntime`] backed by the `docker` command-line client.
#[derive(Debug, Clone)]
pub struct Docker {
    executable: PathBuf,
}

impl Docker {
    /// Finds the docker executable in the system PATH.
    pub fn locate() -> Result<Self> {
        let executable = which("docker").map_err(|e| {
            AppError::Config(format!(
                "docker executable not found in PATH ({e}). Please ensure the docker CLI is installed."
            ))
        })?;
        debug!("Found docker executable at: {}", executable.display());
        Ok(Self { executable })
    }

    fn run(&self, args: &[String], shown: &str) -> Result<Output> {
        trace!("Running: {}", shown);
        Command::new(&self.executable)
            .args(args)
            .output()
            .map_err(|e| AppError::command(shown, format!("failed to spawn docker: {e}")))
    }

    fn run_checked(&self, args: &[String], shown: &str) -> Result<ExecOutput> {
        let output = self.run(args, shown)?;
        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        if !output.status.success() {
            let stderr = if stderr.trim().is_empty() {
                format!("exited with {}", output.status)
            } else {
                stderr.trim_end().to_string()
            };
            return Err(AppError::command(shown, stderr));
        }
        Ok(ExecOutput { stdout, stderr })
    }
}

/// Builds the `docker exec` argument list plus a printable form in which
/// environment values are masked.
fn exec_args(container: &str, env: &[(&str, &str)], command: &[&str]) -> (Vec<String>, String) {
    let mut args = vec!["exec".to_string()];
    let mut shown = vec!["docker".to_string(), "exec".to_string()];
    for (key, value) in env {
        args.push("-e".into());
        args.push(format!("{key}={value}"));
        shown.push("-e".into());
        shown.push(format!("{key}=***"));
    }
    args.push(container.to_string());
    shown.push(container.to_string());
    for part in command {
        args.push(part.to_string());
        shown.push(part.to_string());
    }
    (args, shown.join(" "))
}

impl ContainerRuntime for Docker {
    fn exec(&self, container: &str, env: &[(&str, &str)], command: &[&str]) -> Result<ExecOutput> {
        let (args, shown) = exec_args(container, env, command);
        self.run_checked(&args, &shown)
    }

    fn copy(&self, src: &str, dst: &str) -> Result<()> {
        let args = vec!["cp".to_string(), src.to_string(), dst.to_string()];
        let shown = format!("docker cp {src} {dst}");
        self.run_checked(&args, &shown).map(|_| ())
    }

    fn path_exists(&self, container: &str, path: &str) -> Result<bool> {
        let (args, shown) = exec_args(container, &[], &["test", "-d", path]);
        Ok(self.run(&args, &shown)?.status.success())
    }
}
