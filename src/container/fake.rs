//! In-process stand-in for docker used by the job tests.
//!
//! Every container gets a directory under the fake's root that plays the role
//! of its filesystem. Databases are plain SQL text held in memory; `pg_dump`
//! writes that text out and `psql -f` appends a file to it.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use walkdir::WalkDir;

use super::{ContainerRuntime, ExecOutput};
use crate::errors::{AppError, Result};

pub(crate) const CUSTOM_FORMAT_MAGIC: &str = "PGDMP";

#[derive(Debug, Default)]
struct FakeState {
    databases: BTreeMap<String, String>,
    commands: Vec<String>,
    failures: Vec<String>,
}

#[derive(Debug)]
pub(crate) struct FakeRuntime {
    root: PathBuf,
    state: Mutex<FakeState>,
}

impl FakeRuntime {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            state: Mutex::new(FakeState::default()),
        }
    }

    pub fn with_database(self, name: &str, sql: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .databases
            .insert(name.to_string(), sql.to_string());
        self
    }

    /// Makes every command whose printed form contains `pattern` fail.
    pub fn fail_when(self, pattern: &str) -> Self {
        self.state.lock().unwrap().failures.push(pattern.to_string());
        self
    }

    pub fn database(&self, name: &str) -> Option<String> {
        self.state.lock().unwrap().databases.get(name).cloned()
    }

    pub fn commands(&self) -> Vec<String> {
        self.state.lock().unwrap().commands.clone()
    }

    /// Host directory standing in for `path` inside `container`.
    pub fn container_dir(&self, container: &str, path: &str) -> PathBuf {
        self.root.join(container).join(path.trim_start_matches('/'))
    }

    fn resolve(&self, endpoint: &str) -> PathBuf {
        match endpoint.split_once(':') {
            Some((container, path)) if !container.contains('/') => self.container_dir(container, path),
            _ => PathBuf::from(endpoint),
        }
    }

    fn record(&self, shown: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.commands.push(shown.to_string());
        if state.failures.iter().any(|p| shown.contains(p.as_str())) {
            return Err(AppError::command(shown, "injected failure"));
        }
        Ok(())
    }
}

fn flag_value<'a>(command: &[&'a str], flag: &str) -> Option<&'a str> {
    command
        .iter()
        .position(|part| *part == flag)
        .and_then(|i| command.get(i + 1))
        .copied()
}

fn copy_dir_contents(src: &Path, dst: &Path) -> std::io::Result<()> {
    fs::create_dir_all(dst)?;
    for entry in WalkDir::new(src).min_depth(1) {
        let entry = entry.map_err(std::io::Error::other)?;
        let target = dst.join(entry.path().strip_prefix(src).map_err(std::io::Error::other)?);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
        } else {
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

impl ContainerRuntime for FakeRuntime {
    fn exec(&self, container: &str, _env: &[(&str, &str)], command: &[&str]) -> Result<ExecOutput> {
        let shown = format!("exec {} {}", container, command.join(" "));
        self.record(&shown)?;
        let fail = |msg: String| Err(AppError::command(&shown, msg));
        let last = command.last().copied().unwrap_or_default();

        match command.first().copied() {
            Some("pg_dump") => {
                let db = flag_value(command, "-d").unwrap_or_default();
                let Some(sql) = self.database(db) else {
                    return fail(format!("database \"{db}\" does not exist"));
                };
                let out = self.container_dir(container, flag_value(command, "-f").unwrap_or_default());
                let body = if command.contains(&"-Fc") {
                    format!("{CUSTOM_FORMAT_MAGIC}{sql}")
                } else {
                    sql
                };
                if let Some(parent) = out.parent() {
                    fs::create_dir_all(parent)?;
                }
                fs::write(out, body)?;
            }
            Some("rm") => {
                let path = self.container_dir(container, last);
                if fs::remove_file(&path).is_err() && !command.contains(&"-f") {
                    return fail(format!("cannot remove '{last}': No such file or directory"));
                }
            }
            Some("dropdb") => {
                let removed = self.state.lock().unwrap().databases.remove(last);
                if removed.is_none() && !command.contains(&"--if-exists") {
                    return fail(format!("database \"{last}\" does not exist"));
                }
            }
            Some("createdb") => {
                let mut state = self.state.lock().unwrap();
                if state.databases.contains_key(last) {
                    return fail(format!("database \"{last}\" already exists"));
                }
                state.databases.insert(last.to_string(), String::new());
            }
            Some("psql") => {
                let db = flag_value(command, "-d").unwrap_or_default();
                if let Some(file) = flag_value(command, "-f") {
                    let sql = fs::read_to_string(self.container_dir(container, file))?;
                    let mut state = self.state.lock().unwrap();
                    let Some(current) = state.databases.get_mut(db) else {
                        return fail(format!("database \"{db}\" does not exist"));
                    };
                    current.push_str(&sql);
                } else if flag_value(command, "-c").is_some_and(|q| q.contains("FROM pg_database")) {
                    let names: Vec<String> = self.state.lock().unwrap().databases.keys().cloned().collect();
                    return Ok(ExecOutput {
                        stdout: names.join("\n") + "\n",
                        stderr: String::new(),
                    });
                }
            }
            Some("mkdir") => fs::create_dir_all(self.container_dir(container, last))?,
            Some("test") => {
                if !self.container_dir(container, last).is_dir() {
                    return fail(String::new());
                }
            }
            other => return fail(format!("unknown command {other:?}")),
        }
        Ok(ExecOutput::default())
    }

    fn copy(&self, src: &str, dst: &str) -> Result<()> {
        let shown = format!("cp {src} {dst}");
        self.record(&shown)?;

        let (src_path, contents_only) = match src.strip_suffix("/.") {
            Some(dir) => (self.resolve(dir), true),
            None => (self.resolve(src), false),
        };
        let dst_path = self.resolve(dst);

        if !src_path.exists() {
            return Err(AppError::command(shown, format!("no such file or directory: {src}")));
        }
        if contents_only {
            copy_dir_contents(&src_path, &dst_path)?;
        } else if src_path.is_dir() {
            let target = match (dst_path.is_dir(), src_path.file_name()) {
                (true, Some(name)) => dst_path.join(name),
                _ => dst_path,
            };
            copy_dir_contents(&src_path, &target)?;
        } else {
            let target = match (dst_path.is_dir(), src_path.file_name()) {
                (true, Some(name)) => dst_path.join(name),
                _ => dst_path,
            };
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(&src_path, target)?;
        }
        Ok(())
    }

    fn path_exists(&self, container: &str, path: &str) -> Result<bool> {
        self.record(&format!("exec {container} test -d {path}"))?;
        Ok(self.container_dir(container, path).is_dir())
    }
}
