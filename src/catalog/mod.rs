//! The backups directory: the only persistent state of the tool.
//!
//! There is no index. Every lookup reads the directory and compares
//! modification times, so "latest" is always computed from what is on disk.

mod snapshot;

pub use snapshot::{Snapshot, TIMESTAMP_FORMAT};

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Local};
use serde::Serialize;
use tracing::debug;

use crate::archive::ArchiveFormat;
use crate::errors::{AppError, Result};

/// Filename suffixes a restore candidate may carry after the source prefix.
/// `.gz` covers the native `{database}_{timestamp}.gz` archives.
const CANDIDATE_SUFFIXES: &[&str] = &[".tar.gz", ".tar.tar.gz", ".zip", ".gz"];

#[derive(Debug, Clone, Serialize)]
pub struct CatalogEntry {
    pub file_name: String,
    pub path: PathBuf,
    pub size: u64,
    pub modified: DateTime<Local>,
    pub format: ArchiveFormat,
    /// Set when the name matches the backup job's naming scheme.
    pub snapshot: Option<Snapshot>,
}

fn is_candidate_name(file_name: &str, source_name: &str) -> bool {
    // hidden files are leases and partially written archives
    if file_name.starts_with('.') && !source_name.starts_with('.') {
        return false;
    }
    file_name.starts_with(source_name)
        && CANDIDATE_SUFFIXES.iter().any(|suffix| {
            file_name.ends_with(suffix) && file_name.len() >= source_name.len() + suffix.len()
        })
}

fn modified(path: &Path) -> Result<SystemTime> {
    Ok(fs::metadata(path)?.modified()?)
}

/// Finds the archive a restore of `source_name` should use.
///
/// Candidates are the file named exactly `source_name` plus every file named
/// `{source_name}*` with one of the recognized archive suffixes. Duplicates
/// (same canonical path) are collapsed and the most recently modified
/// candidate wins; equal modification times are not ordered.
pub fn resolve(backups_dir: &Path, source_name: &str) -> Result<PathBuf> {
    let mut candidates: BTreeMap<PathBuf, PathBuf> = BTreeMap::new();

    let exact = backups_dir.join(source_name);
    if !source_name.is_empty() && exact.is_file() {
        candidates.insert(exact.canonicalize()?, exact);
    }

    if backups_dir.is_dir() {
        for entry in fs::read_dir(backups_dir)? {
            let entry = entry?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            let path = entry.path();
            if is_candidate_name(name, source_name) && path.is_file() {
                candidates.insert(path.canonicalize()?, path);
            }
        }
    }

    let mut newest: Option<(SystemTime, PathBuf)> = None;
    for path in candidates.into_values() {
        let mtime = modified(&path)?;
        debug!("Restore candidate {} (modified {:?})", path.display(), mtime);
        if newest.as_ref().is_none_or(|(best, _)| mtime > *best) {
            newest = Some((mtime, path));
        }
    }

    newest
        .map(|(_, path)| path)
        .ok_or_else(|| AppError::NotFound(source_name.to_string()))
}

/// Lists the archives in `backups_dir`, newest first, optionally only those
/// whose name starts with `prefix`.
pub fn list(backups_dir: &Path, prefix: Option<&str>) -> Result<Vec<CatalogEntry>> {
    if !backups_dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut entries = Vec::new();
    for entry in fs::read_dir(backups_dir)? {
        let entry = entry?;
        let Ok(file_name) = entry.file_name().into_string() else {
            continue;
        };
        if !is_candidate_name(&file_name, prefix.unwrap_or_default()) {
            continue;
        }
        let metadata = entry.metadata()?;
        if !metadata.is_file() {
            continue;
        }
        let path = entry.path();
        entries.push(CatalogEntry {
            format: ArchiveFormat::detect(&path)?,
            snapshot: Snapshot::parse_archive_name(&file_name),
            size: metadata.len(),
            modified: DateTime::<Local>::from(metadata.modified()?),
            file_name,
            path,
        });
    }

    entries.sort_by(|a, b| b.modified.cmp(&a.modified).then_with(|| a.file_name.cmp(&b.file_name)));
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::time::Duration;
    use tempfile::tempdir;

    fn touch(dir: &Path, name: &str, age_secs: u64) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, b"\x1f\x8b").unwrap();
        let mtime = SystemTime::now() - Duration::from_secs(age_secs);
        File::options()
            .write(true)
            .open(&path)
            .unwrap()
            .set_modified(mtime)
            .unwrap();
        path
    }

    #[test]
    fn newest_matching_candidate_wins() {
        let dir = tempdir().unwrap();
        touch(dir.path(), "shop_20240101000000.tar.gz", 300);
        let newer = touch(dir.path(), "shop_export.zip", 10);
        touch(dir.path(), "shopping_20250101000000.txt", 1);
        touch(dir.path(), "other_20250101000000.gz", 0);

        let chosen = resolve(dir.path(), "shop").unwrap();
        assert_eq!(chosen, newer);
    }

    #[test]
    fn native_gz_archive_is_a_candidate() {
        let dir = tempdir().unwrap();
        let native = touch(dir.path(), "shop_20240101000000.gz", 0);
        touch(dir.path(), "shop_20231231000000.tar.tar.gz", 60);

        assert_eq!(resolve(dir.path(), "shop").unwrap(), native);
    }

    #[test]
    fn exact_name_is_a_candidate_regardless_of_suffix() {
        let dir = tempdir().unwrap();
        let exact = touch(dir.path(), "nightly.backup", 0);
        touch(dir.path(), "nightly_old.zip", 100);

        assert_eq!(resolve(dir.path(), "nightly.backup").unwrap(), exact);
    }

    #[test]
    fn exact_match_also_matching_a_pattern_is_counted_once() {
        let dir = tempdir().unwrap();
        let only = touch(dir.path(), "shop.zip", 0);
        assert_eq!(resolve(dir.path(), "shop.zip").unwrap(), only);
    }

    #[test]
    fn no_candidate_is_not_found() {
        let dir = tempdir().unwrap();
        touch(dir.path(), "crm_20240101000000.gz", 0);
        touch(dir.path(), ".shop.lock", 0);

        let err = resolve(dir.path(), "shop").unwrap_err();
        assert!(matches!(err, AppError::NotFound(name) if name == "shop"));

        let err = resolve(&dir.path().join("missing"), "shop").unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[test]
    fn list_is_newest_first_and_parses_native_names() {
        let dir = tempdir().unwrap();
        touch(dir.path(), "shop_20240101000000.gz", 100);
        touch(dir.path(), "shop_export.zip", 0);
        touch(dir.path(), ".shop_20240101000000.gz.partial", 0);
        fs::create_dir(dir.path().join("old.zip")).unwrap();

        let entries = list(dir.path(), None).unwrap();
        let names: Vec<&str> = entries.iter().map(|e| e.file_name.as_str()).collect();
        assert_eq!(names, ["shop_export.zip", "shop_20240101000000.gz"]);
        assert!(entries[0].snapshot.is_none());
        assert_eq!(entries[1].snapshot.as_ref().unwrap().database, "shop");

        assert!(list(dir.path(), Some("crm")).unwrap().is_empty());
        assert!(list(&dir.path().join("missing"), None).unwrap().is_empty());
    }
}
