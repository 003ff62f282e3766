//! Archive codec: packing a staging directory into a native snapshot and
//! unpacking native or foreign snapshots back into the common layout.
//!
//! Whatever produced the archive, a successful [`extract`] leaves `dump.sql`
//! and the optional `filestore/` directly under the destination directory.

mod tar_gz;
mod zip_archive;

pub use tar_gz::{TarGzCodec, create_tar_gz_archive};
pub use zip_archive::ZipCodec;

use std::fs::{self, File};
use std::io::{ErrorKind, Read};
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::errors::Result;

/// Plain SQL dump; the only member restore requires.
pub const SQL_DUMP: &str = "dump.sql";
/// Engine-specific binary dump, carried along but never read by restore.
pub const STRUCTURED_DUMP: &str = "dump.dump";
/// Copy of the database's object store.
pub const FILESTORE_DIR: &str = "filestore";

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];
const ZIP_MAGIC: [u8; 4] = [b'P', b'K', 0x03, 0x04];

/// Unpacks one archive container format into a directory.
pub trait ArchiveCodec {
    fn name(&self) -> &'static str;

    fn unpack(&self, archive: &Path, dest: &Path) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArchiveFormat {
    TarGz,
    Zip,
}

impl ArchiveFormat {
    /// Sniffs the leading magic bytes; unrecognized content falls back to the
    /// file extension, where anything but `.zip` is treated as gzip-tar.
    pub fn detect(path: &Path) -> Result<Self> {
        let mut head = [0u8; 4];
        let mut file = File::open(path)?;
        let read = file.read(&mut head)?;

        if read >= ZIP_MAGIC.len() && head == ZIP_MAGIC {
            return Ok(ArchiveFormat::Zip);
        }
        if read >= GZIP_MAGIC.len() && head[..2] == GZIP_MAGIC {
            return Ok(ArchiveFormat::TarGz);
        }
        Ok(Self::from_extension(path))
    }

    pub fn from_extension(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("zip") => ArchiveFormat::Zip,
            _ => ArchiveFormat::TarGz,
        }
    }

    pub fn codec(self) -> &'static dyn ArchiveCodec {
        match self {
            ArchiveFormat::TarGz => &TarGzCodec,
            ArchiveFormat::Zip => &ZipCodec,
        }
    }
}

/// Extracts `archive` into `dest` and normalizes the layout.
pub fn extract(archive: &Path, dest: &Path) -> Result<ArchiveFormat> {
    let format = ArchiveFormat::detect(archive)?;
    let codec = format.codec();
    info!(
        "Extracting {} archive {} to {}",
        codec.name(),
        archive.display(),
        dest.display()
    );
    fs::create_dir_all(dest)?;
    codec.unpack(archive, dest)?;
    hoist_nested_snapshot(dest)?;
    Ok(format)
}

/// Foreign exporters sometimes wrap the snapshot in one or more directories.
/// Moves the shallowest directory holding `dump.sql` up to `dest`. Members of
/// that directory replace root entries of the same name.
fn hoist_nested_snapshot(dest: &Path) -> Result<()> {
    if dest.join(SQL_DUMP).is_file() {
        return Ok(());
    }

    let mut nested: Option<(usize, PathBuf)> = None;
    for entry in WalkDir::new(dest).min_depth(2).sort_by_file_name() {
        let entry = entry?;
        if entry.file_type().is_file() && entry.file_name() == SQL_DUMP {
            if nested.as_ref().is_none_or(|(depth, _)| entry.depth() < *depth) {
                nested = Some((entry.depth(), entry.path().to_path_buf()));
            }
        }
    }
    let Some((_, dump)) = nested else {
        return Ok(());
    };
    let Some(snapshot_dir) = dump.parent() else {
        return Ok(());
    };

    debug!("Hoisting nested snapshot {} to {}", snapshot_dir.display(), dest.display());
    // Park the directory first so a member named like its wrapper cannot collide.
    let parked = dest.join(".hoist");
    fs::rename(snapshot_dir, &parked)?;
    for entry in fs::read_dir(&parked)? {
        let entry = entry?;
        let target = dest.join(entry.file_name());
        match fs::symlink_metadata(&target) {
            Ok(meta) => {
                warn!(
                    "Archive holds both {} and a nested {}; keeping the nested snapshot's copy",
                    target.display(),
                    entry.path().display()
                );
                if meta.is_dir() {
                    fs::remove_dir_all(&target)?;
                } else {
                    fs::remove_file(&target)?;
                }
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        fs::rename(entry.path(), target)?;
    }
    fs::remove_dir_all(&parked)?;
    Ok(())
}
