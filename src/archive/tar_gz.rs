// odootool/src/archive/tar_gz.rs
use std::fs::{self, File};
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};

use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use tar::Builder;
use tracing::info;
use walkdir::WalkDir;

use super::ArchiveCodec;
use crate::errors::{AppError, Result};

/// Creates a gzipped tar archive from the contents of `source_dir`.
///
/// Paths inside the archive are relative to `source_dir`. The archive is
/// written to a hidden temporary file next to `archive_dest_path` and renamed
/// into place once complete, so an interrupted run never leaves a truncated
/// archive under the final name. An existing file at `archive_dest_path` is
/// never replaced.
pub fn create_tar_gz_archive(source_dir: &Path, archive_dest_path: &Path) -> Result<PathBuf> {
    if !source_dir.is_dir() {
        return Err(AppError::Io(io::Error::new(
            ErrorKind::NotFound,
            format!("Source for archival is not a directory: {}", source_dir.display()),
        )));
    }
    let parent = match archive_dest_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent)?;

    info!(
        "Creating tar.gz archive from {} to {}",
        source_dir.display(),
        archive_dest_path.display()
    );

    let mut partial_builder = tempfile::Builder::new();
    partial_builder.prefix(".").suffix(".partial");
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        // same mode File::create asks for, the umask still applies
        partial_builder.permissions(fs::Permissions::from_mode(0o666));
    }
    let partial = partial_builder.tempfile_in(parent)?;
    let enc = GzEncoder::new(partial, Compression::default());
    let mut tar_builder = Builder::new(enc);

    for entry in WalkDir::new(source_dir).min_depth(1).sort_by_file_name() {
        let entry = entry?;
        let path = entry.path();
        let name = path
            .strip_prefix(source_dir)
            .map_err(|e| AppError::Io(io::Error::other(e)))?;

        if entry.file_type().is_dir() {
            tar_builder.append_dir(name, path)?;
        } else {
            tar_builder.append_path_with_name(path, name)?;
        }
    }

    let encoder = tar_builder.into_inner()?;
    let partial = encoder.finish()?;
    partial
        .persist_noclobber(archive_dest_path)
        .map_err(|e| match e.error.kind() {
            ErrorKind::AlreadyExists => AppError::Io(io::Error::new(
                ErrorKind::AlreadyExists,
                format!(
                    "Archive {} already exists, refusing to overwrite it",
                    archive_dest_path.display()
                ),
            )),
            _ => AppError::Io(e.error),
        })?;

    info!("✓ Tar.gz archive created at {}", archive_dest_path.display());
    Ok(archive_dest_path.to_path_buf())
}

/// Reader for gzip-compressed tar streams.
#[derive(Debug, Clone, Copy)]
pub struct TarGzCodec;

impl ArchiveCodec for TarGzCodec {
    fn name(&self) -> &'static str {
        "tar.gz"
    }

    fn unpack(&self, archive_path: &Path, dest: &Path) -> Result<()> {
        let archive_file = File::open(archive_path)?;
        let mut archive = tar::Archive::new(GzDecoder::new(archive_file));
        archive.unpack(dest)?;
        Ok(())
    }
}
