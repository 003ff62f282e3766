use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use zip::ZipArchive;

use super::ArchiveCodec;
use crate::errors::Result;

/// Reader for zip archives such as the application's own web export.
#[derive(Debug, Clone, Copy)]
pub struct ZipCodec;

impl ArchiveCodec for ZipCodec {
    fn name(&self) -> &'static str {
        "zip"
    }

    fn unpack(&self, archive_path: &Path, dest: &Path) -> Result<()> {
        let file = BufReader::new(File::open(archive_path)?);
        let mut archive = ZipArchive::new(file)?;
        // entries escaping `dest` are rejected by the zip crate
        archive.extract(dest)?;
        Ok(())
    }
}
