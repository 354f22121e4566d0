//! Archive extraction.
//!
//! The format is sniffed from the file content rather than trusted from the
//! name, so a `.zip` that is really a tarball still unpacks and a corrupt
//! file is rejected before anything is written.

use flate2::read::GzDecoder;
use std::fs::{self, File};
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Bytes read up front for format detection. Tar magic sits at offset 257.
const SNIFF_LEN: u64 = 512;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("cannot open archive {}: {source}", path.display())]
    Open { path: PathBuf, source: io::Error },
    #[error("unsupported archive format ({detected})")]
    UnsupportedFormat { detected: String },
    #[error("corrupt zip archive: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("extraction failed: {0}")]
    Io(#[from] io::Error),
}

/// Container formats that can be unpacked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    Zip,
    Tar,
    TarGz,
    /// A single gzip-compressed file.
    Gzip,
}

fn read_head<R: Read>(reader: R) -> io::Result<Vec<u8>> {
    let mut head = Vec::with_capacity(SNIFF_LEN as usize);
    reader.take(SNIFF_LEN).read_to_end(&mut head)?;
    Ok(head)
}

fn open(path: &Path) -> Result<File, ExtractError> {
    File::open(path).map_err(|source| ExtractError::Open {
        path: path.to_path_buf(),
        source,
    })
}

/// Detects the archive format of the file at `path` from its content.
pub fn detect_format(path: &Path) -> Result<ArchiveFormat, ExtractError> {
    let head = read_head(open(path)?)?;

    if infer::archive::is_zip(&head) {
        return Ok(ArchiveFormat::Zip);
    }
    if infer::archive::is_tar(&head) {
        return Ok(ArchiveFormat::Tar);
    }
    if infer::archive::is_gz(&head) {
        let inner = read_head(GzDecoder::new(open(path)?))?;
        return Ok(if infer::archive::is_tar(&inner) {
            ArchiveFormat::TarGz
        } else {
            ArchiveFormat::Gzip
        });
    }

    let detected = infer::get(&head)
        .map(|kind| kind.mime_type().to_string())
        .unwrap_or_else(|| "unknown content".to_string());
    Err(ExtractError::UnsupportedFormat { detected })
}

/// Unpacks `archive` into the existing directory `dest`.
///
/// A plain gzip stream is written to a single file inside `dest` named
/// after `dest` itself.
pub fn extract(archive: &Path, dest: &Path) -> Result<ArchiveFormat, ExtractError> {
    let format = detect_format(archive)?;
    debug!(
        "Extracting {} ({:?}) into {}",
        archive.display(),
        format,
        dest.display()
    );

    let file = BufReader::new(open(archive)?);
    match format {
        ArchiveFormat::Zip => {
            let mut zip = zip::ZipArchive::new(file)?;
            zip.extract(dest)?;
        }
        ArchiveFormat::Tar => tar::Archive::new(file).unpack(dest)?,
        ArchiveFormat::TarGz => tar::Archive::new(GzDecoder::new(file)).unpack(dest)?,
        ArchiveFormat::Gzip => {
            let name = dest.file_name().unwrap_or_else(|| "data".as_ref());
            let target = dest.join(name);
            let mut out = File::create(&target)?;
            if let Err(e) = io::copy(&mut GzDecoder::new(file), &mut out) {
                drop(out);
                let _ = fs::remove_file(&target);
                return Err(e.into());
            }
            out.sync_all()?;
        }
    }

    Ok(format)
}

/// Removes a directory and everything in it, ignoring a missing directory.
pub(crate) fn remove_partial(dest: &Path) -> io::Result<()> {
    match fs::remove_dir_all(dest) {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}
