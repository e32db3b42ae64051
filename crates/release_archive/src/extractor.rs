//! Streaming extraction of gzip-compressed tar archives

use crate::{
    error::ExtractError,
    progress::{NoProgressReporter, ProgressReader, ProgressReporter},
};
use std::{
    io::{BufReader, Read, Write},
    path::{Component, Path, PathBuf},
};

/// Builder for configuring archive extraction
pub struct ExtractorBuilder<P: ProgressReporter = NoProgressReporter> {
    progress_reporter: P,
}

impl ExtractorBuilder<NoProgressReporter> {
    /// Create a new extractor builder
    pub fn new() -> Self {
        Self {
            progress_reporter: NoProgressReporter,
        }
    }
}

impl<P: ProgressReporter> ExtractorBuilder<P> {
    /// Set a custom progress reporter
    pub fn with_progress_reporter<R: ProgressReporter>(self, reporter: R) -> ExtractorBuilder<R> {
        ExtractorBuilder {
            progress_reporter: reporter,
        }
    }

    /// Build the extractor
    pub fn build(self) -> Extractor<P> {
        Extractor {
            progress_reporter: self.progress_reporter,
        }
    }
}

impl Default for ExtractorBuilder<NoProgressReporter> {
    fn default() -> Self {
        Self::new()
    }
}

/// Extractor for gzip-compressed tar streams.
///
/// Only directories and regular files are materialized. Every other entry type
/// (symlinks, hard links, devices, FIFOs) is skipped. Entry paths are confined
/// to the destination directory: leading `/` components are stripped and any
/// `..` component is rejected with [`ExtractError::PathTraversal`].
pub struct Extractor<P: ProgressReporter = NoProgressReporter> {
    progress_reporter: P,
}

impl Default for Extractor<NoProgressReporter> {
    fn default() -> Self {
        ExtractorBuilder::new().build()
    }
}

impl<P: ProgressReporter> Extractor<P> {
    /// Extract a gzip-compressed tar stream into `destination`.
    ///
    /// Read and format errors of the stream are reported as
    /// [`ExtractError::Corrupt`]. Nothing that was already written is removed
    /// on failure.
    pub fn extract<R: Read>(&self, destination: &Path, source: R) -> Result<(), ExtractError> {
        self.extract_stream(destination, source, None)
    }

    /// Extract the gzip-compressed tar archive at `archive_path` into `destination`
    pub fn extract_file(&self, archive_path: &Path, destination: &Path) -> Result<(), ExtractError> {
        let file =
            fs_err::File::open(archive_path).map_err(|e| ExtractError::io(archive_path, e))?;
        let file_size = file.metadata().map(|m| m.len()).ok();
        self.extract_stream(destination, BufReader::new(file), file_size)
    }

    fn extract_stream<R: Read>(
        &self,
        destination: &Path,
        source: R,
        total_bytes: Option<u64>,
    ) -> Result<(), ExtractError> {
        fs_err::create_dir_all(destination).map_err(|e| ExtractError::io(destination, e))?;

        self.progress_reporter.on_start(total_bytes);

        let reader = ProgressReader::new(source, &self.progress_reporter);
        let decoder = flate2::read::GzDecoder::new(reader);
        let mut archive = tar::Archive::new(decoder);

        let mut unpacked = 0usize;
        for entry in archive.entries().map_err(ExtractError::corrupt)? {
            let mut entry = entry.map_err(ExtractError::corrupt)?;
            let entry_type = entry.header().entry_type();

            // Pre-POSIX archives mark directories with a NUL type flag and a
            // trailing slash.
            let is_legacy_dir =
                entry.header().as_bytes()[156] == b'\0' && entry.path_bytes().ends_with(b"/");

            let raw_path = entry.path().map_err(ExtractError::corrupt)?.into_owned();
            let Some(relative_path) = normalize_archive_path(&raw_path)? else {
                continue;
            };
            let target = destination.join(&relative_path);

            if entry_type.is_dir() || is_legacy_dir {
                tracing::trace!("creating directory {}", relative_path.display());
                fs_err::create_dir_all(&target).map_err(|e| ExtractError::io(&target, e))?;
            } else if entry_type.is_file() {
                tracing::trace!("unpacking file {}", relative_path.display());
                let mode = entry.header().mode().map_err(ExtractError::corrupt)?;
                unpack_file(&mut entry, &target, mode)?;
            } else {
                tracing::debug!(
                    "skipping unsupported {:?} entry {}",
                    entry_type,
                    raw_path.display()
                );
                continue;
            }
            unpacked += 1;
        }

        self.progress_reporter
            .on_finish(&format!("Extracted {unpacked} entries"));
        Ok(())
    }
}

/// Write a regular file entry to `target`. The file handle is dropped before
/// returning so that only one extracted file is open at any time.
fn unpack_file(entry: &mut impl Read, target: &Path, mode: u32) -> Result<(), ExtractError> {
    // Archives do not have to list parent directories before their children.
    if let Some(parent) = target.parent() {
        fs_err::create_dir_all(parent).map_err(|e| ExtractError::io(parent, e))?;
    }

    let mut file = fs_err::File::create(target).map_err(|e| ExtractError::io(target, e))?;
    copy_payload(entry, &mut file, target)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(std::fs::Permissions::from_mode(mode & 0o777))
            .map_err(|e| ExtractError::io(target, e))?;
    }
    #[cfg(not(unix))]
    let _ = mode;

    Ok(())
}

/// Copy an entry payload, keeping read failures (a broken archive) apart from
/// write failures (a broken destination).
fn copy_payload(
    reader: &mut impl Read,
    writer: &mut impl Write,
    target: &Path,
) -> Result<u64, ExtractError> {
    let mut buf = vec![0u8; 64 * 1024];
    let mut written = 0u64;
    loop {
        let read = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(read) => read,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(ExtractError::corrupt(e)),
        };
        writer
            .write_all(&buf[..read])
            .map_err(|e| ExtractError::io(target, e))?;
        written += read as u64;
    }
    writer.flush().map_err(|e| ExtractError::io(target, e))?;
    Ok(written)
}

/// Normalizes a path from a tar archive so that it stays below the
/// destination directory.
///
/// Returns:
/// - `Ok(Some(path))` - normalized relative path to extract
/// - `Ok(None)` - path normalizes to nothing (e.g. "." or "/"), skip it
/// - `Err(PathTraversal)` - path contains a ".." component
fn normalize_archive_path(path: &Path) -> Result<Option<PathBuf>, ExtractError> {
    let mut result = PathBuf::with_capacity(path.as_os_str().len());
    for component in path.components() {
        match component {
            Component::Prefix(..) | Component::RootDir | Component::CurDir => {}
            Component::ParentDir => return Err(ExtractError::PathTraversal(path.to_path_buf())),
            Component::Normal(part) => result.push(part),
        }
    }

    if result.as_os_str().is_empty() {
        return Ok(None);
    }
    Ok(Some(result))
}

/// Extract a gzip-compressed tar stream into `destination` without progress reporting
pub fn extract<R: Read>(destination: &Path, source: R) -> Result<(), ExtractError> {
    Extractor::default().extract(destination, source)
}
