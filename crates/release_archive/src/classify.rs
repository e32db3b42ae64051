//! Detection of the single binary shipped in an extracted release archive

use crate::{
    error::ClassifyError,
    sniff::{detect_content_type, OCTET_STREAM, SNIFF_LEN},
};
use std::{
    io::Read,
    path::{Path, PathBuf},
};

/// Files that release archives conventionally ship next to the binary.
pub const EXCLUDED_NAMES: &[&str] = &["README.md", "LICENSE"];

/// Find the one binary among the immediate entries of `dir`.
///
/// Entries named in [`EXCLUDED_NAMES`] are ignored. Every other entry is
/// sniffed from its first [`SNIFF_LEN`] bytes, and entries that sniff as
/// [`OCTET_STREAM`] are candidates. Entries that cannot be read (including
/// subdirectories) are skipped with a warning. Exactly one candidate has to
/// remain.
pub fn classify(dir: &Path) -> Result<PathBuf, ClassifyError> {
    let read_dir_error = |source| ClassifyError::ReadDir {
        path: dir.to_path_buf(),
        source,
    };

    let mut candidates = Vec::new();
    for entry in fs_err::read_dir(dir).map_err(read_dir_error)? {
        let entry = entry.map_err(read_dir_error)?;
        let name = entry.file_name();
        let path = entry.path();

        if EXCLUDED_NAMES.iter().any(|excluded| name == *excluded) {
            continue;
        }

        let head = match read_head(&path) {
            Ok(head) => head,
            Err(err) => {
                tracing::warn!("failed to read file '{}': {err}", name.to_string_lossy());
                continue;
            }
        };

        if detect_content_type(&head) == OCTET_STREAM {
            tracing::debug!("selected binary '{}' from archive", name.to_string_lossy());
            candidates.push(path);
        }
    }

    if candidates.len() == 1 {
        return Ok(candidates.remove(0));
    }

    candidates.sort();
    Err(ClassifyError::AmbiguousOrMissing {
        count: candidates.len(),
        candidates,
    })
}

/// Read up to the first [`SNIFF_LEN`] bytes of a file.
fn read_head(path: &Path) -> std::io::Result<Vec<u8>> {
    let file = fs_err::File::open(path)?;
    let mut head = Vec::with_capacity(SNIFF_LEN);
    file.take(SNIFF_LEN as u64).read_to_end(&mut head)?;
    Ok(head)
}
