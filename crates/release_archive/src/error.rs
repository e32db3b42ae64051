//! Error types for the release_archive crate

use std::path::PathBuf;

/// Error type for archive extraction
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    /// The stream is not valid gzip, not a valid tar archive, or ends early
    #[error("archive is corrupt or unreadable")]
    Corrupt(#[source] std::io::Error),

    /// An entry path would resolve outside of the destination directory
    #[error("path traversal attempt in archive: {}", .0.display())]
    PathTraversal(PathBuf),

    /// Materializing an entry on disk failed
    #[error("failed to write {}", path.display())]
    Io {
        /// The file or directory that could not be written.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

impl ExtractError {
    /// Create a new corrupt archive error
    pub fn corrupt(source: std::io::Error) -> Self {
        Self::Corrupt(source)
    }

    /// Create a new I/O error for the given path
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Error type for binary classification
#[derive(Debug, thiserror::Error)]
pub enum ClassifyError {
    /// Zero or more than one file looked like a binary
    #[error("single binary expected, got {count}{}", format_candidates(.candidates))]
    AmbiguousOrMissing {
        /// Number of binary candidates found.
        count: usize,
        /// The candidates, sorted by path.
        candidates: Vec<PathBuf>,
    },

    /// The directory to classify could not be listed
    #[error("failed to list directory {}", path.display())]
    ReadDir {
        /// The directory that could not be listed.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

fn format_candidates(candidates: &[PathBuf]) -> String {
    if candidates.is_empty() {
        return String::new();
    }
    let names = candidates
        .iter()
        .map(|path| path.display().to_string())
        .collect::<Vec<_>>();
    format!(": {}", names.join(", "))
}
