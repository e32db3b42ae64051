//! Async extraction and classification using tokio

use crate::{
    classify::classify,
    error::{ClassifyError, ExtractError},
    extractor::{Extractor, ExtractorBuilder},
    progress::{NoProgressReporter, ProgressReporter},
};
use std::{
    path::{Path, PathBuf},
    sync::Arc,
};
use tokio::task;

/// Builder for configuring async archive extraction
pub struct AsyncExtractorBuilder<P: ProgressReporter + Send + Sync = NoProgressReporter> {
    inner: ExtractorBuilder<P>,
}

impl AsyncExtractorBuilder<NoProgressReporter> {
    /// Create a new async extractor builder
    pub fn new() -> Self {
        Self {
            inner: ExtractorBuilder::new(),
        }
    }
}

impl<P: ProgressReporter + Send + Sync> AsyncExtractorBuilder<P> {
    /// Set a custom progress reporter
    pub fn with_progress_reporter<R: ProgressReporter + Send + Sync>(
        self,
        reporter: R,
    ) -> AsyncExtractorBuilder<R> {
        AsyncExtractorBuilder {
            inner: self.inner.with_progress_reporter(reporter),
        }
    }

    /// Build the async extractor
    pub fn build(self) -> AsyncExtractor<P> {
        AsyncExtractor {
            inner: Arc::new(self.inner.build()),
        }
    }
}

impl Default for AsyncExtractorBuilder<NoProgressReporter> {
    fn default() -> Self {
        Self::new()
    }
}

/// Async archive extractor
pub struct AsyncExtractor<P: ProgressReporter + Send + Sync = NoProgressReporter> {
    inner: Arc<Extractor<P>>,
}

impl<P: ProgressReporter + Send + Sync + 'static> AsyncExtractor<P> {
    /// Extract the archive at `archive_path` into `destination` on the
    /// blocking thread pool.
    pub async fn extract_file(
        &self,
        archive_path: &Path,
        destination: &Path,
    ) -> Result<(), ExtractError> {
        let task_archive_path = archive_path.to_owned();
        let destination = destination.to_owned();
        let inner = Arc::clone(&self.inner);

        task::spawn_blocking(move || inner.extract_file(&task_archive_path, &destination))
            .await
            .map_err(|e| ExtractError::io(archive_path, std::io::Error::other(e)))?
    }
}

/// Find the single binary in `dir` on the blocking thread pool.
pub async fn classify_async(dir: &Path) -> Result<PathBuf, ClassifyError> {
    let dir = dir.to_owned();
    let join_dir = dir.clone();
    task::spawn_blocking(move || classify(&dir))
        .await
        .map_err(|e| ClassifyError::ReadDir {
            path: join_dir,
            source: std::io::Error::other(e),
        })?
}
