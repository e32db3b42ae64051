//! Progress reporting for downloads and archive extraction

#[cfg(feature = "progress")]
use indicatif::{ProgressBar, ProgressStyle};
use std::io::Read;

/// A trait for reporting progress of a byte-oriented operation
pub trait ProgressReporter {
    /// Called when the operation starts
    fn on_start(&self, total_bytes: Option<u64>);

    /// Called when the operation progresses
    fn on_progress(&self, bytes_processed: u64);

    /// Called when the operation finishes
    fn on_finish(&self, message: &str);
}

impl<P: ProgressReporter + ?Sized> ProgressReporter for &P {
    fn on_start(&self, total_bytes: Option<u64>) {
        (**self).on_start(total_bytes);
    }

    fn on_progress(&self, bytes_processed: u64) {
        (**self).on_progress(bytes_processed);
    }

    fn on_finish(&self, message: &str) {
        (**self).on_finish(message);
    }
}

/// A no-op progress reporter
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgressReporter;

impl ProgressReporter for NoProgressReporter {
    fn on_start(&self, _total_bytes: Option<u64>) {}
    fn on_progress(&self, _bytes_processed: u64) {}
    fn on_finish(&self, _message: &str) {}
}

/// Progress reporter using indicatif
#[cfg(feature = "progress")]
#[derive(Debug, Clone)]
pub struct IndicatifProgressReporter {
    progress_bar: ProgressBar,
}

#[cfg(feature = "progress")]
impl IndicatifProgressReporter {
    /// Create a new indicatif progress reporter
    pub fn new(progress_bar: ProgressBar) -> Self {
        Self { progress_bar }
    }

    /// Create a new indicatif progress reporter with default styling
    pub fn with_default_style(prefix: impl Into<String>) -> Self {
        let style = ProgressStyle::default_bar()
            .template("{prefix:.bold.dim} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta})")
            .map(|style| style.progress_chars("#>-"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        let progress_bar = ProgressBar::new(0).with_style(style);
        progress_bar.set_prefix(prefix.into());
        Self::new(progress_bar)
    }
}

#[cfg(feature = "progress")]
impl ProgressReporter for IndicatifProgressReporter {
    fn on_start(&self, total_bytes: Option<u64>) {
        self.progress_bar.reset();
        match total_bytes {
            Some(total) => self.progress_bar.set_length(total),
            None => self.progress_bar.unset_length(),
        }
    }

    fn on_progress(&self, bytes_processed: u64) {
        self.progress_bar.set_position(bytes_processed);
    }

    fn on_finish(&self, message: &str) {
        self.progress_bar.finish_with_message(message.to_string());
    }
}

/// A wrapper around a reader that reports progress
pub struct ProgressReader<R: Read, P: ProgressReporter> {
    inner: R,
    reporter: P,
    bytes_read: u64,
}

impl<R: Read, P: ProgressReporter> ProgressReader<R, P> {
    /// Create a new progress reader
    pub fn new(inner: R, reporter: P) -> Self {
        Self {
            inner,
            reporter,
            bytes_read: 0,
        }
    }

    /// Get the total bytes read
    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }
}

impl<R: Read, P: ProgressReporter> Read for ProgressReader<R, P> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let bytes_read = self.inner.read(buf)?;
        self.bytes_read += bytes_read as u64;
        self.reporter.on_progress(self.bytes_read);
        Ok(bytes_read)
    }
}
