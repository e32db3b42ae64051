//! Extraction of release tarballs and detection of the binary they ship
//!
//! Release archives on hosted source-control platforms are usually
//! gzip-compressed tarballs that contain one executable next to a README and a
//! LICENSE. This crate unpacks such archives and finds that executable.
//!
//! # Features
//!
//! - Streaming extraction of `.tar.gz` archives from any [`std::io::Read`]
//! - Entry paths confined to the destination directory
//! - Binary detection through MIME content sniffing
//! - Progress reporting via `indicatif`
//! - Async wrappers running on tokio's blocking pool
//!
//! # Examples
//!
//! ```no_run
//! use release_archive::{classify, ExtractorBuilder};
//! use std::path::Path;
//!
//! let extractor = ExtractorBuilder::new().build();
//! extractor.extract_file(
//!     Path::new("tool_1.0.0_linux_amd64.tar.gz"),
//!     Path::new("unpacked"),
//! )?;
//!
//! let binary = classify(Path::new("unpacked"))?;
//! println!("found {}", binary.display());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod classify;
pub mod error;
pub mod extractor;
pub mod format;
pub mod progress;
pub mod sniff;

#[cfg(feature = "tokio")]
pub mod r#async;

pub use classify::classify;
pub use error::{ClassifyError, ExtractError};
pub use extractor::{extract, Extractor, ExtractorBuilder};
pub use format::AssetFormat;
pub use progress::{NoProgressReporter, ProgressReporter};

#[cfg(feature = "progress")]
pub use progress::IndicatifProgressReporter;

#[cfg(feature = "tokio")]
pub use r#async::{classify_async, AsyncExtractor, AsyncExtractorBuilder};
