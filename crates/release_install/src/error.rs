//! Error types for resolving, downloading and installing release assets

use release_archive::{ClassifyError, ExtractError};
use std::path::PathBuf;

/// Top-level error of an install run. Every variant is terminal.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A required configuration value is missing or malformed
    #[error("invalid configuration: {0}")]
    Config(String),

    /// No token was configured
    #[error("a GitHub token must be set (pass --token or set GITHUB_TOKEN)")]
    MissingToken,

    /// The asset pattern is not a valid regular expression
    #[error("asset-pattern ({pattern}) was not a valid regexp")]
    InvalidPattern {
        /// The pattern as supplied.
        pattern: String,
        /// The regex compilation error.
        #[source]
        source: regex::Error,
    },

    /// The HTTP client could not be constructed
    #[error("failed to construct the HTTP client")]
    HttpClient(#[source] reqwest::Error),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Download(#[from] DownloadError),

    #[error("failed to unpack the release archive")]
    Extract(#[from] ExtractError),

    #[error("failed to find the binary in the release archive")]
    Classify(#[from] ClassifyError),

    #[error(transparent)]
    Install(#[from] InstallError),

    #[error(transparent)]
    Registration(#[from] RegistrationError),
}

/// Errors while selecting a release and one of its assets
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("there were no releases for {repository}")]
    NoReleases { repository: String },

    #[error("no release with tag '{tag}' found for {repository}")]
    NotFound { repository: String, tag: String },

    #[error("no asset of release {release} matches '{pattern}'")]
    NoMatchingAsset { release: String, pattern: String },

    #[error("failed to get releases")]
    Request(#[from] reqwest::Error),

    #[error("failed to get releases: {url} returned HTTP {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },
}

/// Errors while downloading the selected asset
#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    #[error("failed to download release asset {asset}")]
    Request {
        asset: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("failed to download release asset {asset}: {url} returned HTTP {status}")]
    Status {
        asset: String,
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("failed to write release asset to {}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors while putting the binary in place
#[derive(Debug, thiserror::Error)]
pub enum InstallError {
    #[error("failed to create a scratch directory")]
    Scratch(#[source] std::io::Error),

    /// Both the rename and the copy fallback failed.
    #[error("failed to move binary to {} (rename failed: {rename})", to.display())]
    Move {
        from: PathBuf,
        to: PathBuf,
        rename: std::io::Error,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to set {} as executable", path.display())]
    Permissions {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors while appending the install directory to the path file
#[derive(Debug, thiserror::Error)]
#[error("failed to update path file {}", path.display())]
pub struct RegistrationError {
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

/// Result type for install operations
pub type Result<T, E = Error> = std::result::Result<T, E>;
