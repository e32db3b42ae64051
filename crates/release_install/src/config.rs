//! Configuration of a single install run

use crate::error::Error;
use regex::Regex;
use std::{
    fmt,
    path::{Path, PathBuf},
    time::Duration,
};
use url::Url;

/// The public GitHub REST API.
pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// A repository on the release host, displayed as `owner/repo`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Repository {
    pub owner: String,
    pub repo: String,
}

impl Repository {
    pub fn new(owner: impl Into<String>, repo: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            repo: repo.into(),
        }
    }
}

impl fmt::Display for Repository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}

/// A compiled asset name pattern.
///
/// Matching is a substring search: `linux` matches `tool_linux_amd64.tar.gz`.
/// Use `^` and `$` to anchor.
#[derive(Debug, Clone)]
pub struct AssetPattern(Regex);

impl AssetPattern {
    /// Compile `pattern` after trimming surrounding whitespace.
    pub fn new(pattern: &str) -> Result<Self, Error> {
        Regex::new(pattern.trim())
            .map(Self)
            .map_err(|source| Error::InvalidPattern {
                pattern: pattern.to_string(),
                source,
            })
    }

    pub fn is_match(&self, name: &str) -> bool {
        self.0.is_match(name)
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for AssetPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything an install run needs, built once at startup.
#[derive(Clone)]
pub struct InstallConfig {
    /// The repository publishing the release.
    pub repository: Repository,
    /// The release tag, or `None` for the first release the API lists.
    pub tag: Option<String>,
    /// Regular expression selecting the asset by name.
    pub asset_pattern: String,
    /// Where the binary ends up.
    pub install_path: PathBuf,
    /// The file that receives the install directory, one line per run.
    pub path_file: Option<PathBuf>,
    /// Bearer token for the API.
    pub token: Option<String>,
    /// Base URL of the release API.
    pub api_url: Url,
    /// Deadline for each HTTP request. `None` waits indefinitely.
    pub timeout: Option<Duration>,
}

impl fmt::Debug for InstallConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstallConfig")
            .field("repository", &self.repository)
            .field("tag", &self.tag)
            .field("asset_pattern", &self.asset_pattern)
            .field("install_path", &self.install_path)
            .field("path_file", &self.path_file)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("api_url", &self.api_url.as_str())
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl InstallConfig {
    /// Create a configuration for installing from `api_url`, usually
    /// [`DEFAULT_API_URL`].
    pub fn new(
        api_url: Url,
        repository: Repository,
        asset_pattern: impl Into<String>,
        install_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            repository,
            tag: None,
            asset_pattern: asset_pattern.into(),
            install_path: install_path.into(),
            path_file: None,
            token: None,
            api_url,
            timeout: None,
        }
    }

    /// Check that every required value is present.
    pub fn validate(&self) -> Result<(), Error> {
        if self.repository.owner.trim().is_empty() {
            return Err(Error::Config("owner must be set".into()));
        }
        if self.repository.repo.trim().is_empty() {
            return Err(Error::Config("repo must be set".into()));
        }
        if self.asset_pattern.trim().is_empty() {
            return Err(Error::Config("asset-pattern must be set".into()));
        }
        if self.install_path.as_os_str().is_empty() {
            return Err(Error::Config("install-path must be set".into()));
        }
        self.path_file()?;
        if self.api_url.cannot_be_a_base() {
            return Err(Error::Config(format!(
                "api-url ({}) is not a base URL",
                self.api_url
            )));
        }
        Ok(())
    }

    /// The file that receives the install directory.
    pub fn path_file(&self) -> Result<&Path, Error> {
        self.path_file
            .as_deref()
            .filter(|path| !path.as_os_str().is_empty())
            .ok_or_else(|| {
                Error::Config("path-file must be set (pass --path-file or set GITHUB_PATH)".into())
            })
    }

    /// The configured token, or [`Error::MissingToken`].
    pub fn token(&self) -> Result<&str, Error> {
        self.token
            .as_deref()
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or(Error::MissingToken)
    }

    /// The configured tag, treating an empty tag as unset.
    pub fn tag(&self) -> Option<&str> {
        self.tag
            .as_deref()
            .map(str::trim)
            .filter(|tag| !tag.is_empty())
    }

    /// The compiled asset pattern.
    pub fn asset_pattern(&self) -> Result<AssetPattern, Error> {
        AssetPattern::new(&self.asset_pattern)
    }
}
