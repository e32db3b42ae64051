//! Install a single binary from a GitHub release
//!
//! The install runs in a fixed order. It resolves a release and the asset
//! whose name matches a pattern, then downloads the asset into a scratch
//! directory. Tarballs are unpacked and the one binary inside is picked by
//! content sniffing. The binary is moved to the install path with mode 0755
//! and its directory is appended to the path file (`GITHUB_PATH` in GitHub
//! Actions).
//!
//! ```no_run
//! use release_install::{install_release_asset, InstallConfig, Repository, DEFAULT_API_URL};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let mut config = InstallConfig::new(
//!     url::Url::parse(DEFAULT_API_URL)?,
//!     Repository::new("acme", "tool"),
//!     r"linux_amd64\.tar\.gz$",
//!     "/usr/local/bin/tool",
//! );
//! config.token = std::env::var("GITHUB_TOKEN").ok();
//! config.path_file = std::env::var_os("GITHUB_PATH").map(Into::into);
//!
//! let outcome = install_release_asset(&config).await?;
//! println!("installed {}", outcome.install_path.display());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod github;
pub mod install;
pub mod resolver;

pub use config::{AssetPattern, InstallConfig, Repository, DEFAULT_API_URL};
pub use error::{DownloadError, Error, InstallError, RegistrationError, ResolveError, Result};
pub use github::GitHubClient;
pub use install::{
    install_binary, install_dir, install_release_asset, install_release_asset_with_progress,
    register_path, InstallOutcome,
};
pub use resolver::{resolve, select_asset, Asset, Release, ReleaseSource, ResolvedAsset};
