//! Selection of a release and one of its assets

use crate::{
    config::{AssetPattern, Repository},
    error::ResolveError,
};
use async_trait::async_trait;
use serde::Deserialize;

/// A tagged publication of downloadable assets.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Release {
    pub tag_name: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub assets: Vec<Asset>,
}

impl Release {
    /// The display name, falling back to the tag when the release has none.
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .filter(|name| !name.is_empty())
            .unwrap_or(&self.tag_name)
    }
}

/// One downloadable file attached to a [`Release`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Asset {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub size: u64,
}

/// Where release metadata comes from.
#[async_trait]
pub trait ReleaseSource {
    /// All releases of `repository`, in the order the host lists them.
    async fn list_releases(&self, repository: &Repository) -> Result<Vec<Release>, ResolveError>;

    /// The release tagged `tag`, or `None` if there is no such release.
    async fn release_by_tag(
        &self,
        repository: &Repository,
        tag: &str,
    ) -> Result<Option<Release>, ResolveError>;
}

/// The outcome of [`resolve`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedAsset {
    pub release: Release,
    pub asset: Asset,
}

/// Pick the release named by `tag`, or the first listed release when `tag` is
/// `None`, and return its first asset whose name matches `pattern`.
pub async fn resolve<S>(
    source: &S,
    repository: &Repository,
    tag: Option<&str>,
    pattern: &AssetPattern,
) -> Result<ResolvedAsset, ResolveError>
where
    S: ReleaseSource + Sync + ?Sized,
{
    let release = match tag {
        None => {
            tracing::info!("no release specified, listing releases of {repository}");
            source
                .list_releases(repository)
                .await?
                .into_iter()
                .next()
                .ok_or_else(|| ResolveError::NoReleases {
                    repository: repository.to_string(),
                })?
        }
        Some(tag) => source
            .release_by_tag(repository, tag)
            .await?
            .ok_or_else(|| ResolveError::NotFound {
                repository: repository.to_string(),
                tag: tag.to_string(),
            })?,
    };
    tracing::info!("using release {}", release.display_name());

    let asset = select_asset(&release, pattern)
        .cloned()
        .ok_or_else(|| ResolveError::NoMatchingAsset {
            release: release.display_name().to_string(),
            pattern: pattern.to_string(),
        })?;

    Ok(ResolvedAsset { release, asset })
}

/// The first asset of `release` whose name matches `pattern`.
pub fn select_asset<'r>(release: &'r Release, pattern: &AssetPattern) -> Option<&'r Asset> {
    release.assets.iter().find(|asset| {
        let matched = pattern.is_match(&asset.name);
        tracing::debug!(
            "asset {} {} '{}'",
            asset.name,
            if matched { "matches" } else { "does not match" },
            pattern
        );
        matched
    })
}
