//! A client for the GitHub releases REST API

use crate::{
    config::Repository,
    error::{DownloadError, Error, ResolveError},
    resolver::{Asset, Release, ReleaseSource},
};
use async_trait::async_trait;
use release_archive::ProgressReporter;
use reqwest::{
    header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT},
    Client, StatusCode,
};
use std::{path::Path, time::Duration};
use tokio::io::AsyncWriteExt;
use url::Url;

const METADATA_MEDIA_TYPE: &str = "application/vnd.github+json";
const ASSET_MEDIA_TYPE: &str = "application/octet-stream";

/// Authenticated access to the releases of GitHub, GitHub Enterprise or any
/// server that speaks the same API.
#[derive(Debug, Clone)]
pub struct GitHubClient {
    client: Client,
    api_url: Url,
}

impl GitHubClient {
    /// Create a client that sends `token` as a bearer token with every request.
    pub fn new(api_url: Url, token: &str, timeout: Option<Duration>) -> Result<Self, Error> {
        if api_url.cannot_be_a_base() {
            return Err(Error::Config(format!("api-url ({api_url}) is not a base URL")));
        }

        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("release-install/", env!("CARGO_PKG_VERSION"))),
        );
        let mut authorization = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|_| Error::Config("token contains characters not allowed in a header".into()))?;
        authorization.set_sensitive(true);
        headers.insert(AUTHORIZATION, authorization);

        let mut builder = Client::builder().default_headers(headers);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build().map_err(Error::HttpClient)?,
            api_url,
        })
    }

    /// `{api}/repos/{owner}/{repo}/releases/{segments...}`
    fn releases_url(&self, repository: &Repository, segments: &[&str]) -> Url {
        let mut url = self.api_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty()
                .extend([
                    "repos",
                    repository.owner.as_str(),
                    repository.repo.as_str(),
                    "releases",
                ])
                .extend(segments);
        }
        url
    }

    /// Stream the content of `asset` into a new file at `destination`.
    ///
    /// Returns the number of bytes written.
    pub async fn download_asset<P: ProgressReporter + ?Sized>(
        &self,
        repository: &Repository,
        asset: &Asset,
        destination: &Path,
        reporter: &P,
    ) -> Result<u64, DownloadError> {
        let id = asset.id.to_string();
        let url = self.releases_url(repository, &["assets", &id]);
        tracing::info!("downloading {} ({} bytes)", asset.name, asset.size);
        tracing::debug!("downloading from {url} to {}", destination.display());

        let request_error = |source| DownloadError::Request {
            asset: asset.name.clone(),
            source,
        };
        let mut response = self
            .client
            .get(url.clone())
            .header(ACCEPT, ASSET_MEDIA_TYPE)
            .send()
            .await
            .map_err(request_error)?;
        if response.status() != StatusCode::OK {
            return Err(DownloadError::Status {
                asset: asset.name.clone(),
                url: url.to_string(),
                status: response.status(),
            });
        }

        let write_error = |source| DownloadError::Write {
            path: destination.to_path_buf(),
            source,
        };
        let mut file = fs_err::tokio::File::create(destination)
            .await
            .map_err(write_error)?;

        reporter.on_start(response.content_length().or(Some(asset.size).filter(|&s| s > 0)));
        let mut written = 0u64;
        while let Some(chunk) = response.chunk().await.map_err(request_error)? {
            file.write_all(&chunk).await.map_err(write_error)?;
            written += chunk.len() as u64;
            reporter.on_progress(written);
        }
        file.flush().await.map_err(write_error)?;
        reporter.on_finish(&format!("Downloaded {}", asset.name));

        tracing::debug!("downloaded {written} bytes");
        Ok(written)
    }
}

#[async_trait]
impl ReleaseSource for GitHubClient {
    async fn list_releases(&self, repository: &Repository) -> Result<Vec<Release>, ResolveError> {
        let url = self.releases_url(repository, &[]);
        let response = self
            .client
            .get(url.clone())
            .header(ACCEPT, METADATA_MEDIA_TYPE)
            .send()
            .await?;
        if response.status() != StatusCode::OK {
            return Err(ResolveError::Status {
                url: url.to_string(),
                status: response.status(),
            });
        }
        Ok(response.json().await?)
    }

    async fn release_by_tag(
        &self,
        repository: &Repository,
        tag: &str,
    ) -> Result<Option<Release>, ResolveError> {
        let url = self.releases_url(repository, &["tags", tag]);
        tracing::info!("getting release {tag} of {repository}");
        let response = self
            .client
            .get(url.clone())
            .header(ACCEPT, METADATA_MEDIA_TYPE)
            .send()
            .await?;
        match response.status() {
            StatusCode::OK => Ok(Some(response.json().await?)),
            StatusCode::NOT_FOUND => Ok(None),
            status => Err(ResolveError::Status {
                url: url.to_string(),
                status,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;
    use release_archive::NoProgressReporter;

    const RELEASES: &str = r#"[
        {
            "tag_name": "v1.0.0",
            "name": "v1.0.0",
            "assets": [
                {"id": 11, "name": "tool_linux_amd64", "size": 4}
            ]
        }
    ]"#;

    fn client(server: &Server) -> GitHubClient {
        GitHubClient::new(Url::parse(&server.url()).unwrap(), "secret", None).unwrap()
    }

    fn repository() -> Repository {
        Repository::new("acme", "tool")
    }

    #[test]
    fn test_releases_url() {
        let client = GitHubClient::new(
            Url::parse("https://github.example.com/api/v3/").unwrap(),
            "secret",
            None,
        )
        .unwrap();

        assert_eq!(
            client.releases_url(&repository(), &[]).as_str(),
            "https://github.example.com/api/v3/repos/acme/tool/releases"
        );
        assert_eq!(
            client
                .releases_url(&repository(), &["tags", "nightly/2024-01-01"])
                .as_str(),
            "https://github.example.com/api/v3/repos/acme/tool/releases/tags/nightly%2F2024-01-01"
        );
    }

    #[test]
    fn test_token_must_be_a_valid_header() {
        let err = GitHubClient::new(Url::parse("https://api.github.com").unwrap(), "a\nb", None)
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)), "{err:?}");
    }

    #[test_log::test(tokio::test)]
    async fn test_list_releases_sends_token() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/repos/acme/tool/releases")
            .match_header("authorization", "Bearer secret")
            .match_header("accept", METADATA_MEDIA_TYPE)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(RELEASES)
            .create_async()
            .await;

        let releases = client(&server).list_releases(&repository()).await.unwrap();

        mock.assert_async().await;
        assert_eq!(releases.len(), 1);
        assert_eq!(releases[0].assets[0].id, 11);
    }

    #[test_log::test(tokio::test)]
    async fn test_list_releases_unexpected_status() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/repos/acme/tool/releases")
            .with_status(500)
            .create_async()
            .await;

        let err = client(&server)
            .list_releases(&repository())
            .await
            .unwrap_err();

        assert!(
            matches!(err, ResolveError::Status { status, .. } if status == StatusCode::INTERNAL_SERVER_ERROR),
            "{err:?}"
        );
    }

    #[test_log::test(tokio::test)]
    async fn test_release_by_tag_not_found() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/repos/acme/tool/releases/tags/v9.9.9")
            .with_status(404)
            .with_body(r#"{"message": "Not Found"}"#)
            .create_async()
            .await;

        let release = client(&server)
            .release_by_tag(&repository(), "v9.9.9")
            .await
            .unwrap();

        assert_eq!(release, None);
    }

    #[test_log::test(tokio::test)]
    async fn test_download_asset() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/repos/acme/tool/releases/assets/11")
            .match_header("authorization", "Bearer secret")
            .match_header("accept", ASSET_MEDIA_TYPE)
            .with_status(200)
            .with_body(b"\x7fELF")
            .create_async()
            .await;
        let dir = tempfile::tempdir().unwrap();
        let destination = dir.path().join("binary");
        let asset = Asset {
            id: 11,
            name: "tool_linux_amd64".into(),
            size: 4,
        };

        let written = client(&server)
            .download_asset(&repository(), &asset, &destination, &NoProgressReporter)
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(written, 4);
        assert_eq!(std::fs::read(&destination).unwrap(), b"\x7fELF");
    }

    #[test_log::test(tokio::test)]
    async fn test_download_asset_unexpected_status() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/repos/acme/tool/releases/assets/11")
            .with_status(403)
            .create_async()
            .await;
        let dir = tempfile::tempdir().unwrap();
        let destination = dir.path().join("binary");
        let asset = Asset {
            id: 11,
            name: "tool_linux_amd64".into(),
            size: 4,
        };

        let err = client(&server)
            .download_asset(&repository(), &asset, &destination, &NoProgressReporter)
            .await
            .unwrap_err();

        assert!(
            matches!(err, DownloadError::Status { status, .. } if status == StatusCode::FORBIDDEN),
            "{err:?}"
        );
        assert!(!destination.exists());
    }
}
