//! Running a complete install: resolve, download, unpack, finalize and register

use crate::{
    config::InstallConfig,
    error::{InstallError, RegistrationError, Result},
    github::GitHubClient,
    resolver::{resolve, Asset},
};
use release_archive::{
    classify_async, AssetFormat, AsyncExtractorBuilder, NoProgressReporter, ProgressReporter,
};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

/// Prefix of the per-run scratch directory.
pub const SCRATCH_PREFIX: &str = "release-asset-";

/// Name of a raw binary asset inside the scratch directory.
const RAW_BINARY_NAME: &str = "binary";

/// Name of the directory tarballs are unpacked into.
const UNPACK_DIR_NAME: &str = "unpacked";

/// What a successful install did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallOutcome {
    /// Display name of the chosen release.
    pub release: String,
    /// Name of the downloaded asset.
    pub asset: String,
    /// Where the binary was installed.
    pub install_path: PathBuf,
    /// The directory appended to the path file.
    pub registered_dir: PathBuf,
}

/// Install the release asset described by `config`.
pub async fn install_release_asset(config: &InstallConfig) -> Result<InstallOutcome> {
    install_release_asset_with_progress(config, NoProgressReporter).await
}

/// Same as [`install_release_asset`], reporting download and extraction
/// progress to `reporter`.
pub async fn install_release_asset_with_progress<P>(
    config: &InstallConfig,
    reporter: P,
) -> Result<InstallOutcome>
where
    P: ProgressReporter + Clone + Send + Sync + 'static,
{
    config.validate()?;
    let path_file = config.path_file()?;
    let token = config.token()?;
    let pattern = config.asset_pattern()?;
    let client = GitHubClient::new(config.api_url.clone(), token, config.timeout)?;

    let resolved = resolve(&client, &config.repository, config.tag(), &pattern).await?;
    let asset = &resolved.asset;
    tracing::info!("found asset {} in release {}", asset.name, resolved.release.display_name());

    let scratch = tempfile::Builder::new()
        .prefix(SCRATCH_PREFIX)
        .tempdir()
        .map_err(InstallError::Scratch)?;
    tracing::debug!("using scratch directory {}", scratch.path().display());

    let binary = match AssetFormat::detect_from_filename(&asset.name) {
        AssetFormat::TarGz => {
            let archive_path = scratch.path().join(scratch_file_name(asset));
            client
                .download_asset(&config.repository, asset, &archive_path, &reporter)
                .await?;

            let destination = scratch.path().join(UNPACK_DIR_NAME);
            tracing::info!("unpacking {}", asset.name);
            AsyncExtractorBuilder::new()
                .with_progress_reporter(reporter.clone())
                .build()
                .extract_file(&archive_path, &destination)
                .await?;

            let binary = classify_async(&destination).await?;
            tracing::debug!("selected binary {}", binary.display());
            binary
        }
        AssetFormat::RawBinary => {
            let binary = scratch.path().join(RAW_BINARY_NAME);
            client
                .download_asset(&config.repository, asset, &binary, &reporter)
                .await?;
            binary
        }
    };

    install_binary(&binary, &config.install_path).await?;

    let registered_dir = register_path(path_file, &config.install_path).await?;

    tracing::info!(
        "installed {} from {} to {}",
        asset.name,
        resolved.release.display_name(),
        config.install_path.display()
    );

    Ok(InstallOutcome {
        release: resolved.release.display_name().to_string(),
        asset: asset.name.clone(),
        install_path: config.install_path.clone(),
        registered_dir,
    })
}

/// The last component of the asset name, so the download stays inside the
/// scratch directory.
fn scratch_file_name(asset: &Asset) -> PathBuf {
    Path::new(&asset.name)
        .file_name()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(RAW_BINARY_NAME))
}

/// Move `binary` to `install_path` and make it executable.
///
/// A rename that fails, for example because the scratch directory is on a
/// different filesystem, is retried as a copy.
pub async fn install_binary(binary: &Path, install_path: &Path) -> Result<(), InstallError> {
    if let Err(rename) = fs_err::tokio::rename(binary, install_path).await {
        tracing::debug!("rename failed ({rename}), copying instead");
        if let Err(source) = fs_err::tokio::copy(binary, install_path).await {
            return Err(InstallError::Move {
                from: binary.to_path_buf(),
                to: install_path.to_path_buf(),
                rename,
                source,
            });
        }
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs_err::tokio::set_permissions(install_path, std::fs::Permissions::from_mode(0o755))
            .await
            .map_err(|source| InstallError::Permissions {
                path: install_path.to_path_buf(),
                source,
            })?;
    }

    Ok(())
}

/// The directory that contains `install_path`, `.` for a bare file name.
pub fn install_dir(install_path: &Path) -> PathBuf {
    match install_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Append the directory of `install_path` as one line to `path_file`.
///
/// The file is created with mode 0644 if it does not exist.
pub async fn register_path(
    path_file: &Path,
    install_path: &Path,
) -> Result<PathBuf, RegistrationError> {
    let dir = install_dir(install_path);
    let error = |source| RegistrationError {
        path: path_file.to_path_buf(),
        source,
    };

    let mut options = fs_err::tokio::OpenOptions::new();
    options.append(true).create(true);
    #[cfg(unix)]
    options.mode(0o644);

    let mut file = options.open(path_file).await.map_err(error)?;
    file.write_all(format!("{}\n", dir.display()).as_bytes())
        .await
        .map_err(error)?;
    file.flush().await.map_err(error)?;

    tracing::debug!("added {} to {}", dir.display(), path_file.display());
    Ok(dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::Repository,
        error::{Error, ResolveError},
    };
    use flate2::{write::GzEncoder, Compression};
    use mockito::{Mock, Server, ServerGuard};
    use release_archive::ClassifyError;
    use url::Url;

    const ELF: &[u8] = b"\x7fELF\x02\x01\x01\x00\x00\x00\x00\x00\x00\x00\x00\x00tool";

    fn tar_gz(files: &[(&str, &[u8], u32)]) -> Vec<u8> {
        let mut builder = tar::Builder::new(GzEncoder::new(Vec::new(), Compression::default()));
        for (path, content, mode) in files {
            let mut header = tar::Header::new_gnu();
            header.set_size(content.len() as u64);
            header.set_mode(*mode);
            header.set_cksum();
            builder.append_data(&mut header, path, *content).unwrap();
        }
        builder.into_inner().unwrap().finish().unwrap()
    }

    fn releases_json(asset_name: &str, size: usize) -> String {
        serde_json::json!([
            {
                "tag_name": "v1.2.3",
                "name": "tool 1.2.3",
                "assets": [
                    {"id": 1, "name": "checksums.txt", "size": 64},
                    {"id": 7, "name": asset_name, "size": size}
                ]
            }
        ])
        .to_string()
    }

    struct Fixture {
        server: ServerGuard,
        dir: tempfile::TempDir,
        config: InstallConfig,
    }

    impl Fixture {
        async fn new(asset_pattern: &str) -> Self {
            let server = Server::new_async().await;
            let dir = tempfile::tempdir().unwrap();
            std::fs::create_dir(dir.path().join("bin")).unwrap();

            let mut config = InstallConfig::new(
                Url::parse(&server.url()).unwrap(),
                Repository::new("acme", "tool"),
                asset_pattern,
                dir.path().join("bin").join("tool"),
            );
            config.path_file = Some(dir.path().join("github_path"));
            config.token = Some("secret".into());

            Self {
                server,
                dir,
                config,
            }
        }

        async fn mock_releases(&mut self, body: String) -> Mock {
            self.server
                .mock("GET", "/repos/acme/tool/releases")
                .match_header("authorization", "Bearer secret")
                .with_status(200)
                .with_header("content-type", "application/json")
                .with_body(body)
                .create_async()
                .await
        }

        async fn mock_download(&mut self, body: Vec<u8>) -> Mock {
            self.server
                .mock("GET", "/repos/acme/tool/releases/assets/7")
                .match_header("authorization", "Bearer secret")
                .match_header("accept", "application/octet-stream")
                .with_status(200)
                .with_body(body)
                .create_async()
                .await
        }

        fn path_file_contents(&self) -> String {
            std::fs::read_to_string(self.dir.path().join("github_path")).unwrap()
        }
    }

    #[cfg(unix)]
    fn mode(path: &Path) -> u32 {
        use std::os::unix::fs::PermissionsExt;
        std::fs::metadata(path).unwrap().permissions().mode() & 0o777
    }

    #[test_log::test(tokio::test)]
    async fn test_install_binary_from_tarball() {
        let archive = tar_gz(&[
            ("README.md", &b"# tool\n"[..], 0o644),
            ("LICENSE", &b"MIT License\n"[..], 0o644),
            ("tool", ELF, 0o700),
        ]);
        let mut fixture = Fixture::new(r"linux_amd64\.tar\.gz").await;
        let releases = fixture
            .mock_releases(releases_json("tool_1.2.3_linux_amd64.tar.gz", archive.len()))
            .await;
        let download = fixture.mock_download(archive).await;

        let outcome = install_release_asset(&fixture.config).await.unwrap();

        releases.assert_async().await;
        download.assert_async().await;
        let install_path = fixture.dir.path().join("bin").join("tool");
        assert_eq!(outcome.release, "tool 1.2.3");
        assert_eq!(outcome.asset, "tool_1.2.3_linux_amd64.tar.gz");
        assert_eq!(outcome.install_path, install_path);
        assert_eq!(outcome.registered_dir, fixture.dir.path().join("bin"));
        assert_eq!(std::fs::read(&install_path).unwrap(), ELF);
        #[cfg(unix)]
        assert_eq!(mode(&install_path), 0o755);
        assert_eq!(
            fixture.path_file_contents(),
            format!("{}\n", fixture.dir.path().join("bin").display())
        );
    }

    #[test_log::test(tokio::test)]
    async fn test_install_raw_binary_appends_to_path_file() {
        let mut fixture = Fixture::new("linux_amd64$").await;
        std::fs::write(fixture.dir.path().join("github_path"), "/usr/local/go/bin\n").unwrap();
        let _releases = fixture
            .mock_releases(releases_json("tool_linux_amd64", ELF.len()))
            .await;
        let download = fixture.mock_download(ELF.to_vec()).await;

        install_release_asset(&fixture.config).await.unwrap();

        download.assert_async().await;
        let install_path = fixture.dir.path().join("bin").join("tool");
        assert_eq!(std::fs::read(&install_path).unwrap(), ELF);
        #[cfg(unix)]
        assert_eq!(mode(&install_path), 0o755);
        assert_eq!(
            fixture.path_file_contents(),
            format!(
                "/usr/local/go/bin\n{}\n",
                fixture.dir.path().join("bin").display()
            )
        );
    }

    #[test_log::test(tokio::test)]
    async fn test_no_releases_downloads_nothing() {
        let mut fixture = Fixture::new("linux").await;
        let _releases = fixture.mock_releases("[]".to_string()).await;
        let download = fixture
            .server
            .mock("GET", mockito::Matcher::Regex("^/repos/acme/tool/releases/assets/".into()))
            .expect(0)
            .create_async()
            .await;

        let err = install_release_asset(&fixture.config).await.unwrap_err();

        download.assert_async().await;
        assert!(
            matches!(err, Error::Resolve(ResolveError::NoReleases { .. })),
            "{err:?}"
        );
        assert!(!fixture.dir.path().join("bin").join("tool").exists());
        assert!(!fixture.dir.path().join("github_path").exists());
    }

    #[test_log::test(tokio::test)]
    async fn test_missing_token_fails_before_any_request() {
        let mut fixture = Fixture::new("linux").await;
        fixture.config.token = None;
        let any_request = fixture
            .server
            .mock("GET", mockito::Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let err = install_release_asset(&fixture.config).await.unwrap_err();

        any_request.assert_async().await;
        assert!(matches!(err, Error::MissingToken), "{err:?}");
    }

    #[test_log::test(tokio::test)]
    async fn test_invalid_pattern_fails_before_any_request() {
        let mut fixture = Fixture::new("tool_(linux").await;
        let any_request = fixture
            .server
            .mock("GET", mockito::Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let err = install_release_asset(&fixture.config).await.unwrap_err();

        any_request.assert_async().await;
        assert!(matches!(err, Error::InvalidPattern { .. }), "{err:?}");
    }

    #[test_log::test(tokio::test)]
    async fn test_ambiguous_tarball_installs_nothing() {
        let archive = tar_gz(&[("tool", ELF, 0o755), ("tool-helper", ELF, 0o755)]);
        let mut fixture = Fixture::new(r"\.tar\.gz$").await;
        let _releases = fixture
            .mock_releases(releases_json("tool_1.2.3_linux_amd64.tar.gz", archive.len()))
            .await;
        let _download = fixture.mock_download(archive).await;

        let err = install_release_asset(&fixture.config).await.unwrap_err();

        assert!(
            matches!(
                err,
                Error::Classify(ClassifyError::AmbiguousOrMissing { count: 2, .. })
            ),
            "{err:?}"
        );
        assert!(!fixture.dir.path().join("bin").join("tool").exists());
    }

    #[test_log::test(tokio::test)]
    async fn test_register_path_for_bare_file_name() {
        let dir = tempfile::tempdir().unwrap();
        let path_file = dir.path().join("github_path");

        let registered = register_path(&path_file, Path::new("tool")).await.unwrap();

        assert_eq!(registered, PathBuf::from("."));
        assert_eq!(std::fs::read_to_string(&path_file).unwrap(), ".\n");
        // The umask can only clear bits.
        #[cfg(unix)]
        assert_eq!(mode(&path_file) & !0o644, 0);
    }

    #[test_log::test(tokio::test)]
    async fn test_install_binary_keeps_both_move_errors() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("binary");
        let install_path = dir.path().join("bin").join("tool");

        let err = install_binary(&missing, &install_path).await.unwrap_err();

        let InstallError::Move { rename, source, .. } = &err else {
            panic!("expected a move error, got {err:?}");
        };
        assert_eq!(rename.kind(), std::io::ErrorKind::NotFound);
        assert_eq!(source.kind(), std::io::ErrorKind::NotFound);
        assert!(err.to_string().contains("rename failed"), "{err}");
    }

    #[test_log::test(tokio::test)]
    async fn test_register_path_error_names_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path_file = dir.path().join("missing").join("github_path");

        let err = register_path(&path_file, Path::new("/opt/bin/tool"))
            .await
            .unwrap_err();

        assert_eq!(err.path, path_file);
        assert!(
            err.source.to_string().contains("github_path"),
            "{}",
            err.source
        );
    }

    #[test]
    fn test_install_dir() {
        assert_eq!(install_dir(Path::new("/opt/bin/tool")), PathBuf::from("/opt/bin"));
        assert_eq!(install_dir(Path::new("bin/tool")), PathBuf::from("bin"));
        assert_eq!(install_dir(Path::new("tool")), PathBuf::from("."));
    }
}
