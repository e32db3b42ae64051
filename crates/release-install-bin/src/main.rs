use std::{path::PathBuf, process::ExitCode, time::Duration};

use anyhow::Context;
use clap::Parser;
use clap_verbosity_flag::{InfoLevel, Verbosity};
use release_archive::IndicatifProgressReporter;
use release_install::{
    install_release_asset_with_progress, InstallConfig, Repository, DEFAULT_API_URL,
};
use tracing_subscriber::EnvFilter;
use url::Url;

/// Install a single binary from a GitHub release and add its directory to the
/// CI path file.
#[derive(Debug, Parser)]
#[command(name = "release-install", version, about)]
struct Opt {
    /// Owner of the repository
    #[arg(long)]
    owner: String,

    /// Name of the repository
    #[arg(long)]
    repo: String,

    /// Tag of the release to install from. Defaults to the latest release
    #[arg(long, visible_alias = "release")]
    tag: Option<String>,

    /// Regular expression selecting the release asset by name
    #[arg(long)]
    asset_pattern: String,

    /// Where to install the binary
    #[arg(long)]
    install_path: PathBuf,

    /// Token used to authenticate against the GitHub API
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// File that receives the directory of the installed binary
    #[arg(long, env = "GITHUB_PATH")]
    path_file: Option<PathBuf>,

    /// Base URL of the GitHub API
    #[arg(long, env = "GITHUB_API_URL", default_value = DEFAULT_API_URL)]
    api_url: Url,

    /// Deadline for each HTTP request, e.g. `30s` or `5m`
    #[arg(long, value_parser = humantime::parse_duration)]
    timeout: Option<Duration>,

    #[command(flatten)]
    verbose: Verbosity<InfoLevel>,
}

impl From<Opt> for InstallConfig {
    fn from(opt: Opt) -> Self {
        let mut config = InstallConfig::new(
            opt.api_url,
            Repository::new(opt.owner, opt.repo),
            opt.asset_pattern,
            opt.install_path,
        );
        config.tag = opt.tag;
        config.path_file = opt.path_file;
        config.token = opt.token;
        config.timeout = opt.timeout;
        config
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let opt = Opt::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(opt.verbose.tracing_level_filter().into())
                .from_env_lossy(),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    match run(opt).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(opt: Opt) -> anyhow::Result<()> {
    let repository = format!("{}/{}", opt.owner, opt.repo);
    let config = InstallConfig::from(opt);
    tracing::debug!("{config:?}");

    let reporter = IndicatifProgressReporter::with_default_style(&repository);
    let outcome = install_release_asset_with_progress(&config, reporter)
        .await
        .with_context(|| format!("failed to install a release asset of {repository}"))?;

    tracing::info!(
        "{} is ready, {} was added to the path",
        outcome.install_path.display(),
        outcome.registered_dir.display()
    );
    Ok(())
}
