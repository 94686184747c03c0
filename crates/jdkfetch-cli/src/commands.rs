//! Command implementations.
//!
//! Each command returns the line it wants printed; `main` owns stdout.

use jdkfetch::{
    CancellationToken, FetcherConfig, JdkCache, JdkFetcher, Platform, VersionTag, file_name_token,
};
use miette::WrapErr;
use tracing::{debug, instrument};

use crate::cli::{Cli, Commands, Target};
use crate::progress;

/// Build the fetcher configuration: file first, then flags and environment.
pub fn load_config(cli: &Cli) -> miette::Result<FetcherConfig> {
    let mut config = match &cli.config {
        Some(path) => FetcherConfig::from_toml_file(path)
            .wrap_err_with(|| format!("Failed to load {}", path.display()))?,
        None => FetcherConfig::default(),
    };

    if let Some(dir) = &cli.cache_dir {
        config = config.with_cache_dir(dir);
    }
    if let Some(api_base) = &cli.api_base {
        config = config.with_api_base(api_base);
    }
    if let Some(secs) = cli.timeout {
        config = config.with_timeout_secs(secs);
    }

    debug!(
        cache_dir = %config.cache_dir.display(),
        api_base = %config.api_base,
        "Loaded configuration"
    );
    Ok(config)
}

fn parse_target(target: &Target) -> miette::Result<(VersionTag, Platform)> {
    let version = VersionTag::new(target.version.as_str())?;
    let platform = match &target.platform {
        Some(raw) => Platform::parse(raw)?,
        None => Platform::current()?,
    };
    Ok((version, platform))
}

/// Run a command and return its output.
#[instrument(skip_all)]
pub async fn execute(
    cli: &Cli,
    config: FetcherConfig,
    cancel: CancellationToken,
) -> miette::Result<String> {
    match &cli.command {
        Commands::Fetch {
            target,
            no_progress,
        } => {
            let (version, platform) = parse_target(target)?;
            let mut fetcher = JdkFetcher::new(config)?.with_cancellation(cancel);
            if !no_progress {
                fetcher = fetcher.with_progress(progress::download_bar());
            }
            let jdk = fetcher.ensure(&version, platform).await?;
            Ok(jdk.java_home().display().to_string())
        }
        Commands::Path { version } => {
            let version = VersionTag::new(version.as_str())?;
            let cache = JdkCache::new(config.cache_dir);
            cache
                .lookup(&version)
                .map(|path| path.display().to_string())
                .ok_or_else(|| {
                    miette::miette!(
                        help = "Run `jdkfetch fetch` to install it",
                        "JDK {version} is not cached under {}",
                        cache.root().display()
                    )
                })
        }
        Commands::Resolve { target } => {
            let (version, platform) = parse_target(target)?;
            let asset = JdkFetcher::new(config)?.resolve(&version, platform).await?;
            Ok(asset.url)
        }
        Commands::Token { target } => {
            let (version, platform) = parse_target(target)?;
            Ok(file_name_token(&version, platform.os))
        }
    }
}

/// Cancel `token` on Ctrl-C.
pub fn cancel_on_ctrl_c(token: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, cancelling");
            token.cancel();
        }
    });
}
