//! The fetch pipeline.
//!
//! ```text
//! cache lookup ──hit──────────────────────────────────────────────▶ done
//!      │ miss
//!      ▼
//! version lock ─▶ cache re-check ─▶ resolve ─▶ download ─▶ extract ─▶ publish
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::cache::{JdkCache, JdkInstallation};
use crate::config::FetcherConfig;
use crate::download::{Downloader, ProgressCallback, archive_path};
use crate::extract::{ArchiveExtractor, ExtractSummary};
use crate::lock::{InstallLock, VersionLocks};
use crate::platform::Platform;
use crate::release::{ReleaseResolver, ResolvedAsset};
use crate::transport::{HttpTransport, ReqwestTransport};
use crate::version::VersionTag;
use crate::{Error, Result};

/// Provisions JDKs into a local cache.
///
/// A fetcher is cheap to share behind an [`Arc`]; concurrent calls for the
/// same version are serialized and only the first one downloads.
pub struct JdkFetcher {
    config: FetcherConfig,
    cache: JdkCache,
    resolver: ReleaseResolver,
    downloader: Downloader,
    locks: VersionLocks,
    install_lock: InstallLock,
    cancel: CancellationToken,
}

impl std::fmt::Debug for JdkFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JdkFetcher")
            .field("cache", &self.cache)
            .field("resolver", &self.resolver)
            .finish_non_exhaustive()
    }
}

impl JdkFetcher {
    /// Create a fetcher talking to the network through `reqwest`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: FetcherConfig) -> Result<Self> {
        let transport = ReqwestTransport::new(&config)?;
        Ok(Self::with_transport(config, Arc::new(transport)))
    }

    /// Create a fetcher using a custom transport.
    #[must_use]
    pub fn with_transport(config: FetcherConfig, transport: Arc<dyn HttpTransport>) -> Self {
        let cache = JdkCache::new(&config.cache_dir);
        let resolver = ReleaseResolver::new(Arc::clone(&transport), config.api_base.clone())
            .with_retry(config.retry.clone());
        let downloader = Downloader::new(transport).with_retry(config.retry.clone());
        let install_lock = InstallLock::new(cache.lock_dir(), &config.lock);

        Self {
            config,
            cache,
            resolver,
            downloader,
            locks: VersionLocks::new(),
            install_lock,
            cancel: CancellationToken::new(),
        }
    }

    /// Report download progress to `callback`.
    #[must_use]
    pub fn with_progress(mut self, callback: ProgressCallback) -> Self {
        self.downloader = self.downloader.with_progress(callback);
        self
    }

    /// Abort in-flight fetches when `token` is cancelled.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.downloader = self.downloader.with_cancellation(token.clone());
        self.cancel = token;
        self
    }

    /// Configuration in use.
    #[must_use]
    pub fn config(&self) -> &FetcherConfig {
        &self.config
    }

    /// The cache this fetcher installs into.
    #[must_use]
    pub fn cache(&self) -> &JdkCache {
        &self.cache
    }

    /// Installed directory for `version`, without touching the network.
    #[must_use]
    pub fn cached(&self, version: &VersionTag) -> Option<PathBuf> {
        self.cache.lookup(version)
    }

    /// Resolve the release asset for a version without downloading it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AssetNotFound`] when nothing matches, or a network
    /// error.
    pub async fn resolve(
        &self,
        version: &VersionTag,
        platform: Platform,
    ) -> Result<ResolvedAsset> {
        self.resolver
            .resolve(version, platform)
            .await?
            .into_result(version)
    }

    /// Ensure `version` is installed and return the installation directory.
    ///
    /// # Errors
    ///
    /// See [`JdkFetcher::ensure`].
    pub async fn get_jdk_path(&self, version: &VersionTag, platform: Platform) -> Result<PathBuf> {
        Ok(self.ensure(version, platform).await?.root)
    }

    /// Ensure `version` is installed for `platform`.
    ///
    /// Returns immediately when the cache already holds the version.
    /// Otherwise the asset is resolved, downloaded and extracted into a staging
    /// directory that is then renamed into place. Nothing is published on
    /// failure.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AssetNotFound`], a network error, [`Error::Extraction`],
    /// [`Error::Lock`], [`Error::Cancelled`] or an IO error.
    pub async fn ensure(
        &self,
        version: &VersionTag,
        platform: Platform,
    ) -> Result<JdkInstallation> {
        let installed = |root| JdkInstallation::new(version.clone(), root, platform.os);

        if let Some(root) = self.cache.lookup(version) {
            debug!(%version, path = %root.display(), "JDK already cached");
            return Ok(installed(root));
        }
        self.check_cancelled(version)?;

        let mutex = self.locks.get(version);
        let _local = tokio::select! {
            () = self.cancel.cancelled() => return Err(cancelled(version)),
            guard = mutex.lock() => guard,
        };
        let owner = format!("jdkfetch:{platform}");
        let _file = tokio::select! {
            () = self.cancel.cancelled() => return Err(cancelled(version)),
            guard = self.install_lock.acquire(version, &owner) => guard?,
        };

        // Another installer may have finished while we waited
        if let Some(root) = self.cache.lookup(version) {
            debug!(%version, path = %root.display(), "JDK installed while waiting for lock");
            return Ok(installed(root));
        }

        let root = self.install(version, platform).await?;
        Ok(installed(root))
    }

    async fn install(&self, version: &VersionTag, platform: Platform) -> Result<PathBuf> {
        info!(%version, %platform, "Installing JDK");

        let asset = self.resolve(version, platform).await?;
        self.check_cancelled(version)?;

        let archive = archive_path(self.cache.root(), version, &asset.url);
        self.downloader.download(&asset.url, &archive).await?;
        self.check_cancelled(version)?;

        let staging = self.cache.prepare_staging(version)?;
        match extract_blocking(platform, archive.clone(), staging.clone()).await {
            Ok(summary) => {
                debug!(%version, files = summary.files, symlinks = summary.symlinks, "Extracted JDK");
            }
            Err(e) => {
                self.cache.discard_staging(&staging);
                return Err(e);
            }
        }

        if let Err(e) = self.check_cancelled(version) {
            self.cache.discard_staging(&staging);
            return Err(e);
        }
        let root = self.cache.publish(version, &staging)?;

        if !self.config.keep_archive {
            remove_archive(&archive);
        }
        info!(%version, path = %root.display(), "JDK ready");
        Ok(root)
    }

    fn check_cancelled(&self, version: &VersionTag) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(cancelled(version));
        }
        Ok(())
    }
}

fn cancelled(version: &VersionTag) -> Error {
    Error::Cancelled(format!("fetch of JDK {version}"))
}

async fn extract_blocking(
    platform: Platform,
    archive: PathBuf,
    staging: PathBuf,
) -> Result<ExtractSummary> {
    let archive_name = archive.display().to_string();
    tokio::task::spawn_blocking(move || ArchiveExtractor::new(platform).extract(&archive, &staging))
        .await
        .map_err(|e| Error::extraction(archive_name, format!("extraction task failed: {e}")))?
}

fn remove_archive(archive: &Path) {
    match std::fs::remove_file(archive) {
        Ok(()) => debug!(path = %archive.display(), "Removed downloaded archive"),
        Err(e) => warn!(path = %archive.display(), error = %e, "Failed to remove archive"),
    }
}
