//! Temurin JDK provisioning.
//!
//! This crate provides functionality to:
//! - Resolve a JDK major version to the matching Adoptium Temurin release asset
//! - Stream the archive to disk with retries, timeouts and cancellation
//! - Unpack zip and tar.gz archives with the top-level directory stripped and
//!   path traversal rejected
//! - Cache installations under `~/.jdks/plugin-modernizer-jdk-<version>`, published
//!   atomically and serialized per version
//!
//! # Example
//!
//! ```ignore
//! use jdkfetch::{FetcherConfig, JdkFetcher, Platform, VersionTag};
//!
//! let fetcher = JdkFetcher::new(FetcherConfig::default())?;
//! let version = VersionTag::new("17")?;
//!
//! let jdk = fetcher.ensure(&version, Platform::current()?).await?;
//! println!("JAVA_HOME={}", jdk.java_home().display());
//! ```

#![warn(missing_docs)]

mod asset;
mod cache;
mod config;
mod download;
mod error;
mod extract;
mod fetcher;
mod lock;
mod platform;
mod release;
mod retry;
mod transport;
mod version;

pub use asset::{AssetMatcher, SUPPORTED_EXTENSIONS, file_name_token};
pub use cache::{ENTRY_PREFIX, JdkCache, JdkInstallation};
pub use config::{DEFAULT_API_BASE, FetcherConfig, LockSettings, RetryConfig};
pub use download::{
    DownloadProgress, Downloader, ProgressCallback, archive_extension, archive_path,
};
pub use error::{Error, NotFoundReason, Result};
pub use extract::{
    ArchiveExtractor, ArchiveFormat, EntryPath, ExtractSummary, RejectReason, extract_tar_gz,
    extract_zip, strip_top_level,
};
pub use fetcher::JdkFetcher;
pub use lock::{InstallLock, LockGuard, LockMetadata, VersionLocks};
pub use platform::{Os, Platform};
pub use release::{
    Release, ReleaseAsset, ReleaseResolver, Resolution, ResolvedAsset, select_asset,
};
pub use retry::retry_with_backoff;
pub use transport::{ByteStream, HttpResponse, HttpTransport, ReqwestTransport};
pub use version::VersionTag;

// Re-exported so callers can build cancellation tokens without a direct dependency
pub use tokio_util::sync::CancellationToken;
