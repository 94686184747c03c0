//! Configuration for the JDK fetcher.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::{Error, Result};

/// Default upstream API prefix for Temurin release listings.
pub const DEFAULT_API_BASE: &str = "https://api.github.com/repos/adoptium";

/// Configuration for [`JdkFetcher`](crate::JdkFetcher).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FetcherConfig {
    /// Root directory holding installed JDKs and downloaded archives
    pub cache_dir: PathBuf,

    /// API prefix; the listing URL is `<api_base>/temurin<version>-binaries/releases`
    pub api_base: String,

    /// Timeout for each HTTP request, in seconds
    pub timeout_secs: u64,

    /// User agent sent with every request
    pub user_agent: String,

    /// Keep the downloaded archive after a successful install
    pub keep_archive: bool,

    /// Retry configuration for network operations
    pub retry: RetryConfig,

    /// Per-version lock settings
    pub lock: LockSettings,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            cache_dir: Self::default_cache_dir(),
            api_base: DEFAULT_API_BASE.to_string(),
            timeout_secs: 300,
            user_agent: concat!("jdkfetch/", env!("CARGO_PKG_VERSION")).to_string(),
            keep_archive: true,
            retry: RetryConfig::default(),
            lock: LockSettings::default(),
        }
    }
}

impl FetcherConfig {
    /// Default cache root, `~/.jdks`.
    #[must_use]
    pub fn default_cache_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".jdks")
    }

    /// Load configuration from a TOML file. Missing keys take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when the file cannot be read or parsed.
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read {}: {e}", path.display())))?;
        Self::from_toml_str(&contents)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))
    }

    /// Parse configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] on malformed input.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        toml::from_str(contents).map_err(|e| Error::Config(e.to_string()))
    }

    /// Set the cache root.
    #[must_use]
    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = dir.into();
        self
    }

    /// Set the API prefix.
    #[must_use]
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    /// Set the request timeout.
    #[must_use]
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Set the retry configuration.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Request timeout as a [`Duration`].
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Retry configuration for network operations.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first
    pub max_attempts: u32,

    /// Initial backoff in milliseconds
    pub initial_backoff_ms: u64,

    /// Maximum backoff in milliseconds
    pub max_backoff_ms: u64,

    /// Backoff multiplier
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff_ms: 500,
            max_backoff_ms: 10_000,
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// A configuration that never retries.
    #[must_use]
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }
}

/// Settings for the per-version install lock.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LockSettings {
    /// How long to wait for another installer before giving up, in seconds
    pub timeout_secs: u64,

    /// Age after which a lock file is considered abandoned, in seconds
    pub stale_after_secs: u64,
}

impl Default for LockSettings {
    fn default() -> Self {
        Self {
            timeout_secs: 600,
            stale_after_secs: 1800,
        }
    }
}
