//! Error types for JDK provisioning.

use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for JDK provisioning operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Why no downloadable asset could be resolved for a version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotFoundReason {
    /// The release listing answered with a non-success status.
    ListingUnavailable {
        /// HTTP status returned by the listing endpoint.
        status: u16,
    },
    /// The listing was readable but no release carried a matching asset.
    NoMatchingAsset {
        /// Number of releases inspected.
        releases_scanned: usize,
    },
}

impl std::fmt::Display for NotFoundReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ListingUnavailable { status } => {
                write!(f, "release listing unavailable (HTTP {status})")
            }
            Self::NoMatchingAsset { releases_scanned } => {
                write!(f, "no matching asset in {releases_scanned} releases")
            }
        }
    }
}

/// Errors that can occur while provisioning a JDK.
#[derive(Error, Debug, Diagnostic)]
pub enum Error {
    /// A required argument was empty.
    #[error("Invalid argument: {0}")]
    #[diagnostic(code(jdkfetch::invalid_argument))]
    InvalidArgument(String),

    /// The platform string matched none of the supported families.
    #[error("Unsupported platform: {0}")]
    #[diagnostic(
        code(jdkfetch::unsupported_platform),
        help("Supported platforms are windows, mac and linux")
    )]
    UnsupportedPlatform(String),

    /// Transport failure or non-success status while talking to a remote.
    #[error("Network error for {url}: {message}")]
    #[diagnostic(
        code(jdkfetch::network),
        help("Check connectivity, or set GITHUB_TOKEN if the GitHub API is rate limiting you")
    )]
    Network {
        /// The URL being requested.
        url: String,
        /// Error message.
        message: String,
        /// HTTP status, when the server answered.
        status: Option<u16>,
    },

    /// A request exceeded its deadline.
    #[error("Request to {url} timed out after {timeout_secs}s")]
    #[diagnostic(code(jdkfetch::timeout))]
    Timeout {
        /// The URL being requested.
        url: String,
        /// Configured timeout.
        timeout_secs: u64,
    },

    /// The operation was cancelled by the caller.
    #[error("Operation cancelled: {0}")]
    #[diagnostic(code(jdkfetch::cancelled))]
    Cancelled(String),

    /// No release asset matched the requested version and platform.
    #[error("No JDK {version} asset found: {reason}")]
    #[diagnostic(
        code(jdkfetch::asset_not_found),
        help("Check that the version exists as an Adoptium Temurin release for this platform")
    )]
    AssetNotFound {
        /// Requested version.
        version: String,
        /// Why resolution failed.
        reason: NotFoundReason,
    },

    /// An archive entry could not be unpacked.
    #[error("Failed to extract '{entry}': {message}")]
    #[diagnostic(code(jdkfetch::extraction))]
    Extraction {
        /// Archive entry name, or the archive path for archive-level failures.
        entry: String,
        /// Error message.
        message: String,
    },

    /// The per-version lock could not be acquired.
    #[error("Lock error for '{version}': {message}")]
    #[diagnostic(
        code(jdkfetch::lock),
        help("Another process may be installing the same JDK; remove the lock file if it is stale")
    )]
    Lock {
        /// Version being locked.
        version: String,
        /// Error message.
        message: String,
        /// Lock file path.
        path: Option<PathBuf>,
    },

    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    #[diagnostic(code(jdkfetch::config))]
    Config(String),

    /// IO error.
    #[error("IO error: {0}")]
    #[diagnostic(code(jdkfetch::io))]
    Io(#[from] std::io::Error),

    /// JSON parsing error.
    #[error("JSON error: {0}")]
    #[diagnostic(code(jdkfetch::json))]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a network error without a status.
    #[must_use]
    pub fn network(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Network {
            url: url.into(),
            message: message.into(),
            status: None,
        }
    }

    /// Create a network error for a non-success HTTP status.
    #[must_use]
    pub fn http_status(url: impl Into<String>, status: u16) -> Self {
        Self::Network {
            url: url.into(),
            message: format!("unexpected HTTP status {status}"),
            status: Some(status),
        }
    }

    /// Create an extraction error.
    #[must_use]
    pub fn extraction(entry: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Extraction {
            entry: entry.into(),
            message: message.into(),
        }
    }

    /// Whether repeating the failed operation could succeed.
    ///
    /// Transport failures, timeouts and server-side (5xx) or rate-limit (429)
    /// responses are transient; everything else is permanent.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Network { status: None, .. } | Self::Timeout { .. } => true,
            Self::Network {
                status: Some(status),
                ..
            } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}
