//! Resolution of a JDK version to a downloadable release asset.
//!
//! Temurin publishes each major version in its own GitHub repository
//! (`adoptium/temurin<version>-binaries`). The release listing is returned
//! newest first, so the first release carrying a matching asset wins.

use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, error, info};

use crate::asset::AssetMatcher;
use crate::config::RetryConfig;
use crate::error::NotFoundReason;
use crate::platform::Platform;
use crate::retry::retry_with_backoff;
use crate::transport::HttpTransport;
use crate::version::VersionTag;
use crate::{Error, Result};

/// GitHub release metadata from the API.
#[derive(Debug, Clone, Deserialize)]
pub struct Release {
    /// Release tag, when present.
    #[serde(default)]
    pub tag_name: Option<String>,
    /// Assets attached to the release, in listed order.
    #[serde(default)]
    pub assets: Vec<ReleaseAsset>,
}

/// GitHub release asset.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ReleaseAsset {
    /// Asset file name.
    pub name: String,
    /// Direct download URL.
    pub browser_download_url: String,
}

/// A release asset chosen for download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedAsset {
    /// Asset file name.
    pub name: String,
    /// Direct download URL.
    pub url: String,
    /// Tag of the release the asset belongs to.
    pub release_tag: Option<String>,
}

/// Outcome of a resolution attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// A matching asset was found.
    Found(ResolvedAsset),
    /// No asset could be resolved.
    NotFound(NotFoundReason),
}

impl Resolution {
    /// Convert into a result, turning `NotFound` into [`Error::AssetNotFound`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::AssetNotFound`] for [`Resolution::NotFound`].
    pub fn into_result(self, version: &VersionTag) -> Result<ResolvedAsset> {
        match self {
            Self::Found(asset) => Ok(asset),
            Self::NotFound(reason) => Err(Error::AssetNotFound {
                version: version.to_string(),
                reason,
            }),
        }
    }
}

/// Pick the first matching asset, scanning releases then assets in listed order.
#[must_use]
pub fn select_asset(releases: &[Release], matcher: &AssetMatcher) -> Resolution {
    for release in releases {
        if let Some(asset) = release.assets.iter().find(|a| matcher.matches(&a.name)) {
            return Resolution::Found(ResolvedAsset {
                name: asset.name.clone(),
                url: asset.browser_download_url.clone(),
                release_tag: release.tag_name.clone(),
            });
        }
    }
    Resolution::NotFound(NotFoundReason::NoMatchingAsset {
        releases_scanned: releases.len(),
    })
}

/// Queries the upstream release listing for a JDK build.
pub struct ReleaseResolver {
    transport: Arc<dyn HttpTransport>,
    api_base: String,
    retry: RetryConfig,
}

impl std::fmt::Debug for ReleaseResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReleaseResolver")
            .field("api_base", &self.api_base)
            .finish_non_exhaustive()
    }
}

impl ReleaseResolver {
    /// Create a resolver against `api_base`.
    #[must_use]
    pub fn new(transport: Arc<dyn HttpTransport>, api_base: impl Into<String>) -> Self {
        Self {
            transport,
            api_base: api_base.into(),
            retry: RetryConfig::none(),
        }
    }

    /// Retry transient listing failures with this configuration.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// URL of the release listing for a version.
    #[must_use]
    pub fn listing_url(&self, version: &VersionTag) -> String {
        format!(
            "{}/temurin{}-binaries/releases",
            self.api_base.trim_end_matches('/'),
            version
        )
    }

    /// Resolve the download URL for a version and platform.
    ///
    /// A non-success listing status is not an error: it is reported as
    /// [`NotFoundReason::ListingUnavailable`] so callers can tell it apart
    /// from a readable listing without a match.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failures or a malformed listing.
    pub async fn resolve(&self, version: &VersionTag, platform: Platform) -> Result<Resolution> {
        let matcher = AssetMatcher::new(version, platform);
        let url = self.listing_url(version);
        info!(%version, %platform, token = matcher.token(), "Resolving JDK release");

        let listing = match retry_with_backoff(&self.retry, "fetch release listing", || {
            self.fetch_listing(&url)
        })
        .await
        {
            // Server errors that outlived the retries are still a status answer
            Err(Error::Network {
                status: Some(status),
                ..
            }) => Listing::Unavailable(status),
            other => other?,
        };

        let releases = match listing {
            Listing::Releases(releases) => releases,
            Listing::Unavailable(status) => {
                error!(%url, status, "Failed to fetch releases");
                return Ok(Resolution::NotFound(NotFoundReason::ListingUnavailable {
                    status,
                }));
            }
        };

        let resolution = select_asset(&releases, &matcher);
        match &resolution {
            Resolution::Found(asset) => {
                debug!(
                    asset = %asset.name,
                    url = %asset.url,
                    tag = ?asset.release_tag,
                    "Resolved JDK asset"
                );
            }
            Resolution::NotFound(reason) => {
                debug!(%version, %reason, "No matching JDK asset");
            }
        }
        Ok(resolution)
    }

    async fn fetch_listing(&self, url: &str) -> Result<Listing> {
        let response = self.transport.get(url).await?;
        if !response.is_success() {
            let status = response.status;
            // Server-side failures are worth another attempt
            if status == 429 || status >= 500 {
                return Err(Error::http_status(url, status));
            }
            return Ok(Listing::Unavailable(status));
        }
        let body = response.bytes().await?;
        let releases: Vec<Release> = serde_json::from_slice(&body)?;
        debug!(%url, releases = releases.len(), "Fetched release listing");
        Ok(Listing::Releases(releases))
    }
}

enum Listing {
    Releases(Vec<Release>),
    Unavailable(u16),
}
