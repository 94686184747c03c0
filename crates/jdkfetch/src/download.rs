//! Streaming download of JDK archives.
//!
//! The body is written to a `.part` file next to the destination and renamed
//! into place once complete, so an interrupted download never leaves a
//! truncated archive at the final path.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::RetryConfig;
use crate::retry::retry_with_backoff;
use crate::transport::HttpTransport;
use crate::version::VersionTag;
use crate::{Error, Result};

/// Progress event emitted during downloads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadProgress {
    /// The server answered; `total` comes from `Content-Length`.
    Started {
        /// Total size in bytes, if known.
        total: Option<u64>,
    },
    /// More bytes were written.
    Advanced {
        /// Bytes written so far.
        downloaded: u64,
    },
    /// The download completed.
    Finished {
        /// Total bytes written.
        downloaded: u64,
    },
}

/// Callback receiving download progress.
pub type ProgressCallback = Arc<dyn Fn(DownloadProgress) + Send + Sync>;

/// Archive extension implied by a download URL.
///
/// `.zip` when the URL ends with it (case-insensitive), otherwise `.tar.gz`.
#[must_use]
pub fn archive_extension(url: &str) -> &'static str {
    if url.to_lowercase().ends_with(".zip") {
        ".zip"
    } else {
        ".tar.gz"
    }
}

/// Local path an archive for `version` is downloaded to.
#[must_use]
pub fn archive_path(cache_root: &Path, version: &VersionTag, url: &str) -> PathBuf {
    cache_root.join(format!("jdk{version}{}", archive_extension(url)))
}

fn part_path(dest: &Path) -> PathBuf {
    let mut name = dest
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "download".into());
    name.push(".part");
    dest.with_file_name(name)
}

/// Streams remote content to local files.
#[derive(Clone)]
pub struct Downloader {
    transport: Arc<dyn HttpTransport>,
    retry: RetryConfig,
    progress: Option<ProgressCallback>,
    cancel: CancellationToken,
}

impl std::fmt::Debug for Downloader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Downloader")
            .field("retry", &self.retry)
            .field("has_progress", &self.progress.is_some())
            .finish_non_exhaustive()
    }
}

impl Downloader {
    /// Create a downloader.
    #[must_use]
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            transport,
            retry: RetryConfig::none(),
            progress: None,
            cancel: CancellationToken::new(),
        }
    }

    /// Retry transient failures with this configuration.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Report progress to `callback`.
    #[must_use]
    pub fn with_progress(mut self, callback: ProgressCallback) -> Self {
        self.progress = Some(callback);
        self
    }

    /// Abort the download when `token` is cancelled.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Download `url` to `dest`, replacing any existing file.
    ///
    /// Returns the number of bytes written.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Network`] on transport failure or a non-success
    /// status, [`Error::Cancelled`] if cancelled, or an IO error. In every
    /// failure case `dest` is left as it was.
    pub async fn download(&self, url: &str, dest: &Path) -> Result<u64> {
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let temp = part_path(dest);
        info!(%url, dest = %dest.display(), "Downloading JDK archive");

        let result = retry_with_backoff(&self.retry, "download archive", || {
            self.download_once(url, &temp)
        })
        .await;

        match result {
            Ok(bytes) => {
                tokio::fs::rename(&temp, dest).await?;
                info!(dest = %dest.display(), bytes, "Download complete");
                Ok(bytes)
            }
            Err(e) => {
                if let Err(cleanup) = tokio::fs::remove_file(&temp).await {
                    if cleanup.kind() != std::io::ErrorKind::NotFound {
                        warn!(
                            path = %temp.display(),
                            error = %cleanup,
                            "Failed to remove partial download"
                        );
                    }
                }
                Err(e)
            }
        }
    }

    async fn download_once(&self, url: &str, temp: &Path) -> Result<u64> {
        if self.cancel.is_cancelled() {
            return Err(Error::Cancelled(format!("download of {url}")));
        }

        let mut response = self.transport.get(url).await?;
        if !response.is_success() {
            return Err(Error::http_status(url, response.status));
        }

        self.report(DownloadProgress::Started {
            total: response.content_length,
        });

        let mut file = tokio::fs::File::create(temp).await?;
        let mut downloaded: u64 = 0;

        loop {
            let chunk = tokio::select! {
                () = self.cancel.cancelled() => {
                    return Err(Error::Cancelled(format!("download of {url}")));
                }
                chunk = response.chunk() => chunk?,
            };
            let Some(chunk) = chunk else { break };

            file.write_all(&chunk).await?;
            downloaded += chunk.len() as u64;
            self.report(DownloadProgress::Advanced { downloaded });
        }

        file.flush().await?;
        file.sync_all().await?;
        drop(file);

        debug!(%url, downloaded, "Stream finished");
        self.report(DownloadProgress::Finished { downloaded });
        Ok(downloaded)
    }

    fn report(&self, event: DownloadProgress) {
        if let Some(callback) = &self.progress {
            callback(event);
        }
    }
}
