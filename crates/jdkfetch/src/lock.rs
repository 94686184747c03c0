//! Per-version install locking.
//!
//! Two layers serialize installs of the same version:
//!
//! - [`VersionLocks`] hands out one async mutex per version inside a process,
//!   so concurrent tasks queue instead of polling the filesystem.
//! - [`InstallLock`] creates `<root>/.locks/<version>.lock` exclusively, which
//!   keeps separate processes sharing a cache root from installing the same
//!   version at once.
//!
//! Locks for different versions never contend.
//!
//! # Stale locks
//!
//! A lock file records the holder's pid and acquisition time. A lock older
//! than the stale threshold is assumed abandoned and broken. A holder that
//! hangs rather than crashes will therefore keep others waiting until then.
//!
//! Breaking renames the file to a name unique to the breaker and checks that
//! it still holds the stale contents, so waiters racing to break the same lock
//! never delete a lock another waiter has just taken.

use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use crate::config::LockSettings;
use crate::version::VersionTag;
use crate::{Error, Result};

const POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Arena of in-process locks, one per version.
#[derive(Debug, Default)]
pub struct VersionLocks {
    locks: Mutex<HashMap<VersionTag, Arc<tokio::sync::Mutex<()>>>>,
}

impl VersionLocks {
    /// Create an empty arena.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The lock for `version`, created on first use.
    #[must_use]
    pub fn get(&self, version: &VersionTag) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        locks.entry(version.clone()).or_default().clone()
    }
}

/// Contents of a lock file: `pid:acquired_at:owner`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockMetadata {
    /// Process ID that holds the lock
    pub pid: u32,
    /// Unix timestamp when the lock was acquired
    pub acquired_at: u64,
    /// Free-form description of the holder
    pub owner: String,
}

impl LockMetadata {
    fn serialize(&self) -> String {
        format!("{}:{}:{}", self.pid, self.acquired_at, self.owner)
    }

    fn deserialize(s: &str) -> Option<Self> {
        let mut parts = s.splitn(3, ':');
        Some(Self {
            pid: parts.next()?.parse().ok()?,
            acquired_at: parts.next()?.parse().ok()?,
            owner: parts.next()?.to_string(),
        })
    }
}

enum Attempt {
    Acquired,
    Held {
        pid: Option<u32>,
        age: Duration,
        observed: String,
    },
}

/// Cross-process lock files for installs.
#[derive(Debug, Clone)]
pub struct InstallLock {
    lock_dir: PathBuf,
    timeout: Duration,
    stale_threshold: Duration,
}

impl InstallLock {
    /// Create a lock manager storing files in `lock_dir`.
    #[must_use]
    pub fn new(lock_dir: impl Into<PathBuf>, settings: &LockSettings) -> Self {
        Self {
            lock_dir: lock_dir.into(),
            timeout: Duration::from_secs(settings.timeout_secs),
            stale_threshold: Duration::from_secs(settings.stale_after_secs),
        }
    }

    /// Path of the lock file for `version`.
    #[must_use]
    pub fn lock_path(&self, version: &VersionTag) -> PathBuf {
        self.lock_dir.join(format!("{version}.lock"))
    }

    /// Wait for and take the lock for `version`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Lock`] if the lock is still held when the timeout
    /// expires or the lock file cannot be written.
    pub async fn acquire(&self, version: &VersionTag, owner: &str) -> Result<LockGuard> {
        fs::create_dir_all(&self.lock_dir).map_err(|e| self.io_error(version, &e))?;

        let lock_path = self.lock_path(version);
        let start = Instant::now();

        loop {
            let metadata = LockMetadata {
                pid: std::process::id(),
                acquired_at: current_timestamp(),
                owner: owner.to_string(),
            };

            match try_create(&lock_path, &metadata).map_err(|e| self.io_error(version, &e))? {
                Attempt::Acquired => {
                    tracing::debug!(%version, path = %lock_path.display(), "Acquired install lock");
                    return Ok(LockGuard {
                        lock_path,
                        version: version.clone(),
                        contents: metadata.serialize(),
                    });
                }
                Attempt::Held { pid, age, observed } => {
                    if age > self.stale_threshold {
                        tracing::warn!(
                            %version,
                            holder_pid = ?pid,
                            age_secs = age.as_secs(),
                            "Breaking stale install lock"
                        );
                        let broken = break_stale(&lock_path, &observed)
                            .map_err(|e| self.io_error(version, &e))?;
                        if !broken {
                            tracing::debug!(%version, "Stale install lock was already replaced");
                        }
                        continue;
                    }

                    if start.elapsed() >= self.timeout {
                        return Err(Error::Lock {
                            version: version.to_string(),
                            message: format!(
                                "still held by pid {} after waiting {}s",
                                pid.map_or_else(|| "?".to_string(), |p| p.to_string()),
                                self.timeout.as_secs()
                            ),
                            path: Some(lock_path),
                        });
                    }

                    tracing::debug!(%version, holder_pid = ?pid, "Install lock held, waiting");
                }
            }

            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    fn io_error(&self, version: &VersionTag, e: &io::Error) -> Error {
        Error::Lock {
            version: version.to_string(),
            message: e.to_string(),
            path: Some(self.lock_path(version)),
        }
    }
}

fn try_create(lock_path: &Path, metadata: &LockMetadata) -> io::Result<Attempt> {
    match OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(lock_path)
    {
        Ok(mut file) => {
            file.write_all(metadata.serialize().as_bytes())?;
            Ok(Attempt::Acquired)
        }
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Ok(held_by(lock_path)),
        Err(e) => Err(e),
    }
}

/// Inspect an existing lock file.
///
/// A file that cannot be parsed may still be being written by its holder, so
/// its age comes from the modification time instead.
fn held_by(lock_path: &Path) -> Attempt {
    let observed = fs::read_to_string(lock_path).unwrap_or_default();
    if let Some(existing) = LockMetadata::deserialize(&observed) {
        let age = current_timestamp().saturating_sub(existing.acquired_at);
        return Attempt::Held {
            pid: Some(existing.pid),
            age: Duration::from_secs(age),
            observed,
        };
    }
    let age = fs::metadata(lock_path)
        .and_then(|m| m.modified())
        .ok()
        .and_then(|modified| modified.elapsed().ok())
        .unwrap_or_default();
    Attempt::Held {
        pid: None,
        age,
        observed,
    }
}

/// Remove a stale lock file if it still holds `observed`.
///
/// Returns `false` when the file was already gone or had been replaced by a
/// fresh lock, which is put back.
fn break_stale(lock_path: &Path, observed: &str) -> io::Result<bool> {
    static BREAKS: AtomicU64 = AtomicU64::new(0);

    let mut name = lock_path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(format!(
        ".{}.{}.stale",
        std::process::id(),
        BREAKS.fetch_add(1, Ordering::Relaxed)
    ));
    let tombstone = lock_path.with_file_name(name);

    match fs::rename(lock_path, &tombstone) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(e),
    }

    let taken = fs::read_to_string(&tombstone).unwrap_or_default();
    if taken == observed {
        fs::remove_file(&tombstone)?;
        return Ok(true);
    }

    // Someone else broke it first and already holds a fresh lock
    if let Err(e) = fs::hard_link(&tombstone, lock_path) {
        tracing::warn!(
            path = %lock_path.display(),
            error = %e,
            "Failed to restore install lock taken while breaking a stale one"
        );
    }
    fs::remove_file(&tombstone)?;
    Ok(false)
}

fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Releases the lock file when dropped.
#[derive(Debug)]
pub struct LockGuard {
    lock_path: PathBuf,
    version: VersionTag,
    contents: String,
}

impl LockGuard {
    /// Lock file held by this guard.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.lock_path
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        // Leave a lock that is no longer ours to its new holder
        if fs::read_to_string(&self.lock_path).is_ok_and(|c| c != self.contents) {
            tracing::warn!(version = %self.version, "Install lock was taken over, not removing it");
            return;
        }
        if let Err(e) = fs::remove_file(&self.lock_path) {
            if e.kind() != io::ErrorKind::NotFound {
                tracing::warn!(version = %self.version, error = %e, "Failed to release install lock");
            }
        } else {
            tracing::debug!(version = %self.version, "Released install lock");
        }
    }
}
