//! On-disk JDK cache.
//!
//! Layout under the cache root:
//!
//! ```text
//! <root>/
//! ├── plugin-modernizer-jdk-17/          # published installation
//! ├── .plugin-modernizer-jdk-21.staging/  # extraction in progress
//! ├── .locks/21.lock                      # cross-process install lock
//! └── jdk17.tar.gz                        # downloaded archive
//! ```
//!
//! An entry directory only ever appears through a rename of a fully
//! extracted staging directory, so its existence means the install finished.

use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::Result;
use crate::platform::Os;
use crate::version::VersionTag;

/// Prefix of every installation directory name.
pub const ENTRY_PREFIX: &str = "plugin-modernizer-jdk-";

const LOCK_DIR: &str = ".locks";

/// Cache of extracted JDKs keyed by version.
#[derive(Debug, Clone)]
pub struct JdkCache {
    root: PathBuf,
}

impl JdkCache {
    /// Create a cache rooted at `root`. Nothing is created on disk yet.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Cache root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory a version is installed into.
    #[must_use]
    pub fn entry_dir(&self, version: &VersionTag) -> PathBuf {
        self.root.join(format!("{ENTRY_PREFIX}{version}"))
    }

    /// The installed directory for `version`, if present.
    #[must_use]
    pub fn lookup(&self, version: &VersionTag) -> Option<PathBuf> {
        let dir = self.entry_dir(version);
        dir.is_dir().then_some(dir)
    }

    /// Directory holding the cross-process lock files.
    #[must_use]
    pub fn lock_dir(&self) -> PathBuf {
        self.root.join(LOCK_DIR)
    }

    /// Staging directory a version is extracted into before publishing.
    #[must_use]
    pub fn staging_dir(&self, version: &VersionTag) -> PathBuf {
        self.root.join(format!(".{ENTRY_PREFIX}{version}.staging"))
    }

    /// Create an empty staging directory, clearing leftovers from an
    /// interrupted run.
    ///
    /// # Errors
    ///
    /// Returns an IO error if the directory cannot be reset.
    pub fn prepare_staging(&self, version: &VersionTag) -> Result<PathBuf> {
        let staging = self.staging_dir(version);
        if staging.exists() {
            warn!(path = %staging.display(), "Removing leftover staging directory");
            std::fs::remove_dir_all(&staging)?;
        }
        std::fs::create_dir_all(&staging)?;
        Ok(staging)
    }

    /// Move a fully extracted staging directory into place.
    ///
    /// If another writer published the same version first, the staging
    /// directory is dropped and the existing entry is returned.
    ///
    /// # Errors
    ///
    /// Returns an IO error if the rename fails for any other reason.
    pub fn publish(&self, version: &VersionTag, staging: &Path) -> Result<PathBuf> {
        let entry = self.entry_dir(version);
        if entry.is_dir() {
            debug!(path = %entry.display(), "Entry already published, discarding staging");
            self.discard_staging(staging);
            return Ok(entry);
        }

        match std::fs::rename(staging, &entry) {
            Ok(()) => {
                info!(%version, path = %entry.display(), "Published JDK");
                Ok(entry)
            }
            Err(_) if entry.is_dir() => {
                self.discard_staging(staging);
                Ok(entry)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Best-effort removal of a staging directory.
    pub fn discard_staging(&self, staging: &Path) {
        if let Err(e) = std::fs::remove_dir_all(staging) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %staging.display(), error = %e, "Failed to remove staging directory");
            }
        }
    }
}

/// A JDK present in the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JdkInstallation {
    /// Version tag it was installed for.
    pub version: VersionTag,
    /// Cache entry directory.
    pub root: PathBuf,
    /// Operating system the build targets.
    pub os: Os,
}

impl JdkInstallation {
    /// Create a handle to an installed JDK.
    #[must_use]
    pub fn new(version: VersionTag, root: PathBuf, os: Os) -> Self {
        Self { version, root, os }
    }

    /// The `JAVA_HOME` for this installation.
    ///
    /// macOS builds ship as an application bundle with the JDK under
    /// `Contents/Home`.
    #[must_use]
    pub fn java_home(&self) -> PathBuf {
        let bundled = self.root.join("Contents").join("Home");
        if self.os == Os::Mac && bundled.is_dir() {
            bundled
        } else {
            self.root.clone()
        }
    }

    /// Path to a tool in the JDK's `bin` directory.
    #[must_use]
    pub fn bin(&self, tool: &str) -> PathBuf {
        let name = if self.os == Os::Windows {
            format!("{tool}.exe")
        } else {
            tool.to_string()
        };
        self.java_home().join("bin").join(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn v(s: &str) -> VersionTag {
        VersionTag::new(s).unwrap()
    }

    #[test]
    fn test_cache_layout() {
        let cache = JdkCache::new("/jdks");
        assert_eq!(
            cache.entry_dir(&v("17")),
            PathBuf::from("/jdks/plugin-modernizer-jdk-17")
        );
        assert_eq!(
            cache.staging_dir(&v("17")),
            PathBuf::from("/jdks/.plugin-modernizer-jdk-17.staging")
        );
        assert_eq!(cache.lock_dir(), PathBuf::from("/jdks/.locks"));
    }

    #[test]
    fn test_lookup_requires_directory() {
        let temp = TempDir::new().unwrap();
        let cache = JdkCache::new(temp.path());
        assert_eq!(cache.lookup(&v("17")), None);

        // A stray file with the entry's name is not an installation
        std::fs::write(cache.entry_dir(&v("17")), b"").unwrap();
        assert_eq!(cache.lookup(&v("17")), None);

        std::fs::create_dir(cache.entry_dir(&v("21"))).unwrap();
        assert_eq!(cache.lookup(&v("21")), Some(cache.entry_dir(&v("21"))));
    }

    #[test]
    fn test_prepare_staging_clears_leftovers() {
        let temp = TempDir::new().unwrap();
        let cache = JdkCache::new(temp.path());
        let staging = cache.staging_dir(&v("17"));
        std::fs::create_dir_all(staging.join("bin")).unwrap();
        std::fs::write(staging.join("bin/java"), b"partial").unwrap();

        let staging = cache.prepare_staging(&v("17")).unwrap();
        assert!(staging.is_dir());
        assert_eq!(std::fs::read_dir(&staging).unwrap().count(), 0);
    }

    #[test]
    fn test_publish_renames_staging() {
        let temp = TempDir::new().unwrap();
        let cache = JdkCache::new(temp.path());
        let staging = cache.prepare_staging(&v("17")).unwrap();
        std::fs::write(staging.join("release"), b"JAVA_VERSION=17").unwrap();

        let entry = cache.publish(&v("17"), &staging).unwrap();

        assert_eq!(entry, cache.entry_dir(&v("17")));
        assert!(entry.join("release").is_file());
        assert!(!staging.exists());
    }

    #[test]
    fn test_publish_keeps_existing_entry() {
        let temp = TempDir::new().unwrap();
        let cache = JdkCache::new(temp.path());
        std::fs::create_dir_all(cache.entry_dir(&v("17"))).unwrap();
        std::fs::write(cache.entry_dir(&v("17")).join("marker"), b"first").unwrap();

        let staging = cache.prepare_staging(&v("17")).unwrap();
        let entry = cache.publish(&v("17"), &staging).unwrap();

        assert_eq!(std::fs::read(entry.join("marker")).unwrap(), b"first");
        assert!(!staging.exists());
    }

    #[test]
    fn test_installation_paths() {
        let temp = TempDir::new().unwrap();
        let linux = JdkInstallation::new(v("17"), temp.path().to_path_buf(), Os::Linux);
        assert_eq!(linux.java_home(), temp.path());
        assert_eq!(linux.bin("java"), temp.path().join("bin").join("java"));

        let windows = JdkInstallation::new(v("17"), temp.path().to_path_buf(), Os::Windows);
        assert_eq!(windows.bin("javac"), temp.path().join("bin").join("javac.exe"));

        let mac = JdkInstallation::new(v("17"), temp.path().to_path_buf(), Os::Mac);
        assert_eq!(mac.java_home(), temp.path());
        std::fs::create_dir_all(temp.path().join("Contents/Home")).unwrap();
        assert_eq!(mac.java_home(), temp.path().join("Contents").join("Home"));
        assert_eq!(
            mac.bin("java"),
            temp.path().join("Contents").join("Home").join("bin").join("java")
        );
    }
}
