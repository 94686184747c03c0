//! Unpacking of JDK archives.
//!
//! Temurin wraps every archive in a single top-level directory named after
//! the release (`jdk-17.0.9+9/`). That segment is stripped from every entry so
//! the JDK tree lands directly in the extraction directory.
//!
//! Every entry path is classified before anything touches the filesystem.
//! Entries that would land outside the extraction directory abort the
//! extraction.

use flate2::read::GzDecoder;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use tar::{Archive, EntryType};
use tracing::{debug, trace, warn};

use crate::platform::{Os, Platform};
use crate::{Error, Result};

/// Archive encodings a JDK can be shipped in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    /// Zip archive (Windows builds).
    Zip,
    /// Gzip-compressed tarball (macOS and Linux builds).
    TarGz,
}

impl ArchiveFormat {
    /// Format Temurin uses for a platform.
    #[must_use]
    pub fn for_platform(os: Os) -> Self {
        match os {
            Os::Windows => Self::Zip,
            Os::Mac | Os::Linux => Self::TarGz,
        }
    }

    /// Format implied by a file name.
    #[must_use]
    pub fn from_extension(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_string_lossy().to_lowercase();
        if name.ends_with(".zip") {
            Some(Self::Zip)
        } else if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
            Some(Self::TarGz)
        } else {
            None
        }
    }

    /// Format identified by the file's leading magic bytes.
    ///
    /// # Errors
    ///
    /// Returns an IO error if the file cannot be read.
    pub fn sniff(path: &Path) -> Result<Option<Self>> {
        let mut magic = [0u8; 4];
        let mut file = File::open(path)?;
        let mut read = 0;
        while read < magic.len() {
            let n = file.read(&mut magic[read..])?;
            if n == 0 {
                break;
            }
            read += n;
        }
        let magic = &magic[..read];

        if magic.starts_with(b"PK\x03\x04") || magic.starts_with(b"PK\x05\x06") {
            Ok(Some(Self::Zip))
        } else if magic.starts_with(&[0x1f, 0x8b]) {
            Ok(Some(Self::TarGz))
        } else {
            Ok(None)
        }
    }

    /// Pick the format for an archive: content first, then file name, then
    /// the platform's usual format.
    ///
    /// # Errors
    ///
    /// Returns an IO error if the archive cannot be read.
    pub fn resolve(path: &Path, platform: Platform) -> Result<Self> {
        let expected = Self::for_platform(platform.os);
        let format = match Self::sniff(path)? {
            Some(format) => format,
            None => Self::from_extension(path).unwrap_or(expected),
        };
        if format != expected {
            warn!(
                archive = %path.display(),
                ?format,
                ?expected,
                %platform,
                "Archive format differs from the platform's usual format"
            );
        }
        Ok(format)
    }
}

/// Why an entry path was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// Nothing is left once the top-level directory is stripped.
    NoSubpath,
    /// A `..` segment climbs above the extraction directory.
    Traversal,
    /// The path is rooted or carries a drive prefix.
    Absolute,
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoSubpath => f.write_str("entry has no path below the top-level directory"),
            Self::Traversal => f.write_str("entry escapes the extraction directory"),
            Self::Absolute => f.write_str("entry path is absolute"),
        }
    }
}

/// Classification of an archive entry path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryPath {
    /// Normalized path relative to the extraction directory, containing only
    /// plain segments.
    Safe(PathBuf),
    /// The entry must not be written.
    Rejected(RejectReason),
}

fn segments(name: &str) -> impl Iterator<Item = &str> {
    name.split(['/', '\\']).filter(|s| !s.is_empty() && *s != ".")
}

fn is_drive_prefix(segment: &str) -> bool {
    segment.ends_with(':')
}

/// Strip the top-level directory from an entry name and normalize the rest.
///
/// Both `/` and `\` separate segments. `.` segments are ignored, and `..`
/// segments are resolved lexically as long as they stay inside the
/// extraction directory.
#[must_use]
pub fn strip_top_level(name: &str) -> EntryPath {
    if name.starts_with(['/', '\\']) {
        return EntryPath::Rejected(RejectReason::Absolute);
    }

    let mut parts = segments(name);
    let Some(top) = parts.next() else {
        return EntryPath::Rejected(RejectReason::NoSubpath);
    };
    if top == ".." {
        return EntryPath::Rejected(RejectReason::Traversal);
    }
    if is_drive_prefix(top) {
        return EntryPath::Rejected(RejectReason::Absolute);
    }

    let mut seen_any = false;
    let mut stack: Vec<&str> = Vec::new();
    for part in parts {
        seen_any = true;
        if part == ".." {
            if stack.pop().is_none() {
                return EntryPath::Rejected(RejectReason::Traversal);
            }
        } else if is_drive_prefix(part) {
            return EntryPath::Rejected(RejectReason::Absolute);
        } else {
            stack.push(part);
        }
    }

    if !seen_any || stack.is_empty() {
        return EntryPath::Rejected(RejectReason::NoSubpath);
    }
    EntryPath::Safe(stack.iter().collect())
}

/// Resolve a symlink target written relative to the link's own directory.
///
/// Returns the target relative to the extraction directory, or `None` when it
/// would leave it.
///
/// `..` is only honoured before the first plain segment. The link's own
/// ancestors are real directories, so climbing from them is lexical, but a
/// plain segment may name a symlink from an earlier entry whose `..` is not.
fn resolve_link_target(link: &Path, target: &str) -> Option<PathBuf> {
    if target.is_empty() || target.starts_with(['/', '\\']) {
        return None;
    }
    let mut stack: Vec<String> = link
        .parent()
        .map(|p| {
            p.components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect()
        })
        .unwrap_or_default();
    let mut descended = false;
    for part in segments(target) {
        if part == ".." {
            if descended {
                return None;
            }
            stack.pop()?;
        } else if is_drive_prefix(part) {
            return None;
        } else {
            descended = true;
            stack.push(part.to_string());
        }
    }
    Some(stack.iter().collect())
}

/// Counts of what an extraction produced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractSummary {
    /// Regular files written.
    pub files: usize,
    /// Symbolic links created.
    pub symlinks: usize,
    /// Entries skipped (directories and unsupported entry types).
    pub skipped: usize,
}

enum EntryKind {
    File { mode: Option<u32> },
    Symlink { target: String },
    HardLink { source: String },
}

/// Writes archive entries below an extraction directory.
struct EntryWriter<'a> {
    root: &'a Path,
    summary: ExtractSummary,
}

impl<'a> EntryWriter<'a> {
    fn new(root: &'a Path) -> Self {
        Self {
            root,
            summary: ExtractSummary::default(),
        }
    }

    fn relative(name: &str) -> Result<PathBuf> {
        match strip_top_level(name) {
            EntryPath::Safe(path) => Ok(path),
            EntryPath::Rejected(reason) => Err(Error::extraction(name, reason.to_string())),
        }
    }

    /// Refuse to write through a symlink created by an earlier entry.
    fn check_ancestors(&self, name: &str, relative: &Path) -> Result<()> {
        let mut current = self.root.to_path_buf();
        let components: Vec<_> = relative.components().collect();
        for component in components.iter().take(components.len().saturating_sub(1)) {
            current.push(component);
            if std::fs::symlink_metadata(&current).is_ok_and(|m| m.file_type().is_symlink()) {
                return Err(Error::extraction(
                    name,
                    format!("parent {} is a symbolic link", current.display()),
                ));
            }
        }
        Ok(())
    }

    fn prepare(&self, name: &str, relative: &Path) -> Result<PathBuf> {
        self.check_ancestors(name, relative)?;
        let dest = self.root.join(relative);
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent)?;
        }
        // Replace rather than write through whatever is already there
        if let Ok(meta) = std::fs::symlink_metadata(&dest) {
            if meta.is_dir() {
                return Err(Error::extraction(name, "a directory exists at this path"));
            }
            std::fs::remove_file(&dest)?;
        }
        Ok(dest)
    }

    fn write(&mut self, name: &str, kind: EntryKind, contents: &mut dyn Read) -> Result<()> {
        let relative = Self::relative(name)?;
        match kind {
            EntryKind::File { mode } => {
                let dest = self.prepare(name, &relative)?;
                let mut file = File::create(&dest)?;
                std::io::copy(contents, &mut file)?;
                drop(file);
                apply_mode(&dest, mode)?;
                trace!(entry = name, dest = %dest.display(), "Extracted file");
                self.summary.files += 1;
            }
            EntryKind::Symlink { target } => {
                if resolve_link_target(&relative, &target).is_none() {
                    return Err(Error::extraction(
                        name,
                        format!("symlink target '{target}': {}", RejectReason::Traversal),
                    ));
                }
                let dest = self.prepare(name, &relative)?;
                if create_symlink(&target, &dest)? {
                    self.summary.symlinks += 1;
                } else {
                    warn!(entry = name, "Symbolic links are not supported here, skipping");
                    self.summary.skipped += 1;
                }
            }
            EntryKind::HardLink { source } => {
                let source_relative = Self::relative(&source)?;
                self.check_ancestors(&source, &source_relative)?;
                let source_path = self.root.join(&source_relative);
                let is_file = std::fs::symlink_metadata(&source_path)
                    .is_ok_and(|m| m.file_type().is_file());
                if !is_file {
                    return Err(Error::extraction(
                        name,
                        format!("hard link source '{source}' has not been extracted"),
                    ));
                }
                let dest = self.prepare(name, &relative)?;
                std::fs::copy(&source_path, &dest)?;
                self.summary.files += 1;
            }
        }
        Ok(())
    }

    fn skip(&mut self, name: &str, why: &str) {
        trace!(entry = name, why, "Skipping entry");
        self.summary.skipped += 1;
    }
}

#[cfg(unix)]
fn apply_mode(path: &Path, mode: Option<u32>) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    if let Some(mode) = mode {
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode & 0o777))?;
    }
    Ok(())
}

#[cfg(not(unix))]
fn apply_mode(_path: &Path, _mode: Option<u32>) -> Result<()> {
    Ok(())
}

#[cfg(unix)]
fn create_symlink(target: &str, dest: &Path) -> Result<bool> {
    std::os::unix::fs::symlink(target, dest)?;
    Ok(true)
}

#[cfg(not(unix))]
fn create_symlink(_target: &str, _dest: &Path) -> Result<bool> {
    Ok(false)
}

const S_IFMT: u32 = 0o170_000;
const S_IFLNK: u32 = 0o120_000;

/// Extract a zip archive into `dest`, stripping the top-level directory.
///
/// # Errors
///
/// Returns [`Error::Extraction`] for unreadable archives or rejected entries.
pub fn extract_zip(archive_path: &Path, dest: &Path) -> Result<ExtractSummary> {
    let archive_name = archive_path.display().to_string();
    let file = File::open(archive_path)?;
    let mut archive = zip::ZipArchive::new(file)
        .map_err(|e| Error::extraction(&archive_name, format!("failed to open zip: {e}")))?;

    std::fs::create_dir_all(dest)?;
    let mut writer = EntryWriter::new(dest);

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i).map_err(|e| {
            Error::extraction(&archive_name, format!("failed to read zip entry {i}: {e}"))
        })?;
        let name = entry.name().to_string();

        if entry.is_dir() {
            writer.skip(&name, "directory");
            continue;
        }

        let mode = entry.unix_mode();
        let kind = if mode.is_some_and(|m| m & S_IFMT == S_IFLNK) {
            let mut target = String::new();
            entry.read_to_string(&mut target)?;
            EntryKind::Symlink { target }
        } else {
            EntryKind::File { mode }
        };
        writer.write(&name, kind, &mut entry)?;
    }

    debug!(archive = %archive_name, summary = ?writer.summary, "Extracted zip archive");
    Ok(writer.summary)
}

/// Extract a gzip-compressed tarball into `dest`, stripping the top-level
/// directory.
///
/// # Errors
///
/// Returns [`Error::Extraction`] for unreadable archives or rejected entries.
pub fn extract_tar_gz(archive_path: &Path, dest: &Path) -> Result<ExtractSummary> {
    let archive_name = archive_path.display().to_string();
    let file = File::open(archive_path)?;
    let mut archive = Archive::new(GzDecoder::new(file));

    std::fs::create_dir_all(dest)?;
    let mut writer = EntryWriter::new(dest);

    let entries = archive
        .entries()
        .map_err(|e| Error::extraction(&archive_name, format!("failed to read tar: {e}")))?;

    for entry in entries {
        let mut entry = entry
            .map_err(|e| Error::extraction(&archive_name, format!("failed to read tar entry: {e}")))?;
        let name = String::from_utf8_lossy(&entry.path_bytes()).into_owned();
        let entry_type = entry.header().entry_type();

        let kind = match entry_type {
            EntryType::Regular | EntryType::Continuous | EntryType::GNUSparse => EntryKind::File {
                mode: entry.header().mode().ok(),
            },
            EntryType::Symlink | EntryType::Link => {
                let target = entry
                    .link_name_bytes()
                    .map(|b| String::from_utf8_lossy(&b).into_owned())
                    .ok_or_else(|| Error::extraction(&name, "link entry without a target"))?;
                if entry_type == EntryType::Symlink {
                    EntryKind::Symlink { target }
                } else {
                    EntryKind::HardLink { source: target }
                }
            }
            EntryType::Directory => {
                writer.skip(&name, "directory");
                continue;
            }
            _ => {
                writer.skip(&name, "unsupported entry type");
                continue;
            }
        };
        writer.write(&name, kind, &mut entry)?;
    }

    debug!(archive = %archive_name, summary = ?writer.summary, "Extracted tar.gz archive");
    Ok(writer.summary)
}

/// Chooses an unpacker for an archive and runs it.
#[derive(Debug, Clone, Copy)]
pub struct ArchiveExtractor {
    platform: Platform,
}

impl ArchiveExtractor {
    /// Create an extractor for JDKs destined for `platform`.
    #[must_use]
    pub fn new(platform: Platform) -> Self {
        Self { platform }
    }

    /// Extract `archive` into `dest`, creating `dest` if needed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Extraction`] when the archive is malformed or an entry
    /// is rejected, or an IO error.
    pub fn extract(&self, archive: &Path, dest: &Path) -> Result<ExtractSummary> {
        let format = ArchiveFormat::resolve(archive, self.platform)?;
        debug!(archive = %archive.display(), dest = %dest.display(), ?format, "Extracting archive");
        match format {
            ArchiveFormat::Zip => extract_zip(archive, dest),
            ArchiveFormat::TarGz => extract_tar_gz(archive, dest),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use std::io::Write;
    use tempfile::TempDir;
    use zip::write::SimpleFileOptions;

    fn create_zip(path: &Path, files: &[(&str, &[u8])]) {
        let file = File::create(path).unwrap();
        let mut zip = zip::ZipWriter::new(file);
        let options = SimpleFileOptions::default().unix_permissions(0o755);
        for (name, content) in files {
            if name.ends_with('/') {
                zip.add_directory(*name, options).unwrap();
            } else {
                zip.start_file(*name, options).unwrap();
                zip.write_all(content).unwrap();
            }
        }
        zip.finish().unwrap();
    }

    fn create_tar_gz(path: &Path, files: &[(&str, &[u8])]) {
        let file = File::create(path).unwrap();
        let encoder = GzEncoder::new(file, Compression::default());
        let mut builder = tar::Builder::new(encoder);

        for (name, content) in files {
            let mut header = tar::Header::new_gnu();
            if name.ends_with('/') {
                header.set_entry_type(EntryType::Directory);
                header.set_size(0);
            } else {
                header.set_size(content.len() as u64);
            }
            header.set_mode(0o755);
            // Write the raw name so hostile paths reach the extractor unchanged
            let raw = &mut header.as_old_mut().name;
            raw[..name.len()].copy_from_slice(name.as_bytes());
            header.set_cksum();
            builder.append(&header, *content).unwrap();
        }

        builder.into_inner().unwrap().finish().unwrap();
    }

    fn append_link(builder: &mut tar::Builder<impl Write>, kind: EntryType, name: &str, target: &str) {
        let mut header = tar::Header::new_gnu();
        header.set_entry_type(kind);
        header.set_size(0);
        header.set_mode(0o777);
        header.set_path(name).unwrap();
        header.set_link_name(target).unwrap();
        header.set_cksum();
        builder.append(&header, std::io::empty()).unwrap();
    }

    fn list_files(root: &Path) -> Vec<String> {
        let mut out = Vec::new();
        let mut stack = vec![root.to_path_buf()];
        while let Some(dir) = stack.pop() {
            for entry in std::fs::read_dir(&dir).unwrap() {
                let path = entry.unwrap().path();
                if path.is_dir() && !path.is_symlink() {
                    stack.push(path);
                } else {
                    let rel = path.strip_prefix(root).unwrap();
                    out.push(rel.to_string_lossy().replace('\\', "/"));
                }
            }
        }
        out.sort();
        out
    }

    const JDK_ENTRIES: &[(&str, &[u8])] = &[
        ("jdk-17/", b""),
        ("jdk-17/bin/", b""),
        ("jdk-17/bin/java", b"java binary"),
        ("jdk-17/lib/x.jar", b"jar bytes"),
    ];

    #[test]
    fn test_strip_top_level() {
        assert_eq!(
            strip_top_level("jdk-17/bin/java"),
            EntryPath::Safe(PathBuf::from("bin").join("java"))
        );
        assert_eq!(
            strip_top_level("./jdk-17/lib/x.jar"),
            EntryPath::Safe(PathBuf::from("lib").join("x.jar"))
        );
        assert_eq!(
            strip_top_level("jdk-17\\bin\\java.exe"),
            EntryPath::Safe(PathBuf::from("bin").join("java.exe"))
        );
        assert_eq!(
            strip_top_level("jdk-17/bin/../lib/x.jar"),
            EntryPath::Safe(PathBuf::from("lib").join("x.jar"))
        );
    }

    #[test]
    fn test_strip_rejects_single_segment() {
        assert_eq!(
            strip_top_level("README"),
            EntryPath::Rejected(RejectReason::NoSubpath)
        );
        assert_eq!(
            strip_top_level("jdk-17/"),
            EntryPath::Rejected(RejectReason::NoSubpath)
        );
        assert_eq!(strip_top_level(""), EntryPath::Rejected(RejectReason::NoSubpath));
        assert_eq!(
            strip_top_level("jdk-17/bin/.."),
            EntryPath::Rejected(RejectReason::NoSubpath)
        );
    }

    #[test]
    fn test_strip_rejects_traversal() {
        assert_eq!(
            strip_top_level("jdk-17/../../evil"),
            EntryPath::Rejected(RejectReason::Traversal)
        );
        assert_eq!(
            strip_top_level("jdk-17/bin/../../../evil"),
            EntryPath::Rejected(RejectReason::Traversal)
        );
        assert_eq!(
            strip_top_level("jdk-17\\..\\..\\evil"),
            EntryPath::Rejected(RejectReason::Traversal)
        );
        assert_eq!(
            strip_top_level("../jdk-17/evil"),
            EntryPath::Rejected(RejectReason::Traversal)
        );
    }

    #[test]
    fn test_strip_rejects_absolute() {
        assert_eq!(
            strip_top_level("/etc/passwd"),
            EntryPath::Rejected(RejectReason::Absolute)
        );
        assert_eq!(
            strip_top_level("jdk-17/C:/Windows/evil.dll"),
            EntryPath::Rejected(RejectReason::Absolute)
        );
        assert_eq!(
            strip_top_level("C:\\jdk-17\\bin\\java.exe"),
            EntryPath::Rejected(RejectReason::Absolute)
        );
    }

    #[test]
    fn test_resolve_link_target() {
        let link = Path::new("legal/java.se/LICENSE");
        assert_eq!(
            resolve_link_target(link, "../java.base/LICENSE"),
            Some(PathBuf::from("legal").join("java.base").join("LICENSE"))
        );
        assert_eq!(resolve_link_target(link, "../../../etc/passwd"), None);
        assert_eq!(resolve_link_target(link, "/etc/passwd"), None);
        assert_eq!(resolve_link_target(Path::new("java"), ".."), None);
        assert_eq!(resolve_link_target(link, "../java.base/../java.se/LICENSE"), None);
        assert_eq!(resolve_link_target(Path::new("a"), "c/.."), None);
    }

    #[test]
    fn test_extract_zip_strips_top_level() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("jdk.zip");
        create_zip(&archive, JDK_ENTRIES);
        let dest = temp.path().join("out");

        let summary = extract_zip(&archive, &dest).unwrap();

        assert_eq!(list_files(&dest), vec!["bin/java", "lib/x.jar"]);
        assert_eq!(std::fs::read(dest.join("bin/java")).unwrap(), b"java binary");
        assert_eq!(summary.files, 2);
        assert_eq!(summary.skipped, 2);
    }

    #[test]
    fn test_extract_tar_gz_matches_zip_layout() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("jdk.tar.gz");
        create_tar_gz(&archive, JDK_ENTRIES);
        let dest = temp.path().join("out");

        let summary = extract_tar_gz(&archive, &dest).unwrap();

        assert_eq!(list_files(&dest), vec!["bin/java", "lib/x.jar"]);
        assert_eq!(std::fs::read(dest.join("lib/x.jar")).unwrap(), b"jar bytes");
        assert_eq!(summary.files, 2);
    }

    #[cfg(unix)]
    #[test]
    fn test_extract_preserves_executable_bit() {
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("jdk.tar.gz");
        create_tar_gz(&archive, JDK_ENTRIES);
        let dest = temp.path().join("out");
        extract_tar_gz(&archive, &dest).unwrap();

        let mode = std::fs::metadata(dest.join("bin/java")).unwrap().permissions().mode();
        assert_eq!(mode & 0o111, 0o111);
    }

    #[cfg(unix)]
    #[test]
    fn test_special_mode_bits_dropped() {
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("jdk.tar.gz");
        {
            let file = File::create(&archive).unwrap();
            let mut builder = tar::Builder::new(GzEncoder::new(file, Compression::default()));
            let mut header = tar::Header::new_gnu();
            header.set_size(4);
            header.set_mode(0o6755);
            builder
                .append_data(&mut header, "jdk-17/bin/java", &b"java"[..])
                .unwrap();
            builder.into_inner().unwrap().finish().unwrap();
        }
        let dest = temp.path().join("out");
        extract_tar_gz(&archive, &dest).unwrap();

        let mode = std::fs::metadata(dest.join("bin/java")).unwrap().permissions().mode();
        assert_eq!(mode & 0o7777, 0o755);
    }

    #[test]
    fn test_zip_traversal_rejected() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("evil.zip");
        create_zip(&archive, &[("jdk-17/../../evil", b"pwned")]);
        let dest = temp.path().join("a").join("out");

        let err = extract_zip(&archive, &dest).unwrap_err();

        assert!(matches!(err, Error::Extraction { ref entry, .. } if entry == "jdk-17/../../evil"));
        assert!(!temp.path().join("evil").exists());
        assert!(!temp.path().join("a").join("evil").exists());
    }

    #[test]
    fn test_tar_traversal_rejected() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("evil.tar.gz");
        create_tar_gz(&archive, &[("jdk-17/../../evil", b"pwned")]);
        let dest = temp.path().join("a").join("out");

        let err = extract_tar_gz(&archive, &dest).unwrap_err();

        assert!(matches!(err, Error::Extraction { .. }));
        assert!(!temp.path().join("evil").exists());
        assert!(!temp.path().join("a").join("evil").exists());
    }

    #[test]
    fn test_single_segment_entry_fails() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("flat.zip");
        create_zip(&archive, &[("java", b"binary")]);

        let err = extract_zip(&archive, &temp.path().join("out")).unwrap_err();
        assert!(
            matches!(err, Error::Extraction { ref message, .. } if message.contains("top-level"))
        );
    }

    #[test]
    fn test_existing_files_are_overwritten() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("jdk.zip");
        create_zip(&archive, JDK_ENTRIES);
        let dest = temp.path().join("out");
        std::fs::create_dir_all(dest.join("bin")).unwrap();
        std::fs::write(dest.join("bin/java"), b"old and longer content").unwrap();

        extract_zip(&archive, &dest).unwrap();

        assert_eq!(std::fs::read(dest.join("bin/java")).unwrap(), b"java binary");
    }

    #[cfg(unix)]
    #[test]
    fn test_tar_symlinks() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("links.tar.gz");
        {
            let file = File::create(&archive).unwrap();
            let mut builder = tar::Builder::new(GzEncoder::new(file, Compression::default()));
            let mut header = tar::Header::new_gnu();
            header.set_size(7);
            header.set_mode(0o644);
            header.set_path("jdk-17/legal/java.base/LICENSE").unwrap();
            header.set_cksum();
            builder.append(&header, &b"license"[..]).unwrap();
            append_link(&mut builder, EntryType::Symlink, "jdk-17/legal/java.se/LICENSE", "../java.base/LICENSE");
            append_link(&mut builder, EntryType::Link, "jdk-17/legal/COPY", "jdk-17/legal/java.base/LICENSE");
            builder.into_inner().unwrap().finish().unwrap();
        }
        let dest = temp.path().join("out");

        let summary = extract_tar_gz(&archive, &dest).unwrap();

        let link = dest.join("legal/java.se/LICENSE");
        assert!(std::fs::symlink_metadata(&link).unwrap().file_type().is_symlink());
        assert_eq!(std::fs::read(&link).unwrap(), b"license");
        assert_eq!(std::fs::read(dest.join("legal/COPY")).unwrap(), b"license");
        assert_eq!(summary.symlinks, 1);
        assert_eq!(summary.files, 2);
    }

    #[cfg(unix)]
    #[test]
    fn test_tar_escaping_symlink_rejected() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("links.tar.gz");
        {
            let file = File::create(&archive).unwrap();
            let mut builder = tar::Builder::new(GzEncoder::new(file, Compression::default()));
            append_link(&mut builder, EntryType::Symlink, "jdk-17/lib", "../../..");
            builder.into_inner().unwrap().finish().unwrap();
        }

        let err = extract_tar_gz(&archive, &temp.path().join("out")).unwrap_err();
        assert!(matches!(err, Error::Extraction { ref message, .. } if message.contains("symlink")));
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_chained_through_earlier_link_rejected() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("links.tar.gz");
        {
            let file = File::create(&archive).unwrap();
            let mut builder = tar::Builder::new(GzEncoder::new(file, Compression::default()));
            // "c/.." is the root lexically, but c points at the root itself
            append_link(&mut builder, EntryType::Symlink, "jdk-17/c", ".");
            append_link(&mut builder, EntryType::Symlink, "jdk-17/a", "c/..");
            builder.into_inner().unwrap().finish().unwrap();
        }
        let dest = temp.path().join("out");

        let err = extract_tar_gz(&archive, &dest).unwrap_err();

        assert!(
            matches!(err, Error::Extraction { ref entry, ref message } if entry == "jdk-17/a" && message.contains("escapes"))
        );
        assert!(std::fs::symlink_metadata(dest.join("a")).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_write_through_symlinked_directory_rejected() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("links.tar.gz");
        {
            let file = File::create(&archive).unwrap();
            let mut builder = tar::Builder::new(GzEncoder::new(file, Compression::default()));
            append_link(&mut builder, EntryType::Symlink, "jdk-17/here", ".");
            let mut header = tar::Header::new_gnu();
            header.set_size(1);
            header.set_mode(0o644);
            header.set_path("jdk-17/here/x").unwrap();
            header.set_cksum();
            builder.append(&header, &b"x"[..]).unwrap();
            builder.into_inner().unwrap().finish().unwrap();
        }

        let err = extract_tar_gz(&archive, &temp.path().join("out")).unwrap_err();
        assert!(matches!(err, Error::Extraction { ref message, .. } if message.contains("symbolic link")));
    }

    #[test]
    fn test_format_detection_prefers_content() {
        let temp = TempDir::new().unwrap();
        // A zip archive saved under a tarball name
        let misnamed = temp.path().join("jdk17.tar.gz");
        create_zip(&misnamed, JDK_ENTRIES);

        assert_eq!(ArchiveFormat::sniff(&misnamed).unwrap(), Some(ArchiveFormat::Zip));
        assert_eq!(
            ArchiveFormat::resolve(&misnamed, Platform::new(Os::Linux)).unwrap(),
            ArchiveFormat::Zip
        );

        let extractor = ArchiveExtractor::new(Platform::new(Os::Linux));
        let dest = temp.path().join("out");
        extractor.extract(&misnamed, &dest).unwrap();
        assert_eq!(list_files(&dest), vec!["bin/java", "lib/x.jar"]);
    }

    #[test]
    fn test_format_fallbacks() {
        let temp = TempDir::new().unwrap();
        let unknown = temp.path().join("archive.bin");
        std::fs::write(&unknown, b"??").unwrap();
        assert_eq!(ArchiveFormat::sniff(&unknown).unwrap(), None);
        assert_eq!(
            ArchiveFormat::resolve(&unknown, Platform::new(Os::Windows)).unwrap(),
            ArchiveFormat::Zip
        );
        assert_eq!(
            ArchiveFormat::resolve(&unknown, Platform::new(Os::Mac)).unwrap(),
            ArchiveFormat::TarGz
        );

        assert_eq!(
            ArchiveFormat::from_extension(Path::new("x.TGZ")),
            Some(ArchiveFormat::TarGz)
        );
        assert_eq!(ArchiveFormat::from_extension(Path::new("x.7z")), None);
    }

    #[test]
    fn test_corrupt_zip_is_extraction_error() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("broken.zip");
        std::fs::write(&archive, b"PK\x03\x04 definitely not a zip").unwrap();

        let err = extract_zip(&archive, &temp.path().join("out")).unwrap_err();
        assert!(matches!(err, Error::Extraction { .. }));
    }
}
