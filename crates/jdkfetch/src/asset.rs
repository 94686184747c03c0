//! Matching of release asset names against the expected JDK build.

use crate::platform::{Os, Platform};
use crate::version::VersionTag;

/// Archive extensions a JDK asset may carry.
pub const SUPPORTED_EXTENSIONS: [&str; 2] = [".zip", ".tar.gz"];

/// Build the filename token Temurin uses for a JDK build.
///
/// For example `OpenJDK17U-jdk_x64_mac_hotspot_17`.
#[must_use]
pub fn file_name_token(version: &VersionTag, os: Os) -> String {
    format!(
        "OpenJDK{version}U-jdk_{arch}_{os}_hotspot_{version}",
        arch = Platform::ARCH,
    )
}

/// Decides whether an asset name is the JDK archive being looked for.
///
/// The token is matched as a case-insensitive substring so vendor suffixes
/// (build numbers, timestamps) are tolerated.
#[derive(Debug, Clone)]
pub struct AssetMatcher {
    token: String,
    token_lower: String,
}

impl AssetMatcher {
    /// Create a matcher for a version and platform.
    #[must_use]
    pub fn new(version: &VersionTag, platform: Platform) -> Self {
        let token = file_name_token(version, platform.os);
        let token_lower = token.to_lowercase();
        Self { token, token_lower }
    }

    /// The filename token this matcher looks for.
    #[must_use]
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Whether `name` contains the token and ends with a supported extension.
    #[must_use]
    pub fn matches(&self, name: &str) -> bool {
        let name = name.to_lowercase();
        name.contains(&self.token_lower)
            && SUPPORTED_EXTENSIONS.iter().any(|ext| name.ends_with(ext))
    }
}
