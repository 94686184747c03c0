//! Platform detection and normalization.
//!
//! Temurin publishes one build per operating system family. Raw platform
//! strings (`"Mac OS X"`, `"Windows 11"`, `"linux"`) are folded into one of
//! those families before they are used in asset names.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{Error, Result};

/// Operating system family a JDK build targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Os {
    /// Microsoft Windows.
    Windows,
    /// macOS.
    Mac,
    /// Linux.
    Linux,
}

impl Os {
    /// Normalize a raw OS name.
    ///
    /// The check is a case-insensitive substring match, so surrounding text
    /// such as versions or vendor names is tolerated.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] for an empty string and
    /// [`Error::UnsupportedPlatform`] when no known family matches.
    pub fn normalize(raw: &str) -> Result<Self> {
        let normalized = raw.trim().to_lowercase();
        if normalized.is_empty() {
            return Err(Error::InvalidArgument(
                "platform must not be empty".to_string(),
            ));
        }

        if normalized.contains("windows") {
            Ok(Self::Windows)
        } else if normalized.contains("mac")
            || normalized.contains("os x")
            || normalized.contains("macos")
        {
            Ok(Self::Mac)
        } else if normalized.contains("linux") {
            Ok(Self::Linux)
        } else {
            Err(Error::UnsupportedPlatform(raw.to_string()))
        }
    }

    /// Tag used in Temurin asset names.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Windows => "windows",
            Self::Mac => "mac",
            Self::Linux => "linux",
        }
    }
}

impl fmt::Display for Os {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Os {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::normalize(s)
    }
}

/// The platform a JDK is provisioned for.
///
/// Architecture is fixed to x64, so only the OS family varies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Platform {
    /// Operating system family.
    pub os: Os,
}

impl Platform {
    /// Architecture tag used in asset names.
    pub const ARCH: &'static str = "x64";

    /// Create a platform for an OS family.
    #[must_use]
    pub fn new(os: Os) -> Self {
        Self { os }
    }

    /// Parse a raw platform string.
    ///
    /// # Errors
    ///
    /// See [`Os::normalize`].
    pub fn parse(raw: &str) -> Result<Self> {
        Os::normalize(raw).map(Self::new)
    }

    /// Platform of the running host.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedPlatform`] on hosts outside the three
    /// supported families.
    pub fn current() -> Result<Self> {
        let os = match std::env::consts::OS {
            "macos" => "mac",
            other => other,
        };
        Self::parse(os)
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.os, Self::ARCH)
    }
}
