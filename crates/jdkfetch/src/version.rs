//! JDK version tags.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{Error, Result};

/// Opaque identifier of a JDK major version, such as `"17"`.
///
/// The tag is used verbatim in URLs, asset names and cache directory names.
/// It is not checked for numeric correctness; it only has to be non-empty and
/// usable as a single path segment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct VersionTag(String);

impl VersionTag {
    /// Create a version tag.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] when `value` is empty or contains
    /// a path separator.
    pub fn new(value: impl Into<String>) -> Result<Self> {
        let value = value.into();
        if value.is_empty() {
            return Err(Error::InvalidArgument(
                "JDK version must not be empty".to_string(),
            ));
        }
        if value.contains(['/', '\\']) || value.chars().any(char::is_control) {
            return Err(Error::InvalidArgument(format!(
                "JDK version '{}' must not contain path separators",
                value.escape_default()
            )));
        }
        Ok(Self(value))
    }

    /// The raw tag.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VersionTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for VersionTag {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl TryFrom<String> for VersionTag {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<VersionTag> for String {
    fn from(tag: VersionTag) -> Self {
        tag.0
    }
}

impl AsRef<str> for VersionTag {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
