//! Version parsing and release channel selection.

use std::fmt;

use semver::{Prerelease, Version};

use crate::PluginResult;

/// Channel for stable releases.
pub const DEFAULT_CHANNEL: &str = "latest";

/// Channel for pre-releases when nothing better is known.
pub const DEFAULT_PRERELEASE_CHANNEL: &str = "next";

/// A semantic version with its pre-release identifier broken out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedVersion {
    version: Version,
    pre_release_id: Option<String>,
}

impl ParsedVersion {
    /// Parses a version string, tolerating a leading `v`.
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not a valid semantic version.
    pub fn parse(input: &str) -> PluginResult<Self> {
        let input = input.trim();
        let input = input.strip_prefix('v').unwrap_or(input);
        Ok(Self::from(Version::parse(input)?))
    }

    /// Returns the underlying version.
    #[must_use]
    pub fn version(&self) -> &Version {
        &self.version
    }

    /// Returns the major component.
    #[must_use]
    pub fn major(&self) -> u64 {
        self.version.major
    }

    /// Returns the minor component.
    #[must_use]
    pub fn minor(&self) -> u64 {
        self.version.minor
    }

    /// Returns the patch component.
    #[must_use]
    pub fn patch(&self) -> u64 {
        self.version.patch
    }

    /// Returns the pre-release identifier (`next` in `1.0.0-next.1`).
    #[must_use]
    pub fn pre_release_id(&self) -> Option<&str> {
        self.pre_release_id.as_deref()
    }

    /// Returns `true` for any pre-release, with or without an identifier.
    #[must_use]
    pub fn is_pre_release(&self) -> bool {
        !self.version.pre.is_empty()
    }

    /// Returns the channel implied by the version alone.
    ///
    /// A stable version always maps to [`DEFAULT_CHANNEL`]. For pre-releases
    /// a configured tag wins over the version's identifier. `None` means the
    /// caller has to pick a channel itself, typically from the registry.
    #[must_use]
    pub fn explicit_channel(&self, configured: Option<&str>) -> Option<String> {
        if !self.is_pre_release() {
            return Some(DEFAULT_CHANNEL.to_string());
        }
        configured
            .or(self.pre_release_id())
            .map(ToString::to_string)
    }
}

impl From<Version> for ParsedVersion {
    fn from(version: Version) -> Self {
        let pre_release_id = first_identifier(&version.pre);
        Self {
            version,
            pre_release_id,
        }
    }
}

impl fmt::Display for ParsedVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.version.fmt(f)
    }
}

fn first_identifier(pre: &Prerelease) -> Option<String> {
    let first = pre.as_str().split('.').next()?;
    if first.is_empty() || first.chars().all(|c| c.is_ascii_digit()) {
        None
    } else {
        Some(first.to_string())
    }
}
