//! Version management.

use std::fmt;
use std::str::FromStr;

use semver::{Prerelease, Version};

/// How to derive the next version from the latest one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Increment {
    /// Breaking changes.
    Major,
    /// New features.
    Minor,
    /// Fixes.
    Patch,
    /// Next pre-release, optionally on a named channel (`beta`).
    PreRelease(Option<String>),
}

impl fmt::Display for Increment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Major => f.write_str("major"),
            Self::Minor => f.write_str("minor"),
            Self::Patch => f.write_str("patch"),
            Self::PreRelease(None) => f.write_str("prerelease"),
            Self::PreRelease(Some(id)) => write!(f, "prerelease ({id})"),
        }
    }
}

impl FromStr for Increment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "major" => Ok(Self::Major),
            "minor" => Ok(Self::Minor),
            "patch" => Ok(Self::Patch),
            "prerelease" | "pre" => Ok(Self::PreRelease(None)),
            other => Err(format!("unknown increment: {other}")),
        }
    }
}

/// What version to release.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionTarget {
    /// Release exactly this version.
    Exact(Version),
    /// Increment the latest known version.
    Increment(Increment),
}

/// Manages version operations.
#[derive(Debug, Clone, Copy, Default)]
pub struct VersionManager;

impl VersionManager {
    /// Creates a new version manager.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Bumps a version.
    ///
    /// A pre-release is first promoted to its release: `1.3.0-beta.2` bumped
    /// by `minor` gives `1.3.0`.
    ///
    /// # Errors
    ///
    /// Returns an error if a pre-release identifier is not valid semver.
    pub fn bump(&self, version: &Version, increment: &Increment) -> Result<Version, semver::Error> {
        let mut next = version.clone();
        next.build = semver::BuildMetadata::EMPTY;
        let is_pre = !version.pre.is_empty();

        match increment {
            Increment::Major => {
                if !(is_pre && version.minor == 0 && version.patch == 0) {
                    next.major += 1;
                }
                next.minor = 0;
                next.patch = 0;
                next.pre = Prerelease::EMPTY;
            }
            Increment::Minor => {
                if !(is_pre && version.patch == 0) {
                    next.minor += 1;
                }
                next.patch = 0;
                next.pre = Prerelease::EMPTY;
            }
            Increment::Patch => {
                if !is_pre {
                    next.patch += 1;
                }
                next.pre = Prerelease::EMPTY;
            }
            Increment::PreRelease(id) => {
                if !is_pre {
                    next.patch += 1;
                }
                next.pre = next_pre_release(&version.pre, id.as_deref())?;
            }
        }

        Ok(next)
    }
}

/// Computes the pre-release part after `current`.
///
/// Same channel: the trailing number goes up (`beta.1` → `beta.2`).
/// Another channel or a stable version: starts at zero (`beta.0`, or `0`).
fn next_pre_release(current: &Prerelease, id: Option<&str>) -> Result<Prerelease, semver::Error> {
    let parts: Vec<&str> = if current.is_empty() {
        Vec::new()
    } else {
        current.as_str().split('.').collect()
    };
    let same_channel = match id {
        Some(id) => parts.first() == Some(&id),
        None => true,
    };

    let next = if !parts.is_empty() && same_channel {
        let mut parts: Vec<String> = parts.iter().map(ToString::to_string).collect();
        match parts.last().and_then(|last| last.parse::<u64>().ok()) {
            Some(n) => {
                if let Some(last) = parts.last_mut() {
                    *last = (n + 1).to_string();
                }
            }
            None => parts.push("0".to_string()),
        }
        parts.join(".")
    } else {
        match id {
            Some(id) => format!("{id}.0"),
            None => "0".to_string(),
        }
    };

    Prerelease::new(&next)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bump(version: &str, increment: &Increment) -> String {
        let vm = VersionManager::new();
        vm.bump(&Version::parse(version).unwrap(), increment)
            .unwrap()
            .to_string()
    }

    #[test]
    fn test_bump_major() {
        assert_eq!(bump("1.2.3", &Increment::Major), "2.0.0");
    }

    #[test]
    fn test_bump_minor() {
        assert_eq!(bump("1.2.3", &Increment::Minor), "1.3.0");
    }

    #[test]
    fn test_bump_patch() {
        assert_eq!(bump("2.0.1", &Increment::Patch), "2.0.2");
    }

    #[test]
    fn test_bump_promotes_pre_release() {
        assert_eq!(bump("1.2.4-0", &Increment::Patch), "1.2.4");
        assert_eq!(bump("1.3.0-beta.2", &Increment::Minor), "1.3.0");
        assert_eq!(bump("2.0.0-rc.1", &Increment::Major), "2.0.0");
        assert_eq!(bump("1.2.3-beta.1", &Increment::Minor), "1.3.0");
    }

    #[test]
    fn test_bump_pre_release_from_stable() {
        assert_eq!(bump("1.0.0", &Increment::PreRelease(None)), "1.0.1-0");
        assert_eq!(
            bump("1.0.0", &Increment::PreRelease(Some("next".into()))),
            "1.0.1-next.0"
        );
    }

    #[test]
    fn test_bump_pre_release_same_channel() {
        assert_eq!(
            bump("1.0.0-next.0", &Increment::PreRelease(Some("next".into()))),
            "1.0.0-next.1"
        );
        assert_eq!(bump("1.0.0-next.1", &Increment::PreRelease(None)), "1.0.0-next.2");
        assert_eq!(bump("1.0.0-alpha", &Increment::PreRelease(None)), "1.0.0-alpha.0");
    }

    #[test]
    fn test_bump_pre_release_switches_channel() {
        assert_eq!(
            bump("1.0.0-alpha.3", &Increment::PreRelease(Some("beta".into()))),
            "1.0.0-beta.0"
        );
    }

    #[test]
    fn test_bump_invalid_pre_release_id() {
        let vm = VersionManager::new();
        let result = vm.bump(
            &Version::new(1, 0, 0),
            &Increment::PreRelease(Some("not valid!".into())),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_increment_from_str() {
        assert_eq!("major".parse::<Increment>().unwrap(), Increment::Major);
        assert_eq!("Patch".parse::<Increment>().unwrap(), Increment::Patch);
        assert_eq!(
            "prerelease".parse::<Increment>().unwrap(),
            Increment::PreRelease(None)
        );
        assert!("huge".parse::<Increment>().is_err());
    }

    #[test]
    fn test_increment_display() {
        assert_eq!(Increment::Minor.to_string(), "minor");
        assert_eq!(
            Increment::PreRelease(Some("beta".into())).to_string(),
            "prerelease (beta)"
        );
    }
}
