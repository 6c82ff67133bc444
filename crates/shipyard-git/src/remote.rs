//! Remote URL parsing.

use std::fmt;

use url::Url;

use crate::{GitError, GitResult};

/// Host, owner and name of a hosted repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoInfo {
    /// Host name, e.g. `github.com`.
    pub host: String,
    /// Owner path; may contain `/` for nested groups.
    pub owner: String,
    /// Repository name without `.git`.
    pub name: String,
}

impl RepoInfo {
    /// Parses a remote URL.
    ///
    /// Accepts `https://host/owner/repo(.git)`, `ssh://git@host[:port]/owner/repo`
    /// and scp-like `git@host:owner/repo.git`.
    ///
    /// # Errors
    ///
    /// Returns an error if no host, owner and name can be extracted.
    pub fn parse(remote: &str) -> GitResult<Self> {
        let remote = remote.trim();
        let invalid = || GitError::InvalidRemote(remote.to_string());

        let (host, path) = if remote.contains("://") {
            let url = Url::parse(remote).map_err(|_| invalid())?;
            let host = url.host_str().ok_or_else(invalid)?.to_string();
            (host, url.path().to_string())
        } else {
            // scp-like: [user@]host:path
            let (authority, path) = remote.split_once(':').ok_or_else(invalid)?;
            let host = authority.rsplit('@').next().unwrap_or(authority);
            (host.to_string(), path.to_string())
        };

        let path = path.trim_matches('/');
        let path = path.strip_suffix(".git").unwrap_or(path);
        let (owner, name) = path.rsplit_once('/').ok_or_else(invalid)?;

        if host.is_empty() || owner.is_empty() || name.is_empty() {
            return Err(invalid());
        }

        Ok(Self {
            host,
            owner: owner.to_string(),
            name: name.to_string(),
        })
    }

    /// Builds repository info from an `owner/name` slug on the given host.
    ///
    /// # Errors
    ///
    /// Returns an error if the slug has no `/`.
    pub fn from_slug(host: impl Into<String>, slug: &str) -> GitResult<Self> {
        let (owner, name) = slug
            .trim_matches('/')
            .rsplit_once('/')
            .filter(|(owner, name)| !owner.is_empty() && !name.is_empty())
            .ok_or_else(|| GitError::InvalidRemote(slug.to_string()))?;
        Ok(Self {
            host: host.into(),
            owner: owner.to_string(),
            name: name.to_string(),
        })
    }

    /// Returns `owner/name`.
    #[must_use]
    pub fn slug(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }
}

impl fmt::Display for RepoInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.host, self.slug())
    }
}
