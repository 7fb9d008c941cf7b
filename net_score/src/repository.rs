use crate::error::{Error, Result};
use serde::Serialize;
use std::fmt::{Display, Formatter};
use url::Url;

const GITHUB_HOSTS: [&str; 2] = ["github.com", "www.github.com"];

/// Resolved identity of a package's source repository.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct RepositoryReference {
    native_url: String,
    external_url: String,
    owner: String,
    repo: String,
}

impl RepositoryReference {
    /// Builds a reference from the URL the user supplied (`native_url`) and the GitHub URL it
    /// points to. The GitHub URL path must hold exactly an owner and a repository name.
    pub fn parse(native_url: &str, github_url: &str) -> Result<Self> {
        let url = Url::parse(github_url.trim()).map_err(|_| Error::invalid_url(github_url, "not a URL"))?;
        if !matches!(url.scheme(), "https" | "http") {
            return Err(Error::invalid_url(github_url, "scheme must be http or https"));
        }
        if !url.host_str().map_or(false, |host| GITHUB_HOSTS.contains(&host)) {
            return Err(Error::invalid_url(github_url, "host is not github.com"));
        }

        let mut segments: Vec<&str> = url.path_segments().map(Iterator::collect).unwrap_or_default();
        if segments.last() == Some(&"") {
            segments.pop();
        }
        if segments.len() != 2 {
            return Err(Error::invalid_url(github_url, "path must be /<owner>/<repository>"));
        }
        let owner = segments[0];
        let repo = segments[1].trim_end_matches(".git");
        if owner.is_empty() || repo.is_empty() {
            return Err(Error::invalid_url(github_url, "empty owner or repository name"));
        }

        Ok(RepositoryReference {
            native_url: native_url.trim().to_string(),
            external_url: format!("https://github.com/{}/{}", owner, repo),
            owner: owner.to_string(),
            repo: repo.to_string(),
        })
    }

    pub fn from_github_url(url: &str) -> Result<Self> {
        Self::parse(url, url)
    }

    /// URL as supplied by the user, GitHub or npm.
    pub fn native_url(&self) -> &str {
        &self.native_url
    }

    /// Canonical `https://github.com/<owner>/<repo>` URL.
    pub fn external_url(&self) -> &str {
        &self.external_url
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn repo(&self) -> &str {
        &self.repo
    }
}

impl Display for RepositoryReference {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}
