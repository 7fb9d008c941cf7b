use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use derive_more::Constructor;
use strum_macros::{Display, EnumString};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Error: {0}")]
    Error(&'static str),
    #[error("API rate limit exhausted, resets at {}", format_reset(.reset))]
    RateLimited { reset: i64 },
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Unexpected status {status} from {url}")]
    Status { status: u16, url: String },
    #[error("Malformed response: {0}")]
    Decode(String),
    // the only reason of `reqwest` dependency..
    #[error("Request error: {0}")]
    RequestError(#[from] reqwest::Error),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Error::RateLimited { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;

fn format_reset(reset: &i64) -> String {
    reset_time(*reset)
}

/// Formats an epoch-seconds reset time for logs and error messages.
pub fn reset_time(reset: i64) -> String {
    match Utc.timestamp_opt(reset, 0).single() {
        Some(time) => time.format("%H:%M:%S UTC").to_string(),
        None => reset.to_string(),
    }
}

/// Quota of the hosting API as last reported by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Constructor)]
pub struct RateLimitStatus {
    pub limit: u32,
    pub remaining: u32,
    /// Epoch seconds at which `remaining` is restored to `limit`.
    pub reset: i64,
}

impl RateLimitStatus {
    pub fn is_exhausted(&self) -> bool {
        self.remaining == 0
    }

    pub fn reset_time(&self) -> String {
        reset_time(self.reset)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RepoMetadata {
    pub full_name: String,
    pub default_branch: String,
    /// SPDX identifier as detected by the hosting service.
    pub license: Option<String>,
    pub open_issues: u32,
    pub pushed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum EntryKind {
    File,
    Dir,
    Symlink,
    Submodule,
}

#[derive(Debug, Clone, PartialEq, Eq, Constructor)]
pub struct DirEntry {
    pub name: String,
    pub kind: EntryKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contributor {
    pub name: String,
    pub contributions: u32,
}

impl Contributor {
    pub fn new(name: impl Into<String>, contributions: u32) -> Self {
        Contributor {
            name: name.into(),
            contributions,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Constructor)]
pub struct Commit {
    pub sha: String,
    pub author: Option<String>,
    pub date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Constructor)]
pub struct PullRequest {
    pub number: u64,
    pub merged_at: Option<DateTime<Utc>>,
}

impl PullRequest {
    pub fn is_merged(&self) -> bool {
        self.merged_at.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Constructor)]
pub struct Review {
    pub reviewer: Option<String>,
    pub state: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum IssueState {
    Open,
    Closed,
}

#[derive(Debug, Clone, PartialEq, Eq, Constructor)]
pub struct Issue {
    pub number: u64,
    pub state: IssueState,
    pub created_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
}

/// `state` filter of list endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum StateFilter {
    Open,
    Closed,
    All,
}

/// Source-hosting API. Every call except [`RepoApi::rate_limit_status`] consumes quota.
#[async_trait]
pub trait RepoApi: Send + Sync {
    async fn rate_limit_status(&self) -> Result<RateLimitStatus>;

    async fn repository(&self, owner: &str, repo: &str) -> Result<RepoMetadata>;

    /// Decoded content of a file on the default branch, `None` if it does not exist.
    async fn file_content(&self, owner: &str, repo: &str, path: &str) -> Result<Option<String>>;

    async fn readme(&self, owner: &str, repo: &str) -> Result<Option<String>>;

    /// Listing of a directory on the default branch, `None` if it does not exist.
    /// Empty `path` lists the repository root.
    async fn directory(&self, owner: &str, repo: &str, path: &str) -> Result<Option<Vec<DirEntry>>>;

    /// Contributors sorted by contributions in desc order.
    async fn top_contributors(&self, owner: &str, repo: &str, page: u32, per_page: u32) -> Result<Vec<Contributor>>;

    /// Most recent commits of the default branch, newest first.
    async fn commits(&self, owner: &str, repo: &str, per_page: u32) -> Result<Vec<Commit>>;

    async fn pull_requests(
        &self,
        owner: &str,
        repo: &str,
        state: StateFilter,
        per_page: u32,
    ) -> Result<Vec<PullRequest>>;

    async fn reviews(&self, owner: &str, repo: &str, number: u64) -> Result<Vec<Review>>;

    /// Issues (pull requests excluded), most recently created first.
    async fn issues(&self, owner: &str, repo: &str, state: StateFilter, per_page: u32) -> Result<Vec<Issue>>;
}

/// Package registry able to point from a package name to its source repository.
#[async_trait]
pub trait PackageRegistry: Send + Sync {
    /// Raw `repository.url` of the package metadata, `None` when the package declares none.
    async fn repository_url(&self, package: &str) -> Result<Option<String>>;
}

#[test]
fn rate_limit_status_exhausted_test() {
    assert!(RateLimitStatus::new(5000, 0, 0).is_exhausted());
    assert!(!RateLimitStatus::new(5000, 1, 0).is_exhausted());
}

#[test]
fn reset_time_test() {
    assert_eq!(reset_time(1_704_067_200), "00:00:00 UTC");
}

#[test]
fn state_filter_display_test() {
    assert_eq!(StateFilter::Closed.to_string(), "closed");
    assert_eq!("dir".parse::<EntryKind>().unwrap(), EntryKind::Dir);
}
