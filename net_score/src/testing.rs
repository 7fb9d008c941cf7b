use async_trait::async_trait;
use chrono::{DateTime, Utc};
use clients::api::{
    Commit, Contributor, DirEntry, Issue, IssueState, PullRequest, RateLimitStatus, RepoApi, RepoMetadata, Result,
    Review, StateFilter,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// In-memory [`RepoApi`] counting the calls it serves.
#[derive(Default)]
pub(crate) struct MockRepoApi {
    pub remaining: u32,
    pub license: Option<String>,
    pub readme: Option<String>,
    pub files: HashMap<String, String>,
    pub directories: HashMap<String, Vec<DirEntry>>,
    pub contributors: Vec<Contributor>,
    pub commits: Vec<Commit>,
    pub pull_requests: Vec<PullRequest>,
    pub reviews: HashMap<u64, Vec<Review>>,
    pub issues: Vec<Issue>,
    /// Open pull requests the issues endpoint lists ahead of open issues.
    pub open_pull_requests_listed: usize,
    pub readme_delay: Option<Duration>,
    pub panic_on_contributors: bool,
    pub status_calls: AtomicUsize,
    pub data_calls: AtomicUsize,
}

impl MockRepoApi {
    pub fn healthy() -> Self {
        MockRepoApi {
            remaining: 5000,
            ..Default::default()
        }
    }

    pub fn exhausted() -> Self {
        MockRepoApi {
            remaining: 0,
            ..Default::default()
        }
    }

    pub fn with_file(mut self, path: &str, content: &str) -> Self {
        self.files.insert(path.to_string(), content.to_string());
        self
    }

    fn served(&self) {
        self.data_calls.fetch_add(1, Ordering::SeqCst);
    }
}

pub(crate) fn date(rfc3339: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(rfc3339)
        .map(|date| date.with_timezone(&Utc))
        .unwrap()
}

#[async_trait]
impl RepoApi for MockRepoApi {
    async fn rate_limit_status(&self) -> Result<RateLimitStatus> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        Ok(RateLimitStatus::new(5000, self.remaining, 1_704_067_200))
    }

    async fn repository(&self, owner: &str, repo: &str) -> Result<RepoMetadata> {
        self.served();
        Ok(RepoMetadata {
            full_name: format!("{}/{}", owner, repo),
            default_branch: "main".to_string(),
            license: self.license.clone(),
            open_issues: 0,
            pushed_at: None,
        })
    }

    async fn file_content(&self, _owner: &str, _repo: &str, path: &str) -> Result<Option<String>> {
        self.served();
        Ok(self.files.get(path).cloned())
    }

    async fn readme(&self, _owner: &str, _repo: &str) -> Result<Option<String>> {
        self.served();
        if let Some(delay) = self.readme_delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self.readme.clone())
    }

    async fn directory(&self, _owner: &str, _repo: &str, path: &str) -> Result<Option<Vec<DirEntry>>> {
        self.served();
        Ok(self.directories.get(path).cloned())
    }

    async fn top_contributors(&self, _owner: &str, _repo: &str, _page: u32, per_page: u32) -> Result<Vec<Contributor>> {
        self.served();
        if self.panic_on_contributors {
            panic!("contributors endpoint blew up");
        }
        Ok(self.contributors.iter().take(per_page as usize).cloned().collect())
    }

    async fn commits(&self, _owner: &str, _repo: &str, per_page: u32) -> Result<Vec<Commit>> {
        self.served();
        Ok(self.commits.iter().take(per_page as usize).cloned().collect())
    }

    async fn pull_requests(
        &self,
        _owner: &str,
        _repo: &str,
        _state: StateFilter,
        per_page: u32,
    ) -> Result<Vec<PullRequest>> {
        self.served();
        Ok(self.pull_requests.iter().take(per_page as usize).cloned().collect())
    }

    async fn reviews(&self, _owner: &str, _repo: &str, number: u64) -> Result<Vec<Review>> {
        self.served();
        Ok(self.reviews.get(&number).cloned().unwrap_or_default())
    }

    async fn issues(&self, _owner: &str, _repo: &str, state: StateFilter, per_page: u32) -> Result<Vec<Issue>> {
        self.served();
        let pull_requests = match state {
            StateFilter::Closed => 0,
            StateFilter::Open | StateFilter::All => self.open_pull_requests_listed,
        };
        Ok(self
            .issues
            .iter()
            .filter(|issue| match state {
                StateFilter::Open => issue.state == IssueState::Open,
                StateFilter::Closed => issue.state == IssueState::Closed,
                StateFilter::All => true,
            })
            .take((per_page as usize).saturating_sub(pull_requests))
            .cloned()
            .collect())
    }
}
