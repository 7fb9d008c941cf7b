use chrono::{DateTime, Utc};
use clients::api::{EntryKind, IssueState};
use serde::Deserialize;

#[derive(Deserialize, Debug)]
pub struct RateLimitBody {
    pub resources: RateLimitResources,
}

#[derive(Deserialize, Debug)]
pub struct RateLimitResources {
    pub core: RateLimitResource,
}

#[derive(Deserialize, Debug)]
pub struct RateLimitResource {
    pub limit: u32,
    pub remaining: u32,
    pub reset: i64,
}

impl From<RateLimitResource> for clients::api::RateLimitStatus {
    fn from(resource: RateLimitResource) -> Self {
        clients::api::RateLimitStatus::new(resource.limit, resource.remaining, resource.reset)
    }
}

#[derive(Deserialize, Debug)]
pub struct Repo {
    pub full_name: String,
    pub default_branch: String,
    pub license: Option<RepoLicense>,
    #[serde(default)]
    pub open_issues_count: u32,
    pub pushed_at: Option<DateTime<Utc>>,
}

#[derive(Deserialize, Debug)]
pub struct RepoLicense {
    pub spdx_id: Option<String>,
}

impl From<Repo> for clients::api::RepoMetadata {
    fn from(repo: Repo) -> Self {
        clients::api::RepoMetadata {
            full_name: repo.full_name,
            default_branch: repo.default_branch,
            license: repo.license.and_then(|license| license.spdx_id),
            open_issues: repo.open_issues_count,
            pushed_at: repo.pushed_at,
        }
    }
}

/// Single file of the contents API.
#[derive(Deserialize, Debug)]
pub struct FileContent {
    #[serde(default)]
    pub encoding: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
}

/// Element of a directory listing of the contents API.
#[derive(Deserialize, Debug)]
pub struct ContentEntry {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl From<ContentEntry> for clients::api::DirEntry {
    fn from(entry: ContentEntry) -> Self {
        let kind = entry.kind.parse::<EntryKind>().unwrap_or(EntryKind::File);
        clients::api::DirEntry::new(entry.name, kind)
    }
}

#[derive(Deserialize, Debug)]
pub struct Contributor {
    pub login: String,
    pub contributions: u32,
}

impl From<Contributor> for clients::api::Contributor {
    fn from(contributor: Contributor) -> Self {
        clients::api::Contributor {
            name: contributor.login,
            contributions: contributor.contributions,
        }
    }
}

#[derive(Deserialize, Debug)]
pub struct Commit {
    pub sha: String,
    pub commit: CommitDetails,
    pub author: Option<Account>,
}

#[derive(Deserialize, Debug)]
pub struct CommitDetails {
    pub author: Option<CommitSignature>,
}

#[derive(Deserialize, Debug)]
pub struct CommitSignature {
    pub name: Option<String>,
    pub date: Option<DateTime<Utc>>,
}

#[derive(Deserialize, Debug)]
pub struct Account {
    pub login: String,
}

impl From<Commit> for clients::api::Commit {
    fn from(commit: Commit) -> Self {
        let signature = commit.commit.author;
        let date = signature.as_ref().and_then(|signature| signature.date);
        // Prefer the account login, commits by unknown emails only carry a name
        let author = commit
            .author
            .map(|account| account.login)
            .or_else(|| signature.and_then(|signature| signature.name));
        clients::api::Commit::new(commit.sha, author, date)
    }
}

#[derive(Deserialize, Debug)]
pub struct PullRequest {
    pub number: u64,
    pub merged_at: Option<DateTime<Utc>>,
}

impl From<PullRequest> for clients::api::PullRequest {
    fn from(pull: PullRequest) -> Self {
        clients::api::PullRequest::new(pull.number, pull.merged_at)
    }
}

#[derive(Deserialize, Debug)]
pub struct Review {
    pub user: Option<Account>,
    pub state: String,
}

impl From<Review> for clients::api::Review {
    fn from(review: Review) -> Self {
        clients::api::Review::new(review.user.map(|user| user.login), review.state)
    }
}

#[derive(Deserialize, Debug)]
pub struct Issue {
    pub number: u64,
    pub state: String,
    pub created_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
    /// Present when the "issue" is a pull request.
    pub pull_request: Option<serde::de::IgnoredAny>,
}

impl Issue {
    pub fn is_pull_request(&self) -> bool {
        self.pull_request.is_some()
    }
}

impl From<Issue> for clients::api::Issue {
    fn from(issue: Issue) -> Self {
        let state = issue.state.parse::<IssueState>().unwrap_or(IssueState::Open);
        clients::api::Issue::new(issue.number, state, issue.created_at, issue.closed_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repo_without_license_test() {
        let repo: Repo = serde_json::from_str(
            r#"{ "full_name": "a/b", "default_branch": "main", "license": null, "pushed_at": null }"#,
        )
        .unwrap();
        let repo = clients::api::RepoMetadata::from(repo);
        assert_eq!(repo.license, None);
        assert_eq!(repo.open_issues, 0);
    }

    #[test]
    fn commit_author_falls_back_to_name_test() {
        let commit: Commit = serde_json::from_str(
            r#"{
                "sha": "abc",
                "commit": { "author": { "name": "Jane", "date": "2024-01-01T00:00:00Z" } },
                "author": null
            }"#,
        )
        .unwrap();
        let commit = clients::api::Commit::from(commit);
        assert_eq!(commit.author.as_deref(), Some("Jane"));
        assert!(commit.date.is_some());
    }

    #[test]
    fn issue_marks_pull_requests_test() {
        let issue: Issue = serde_json::from_str(
            r#"{
                "number": 7,
                "state": "closed",
                "created_at": "2024-01-01T00:00:00Z",
                "closed_at": "2024-01-02T00:00:00Z",
                "pull_request": { "url": "https://api.github.com/repos/a/b/pulls/7" }
            }"#,
        )
        .unwrap();
        assert!(issue.is_pull_request());
        assert_eq!(clients::api::Issue::from(issue).state, IssueState::Closed);
    }
}
