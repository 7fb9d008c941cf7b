//! GitHub REST implementation of [`clients::api::RepoApi`].
//!
//! Every response's `x-ratelimit-*` headers are mirrored into a [`RateLimiter`]. Once the
//! server reports an exhausted quota the client refuses further data requests until the
//! reported reset time instead of retrying against the API.

mod builder;
mod limiter;
mod payload;

pub use builder::{GithubClientBuilder, DEFAULT_GITHUB_URL};
pub use limiter::RateLimiter;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chrono::Utc;
use clients::api::{
    Commit, Contributor, DirEntry, Error, Issue, PullRequest, RateLimitStatus, RepoMetadata, Result, Review,
    StateFilter,
};
use limiter::RateLimit;
use log::debug;
use reqwest::Client;
use reqwest::Response;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Assumed window when GitHub refuses a request without telling when to come back.
const FALLBACK_RESET_SECS: i64 = 60;

pub struct GithubClient {
    client: Client,
    github_url: String,
    limiter: RateLimiter,
    permits: Arc<Semaphore>,
}

impl GithubClient {
    pub fn github_url(&self) -> &str {
        &self.github_url
    }

    /// Quota as seen on the latest response, without asking the server.
    pub async fn last_observed_rate_limit(&self) -> Option<RateLimitStatus> {
        self.limiter.last_observed().await
    }

    /// Sends a GET request. `Ok(None)` stands for 404.
    async fn get(&self, path: &str, query: &[(&str, String)]) -> Result<Option<Response>> {
        self.limiter.check().await?;
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| Error::Error("GitHub client is shut down."))?;

        let url = format!("{}{}", self.github_url, path);
        debug!("GET {} {:?}", url, query);
        let response = self.client.get(&url).query(query).send().await?;
        self.limiter.observe(response.headers()).await;

        let status = response.status();
        if status.is_success() {
            return Ok(Some(response));
        }
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let observed = limiter::rate_limit_from_headers(response.headers());
        let exhausted = observed.map(|limit| limit.is_exhausted()).unwrap_or(false);
        if status == StatusCode::TOO_MANY_REQUESTS || (status == StatusCode::FORBIDDEN && exhausted) {
            let reset = observed
                .map(|limit| limit.reset())
                .unwrap_or_else(|| Utc::now().timestamp() + FALLBACK_RESET_SECS);
            return Err(Error::RateLimited { reset });
        }
        Err(Error::Status {
            status: status.as_u16(),
            url,
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T> {
        match self.get_optional_json(path, query).await? {
            Some(body) => Ok(body),
            None => Err(Error::NotFound(path.to_string())),
        }
    }

    async fn get_optional_json<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<Option<T>> {
        match self.get(path, query).await? {
            Some(response) => Ok(Some(response.json::<T>().await?)),
            None => Ok(None),
        }
    }

    /// List endpoints answer `204 No Content` for empty repositories.
    async fn get_list<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<Vec<T>> {
        match self.get(path, query).await? {
            Some(response) if response.status() == StatusCode::NO_CONTENT => Ok(Vec::new()),
            Some(response) => Ok(response.json::<Vec<T>>().await?),
            None => Err(Error::NotFound(path.to_string())),
        }
    }

    async fn get_file(&self, path: &str) -> Result<Option<Vec<u8>>> {
        self.get_optional_json::<payload::FileContent>(path, &[])
            .await?
            .map(decode_content)
            .transpose()
    }
}

fn decode_content(file: payload::FileContent) -> Result<Vec<u8>> {
    match (file.encoding.as_deref(), file.content) {
        (Some("base64"), Some(content)) => {
            let cleaned: String = content.split_whitespace().collect();
            STANDARD
                .decode(cleaned)
                .map_err(|err| Error::Decode(format!("Invalid base64 content: {}", err)))
        }
        (encoding, _) => Err(Error::Decode(format!("Unsupported content encoding {:?}", encoding))),
    }
}

fn strict_text(bytes: Vec<u8>) -> Result<String> {
    String::from_utf8(bytes).map_err(|err| Error::Decode(format!("Content is not UTF-8: {}", err)))
}

/// Prose is scored on its text, so stray invalid bytes are replaced rather than rejected.
fn lossy_text(bytes: Vec<u8>) -> String {
    String::from_utf8_lossy(&bytes).into_owned()
}

fn repo_path(owner: &str, repo: &str) -> String {
    format!("/repos/{}/{}", owner, repo)
}

#[async_trait]
impl clients::api::RepoApi for GithubClient {
    async fn rate_limit_status(&self) -> Result<RateLimitStatus> {
        // `/rate_limit` does not count against the quota, so it is never refused locally
        let url = format!("{}/rate_limit", self.github_url);
        let response = self.client.get(url).send().await?.error_for_status()?;
        let body = response.json::<payload::RateLimitBody>().await?;
        let status = RateLimitStatus::from(body.resources.core);
        self.limiter
            .record(RateLimit::new(status.limit, status.remaining, status.reset))
            .await;
        Ok(status)
    }

    async fn repository(&self, owner: &str, repo: &str) -> Result<RepoMetadata> {
        let repo = self.get_json::<payload::Repo>(&repo_path(owner, repo), &[]).await?;
        Ok(repo.into())
    }

    async fn file_content(&self, owner: &str, repo: &str, path: &str) -> Result<Option<String>> {
        self.get_file(&format!("{}/contents/{}", repo_path(owner, repo), path))
            .await?
            .map(strict_text)
            .transpose()
    }

    async fn readme(&self, owner: &str, repo: &str) -> Result<Option<String>> {
        Ok(self
            .get_file(&format!("{}/readme", repo_path(owner, repo)))
            .await?
            .map(lossy_text))
    }

    async fn directory(&self, owner: &str, repo: &str, path: &str) -> Result<Option<Vec<DirEntry>>> {
        let request_path = if path.is_empty() {
            format!("{}/contents", repo_path(owner, repo))
        } else {
            format!("{}/contents/{}", repo_path(owner, repo), path)
        };
        let entries = self
            .get_optional_json::<Vec<payload::ContentEntry>>(&request_path, &[])
            .await?;
        Ok(entries.map(|entries| entries.into_iter().map(DirEntry::from).collect()))
    }

    async fn top_contributors(&self, owner: &str, repo: &str, page: u32, per_page: u32) -> Result<Vec<Contributor>> {
        let contributors = self
            .get_list::<payload::Contributor>(
                &format!("{}/contributors", repo_path(owner, repo)),
                &[("page", page.to_string()), ("per_page", per_page.to_string())],
            )
            .await?;
        Ok(contributors.into_iter().map(Contributor::from).collect())
    }

    async fn commits(&self, owner: &str, repo: &str, per_page: u32) -> Result<Vec<Commit>> {
        let commits = self
            .get_list::<payload::Commit>(
                &format!("{}/commits", repo_path(owner, repo)),
                &[("per_page", per_page.to_string())],
            )
            .await?;
        Ok(commits.into_iter().map(Commit::from).collect())
    }

    async fn pull_requests(
        &self,
        owner: &str,
        repo: &str,
        state: StateFilter,
        per_page: u32,
    ) -> Result<Vec<PullRequest>> {
        let pulls = self
            .get_list::<payload::PullRequest>(
                &format!("{}/pulls", repo_path(owner, repo)),
                &[("state", state.to_string()), ("per_page", per_page.to_string())],
            )
            .await?;
        Ok(pulls.into_iter().map(PullRequest::from).collect())
    }

    async fn reviews(&self, owner: &str, repo: &str, number: u64) -> Result<Vec<Review>> {
        let reviews = self
            .get_list::<payload::Review>(&format!("{}/pulls/{}/reviews", repo_path(owner, repo), number), &[])
            .await?;
        Ok(reviews.into_iter().map(Review::from).collect())
    }

    async fn issues(&self, owner: &str, repo: &str, state: StateFilter, per_page: u32) -> Result<Vec<Issue>> {
        let issues = self
            .get_list::<payload::Issue>(
                &format!("{}/issues", repo_path(owner, repo)),
                &[("state", state.to_string()), ("per_page", per_page.to_string())],
            )
            .await?;
        Ok(issues
            .into_iter()
            .filter(|issue| !issue.is_pull_request())
            .map(Issue::from)
            .collect())
    }
}
