use crate::limiter::RateLimiter;
use crate::GithubClient;
use clients::api::Result;
use reqwest::header;
use reqwest::header::HeaderMap;
use reqwest::header::HeaderName;
use reqwest::header::HeaderValue;
use reqwest::ClientBuilder;
use secrecy::ExposeSecret;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

pub const DEFAULT_GITHUB_URL: &str = "https://api.github.com";
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_MAX_CONCURRENT_REQUESTS: usize = 8;

pub struct GithubClientBuilder {
    client_builder: ClientBuilder,
    github_url: String,
    headers: HeaderMap,
    request_timeout: Duration,
    max_concurrent_requests: usize,
}

impl Default for GithubClientBuilder {
    fn default() -> Self {
        let mut headers = HeaderMap::default();
        headers.insert(header::USER_AGENT, HeaderValue::from_static("net-score"));
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/vnd.github.v3+json"));
        Self {
            client_builder: ClientBuilder::default(),
            github_url: DEFAULT_GITHUB_URL.to_string(),
            headers,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            max_concurrent_requests: DEFAULT_MAX_CONCURRENT_REQUESTS,
        }
    }
}

impl GithubClientBuilder {
    pub fn try_with_token(self, token: secrecy::SecretString) -> Result<GithubClientBuilder> {
        let mut value = HeaderValue::from_str(&format!("Bearer {}", token.expose_secret()))
            .map_err(|err| anyhow::anyhow!("Invalid token: {}", err))?;
        value.set_sensitive(true);
        let mut builder = self;
        builder.headers.insert(header::AUTHORIZATION, value);
        Ok(builder)
    }

    pub fn try_with_user_agent<STR: AsRef<str>>(self, user_agent: STR) -> Result<GithubClientBuilder> {
        Ok(self.try_with_header(header::USER_AGENT, user_agent)?)
    }

    pub fn with_github_url<STR: AsRef<str>>(mut self, url: STR) -> GithubClientBuilder {
        self.github_url = url.as_ref().trim_end_matches('/').to_string();
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> GithubClientBuilder {
        self.request_timeout = timeout;
        self
    }

    pub fn with_max_concurrent_requests(mut self, max: usize) -> GithubClientBuilder {
        self.max_concurrent_requests = max;
        self
    }

    fn try_with_header(mut self, key: HeaderName, val: impl AsRef<str>) -> anyhow::Result<GithubClientBuilder> {
        let val = HeaderValue::from_str(val.as_ref())?;
        self.headers.insert(key, val);
        Ok(self)
    }

    pub fn build(self) -> Result<GithubClient> {
        if self.max_concurrent_requests == 0 {
            return Err(clients::api::Error::Error("Max concurrent requests must be positive."));
        }
        let client = self
            .client_builder
            .default_headers(self.headers)
            .timeout(self.request_timeout)
            .build()?;
        Ok(GithubClient {
            client,
            github_url: self.github_url,
            limiter: RateLimiter::default(),
            permits: Arc::new(Semaphore::new(self.max_concurrent_requests)),
        })
    }
}
