use chrono::Utc;
use clients::api::{Error, RateLimitStatus, Result};
use derive_more::Constructor;
use log::debug;
use reqwest::header::HeaderMap;
use reqwest::header::HeaderValue;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Constructor, Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimit {
    limit: u32,
    remaining: u32,
    reset: i64,
}

impl RateLimit {
    pub(crate) fn is_exhausted(&self) -> bool {
        self.remaining == 0
    }

    pub(crate) fn reset(&self) -> i64 {
        self.reset
    }
}

impl From<RateLimit> for RateLimitStatus {
    fn from(limit: RateLimit) -> Self {
        RateLimitStatus::new(limit.limit, limit.remaining, limit.reset)
    }
}

/// Mirrors the quota reported by the server. It never decrements anything on
/// its own, the server is the only authority on what is left.
#[derive(Clone, Default)]
pub struct RateLimiter {
    limit: Arc<Mutex<Option<RateLimit>>>,
}

impl RateLimiter {
    /// Fails fast when the last observed quota is exhausted and its window has not reset yet.
    pub(crate) async fn check(&self) -> Result<()> {
        let rate_limit = self.limit.lock().await;
        match *rate_limit {
            Some(limit) if limit.is_exhausted() && limit.reset > Utc::now().timestamp() => {
                debug!("Quota exhausted until {}. Not sending request.", limit.reset);
                Err(Error::RateLimited { reset: limit.reset })
            }
            _ => Ok(()),
        }
    }

    pub(crate) async fn observe(&self, headers: &HeaderMap<HeaderValue>) {
        match rate_limit_from_headers(headers) {
            Some(observed) => self.record(observed).await,
            None => debug!("Response carries no rate limit headers."),
        }
    }

    pub(crate) async fn record(&self, observed: RateLimit) {
        let mut rate_limit = self.limit.lock().await;
        let merged = match *rate_limit {
            // Min `remaining` because in case of parallel requests late response may arrive with old `remaining`
            Some(current) if current.reset == observed.reset => RateLimit {
                limit: observed.limit,
                remaining: std::cmp::min(current.remaining, observed.remaining),
                reset: current.reset,
            },
            // Max `reset` because in case of parallel requests late response may arrive with old `reset`
            Some(current) if current.reset > observed.reset => current,
            _ => observed,
        };
        *rate_limit = Some(merged);
        debug!("Updated limits: {:?}", merged);
    }

    pub async fn last_observed(&self) -> Option<RateLimitStatus> {
        self.limit.lock().await.map(RateLimitStatus::from)
    }
}

pub(crate) fn rate_limit_from_headers(headers: &HeaderMap<HeaderValue>) -> Option<RateLimit> {
    Some(RateLimit::new(
        read_header::<u32>(headers, "x-ratelimit-limit")?,
        read_header::<u32>(headers, "x-ratelimit-remaining")?,
        read_header::<i64>(headers, "x-ratelimit-reset")?,
    ))
}

fn read_header<T: FromStr>(headers: &HeaderMap<HeaderValue>, header: &str) -> Option<T> {
    headers.get(header)?.to_str().ok()?.parse::<T>().ok()
}
