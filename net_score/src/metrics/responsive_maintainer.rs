use super::PAGE_SIZE;
use crate::error::Result;
use crate::metric::{Metric, MetricContext, MetricKind};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use clients::api::{Issue, StateFilter};
use derive_more::Constructor;

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Median close time at or below which maintainers count as fully responsive.
const FAST_CLOSE_DAYS: f64 = 1.0;
const SLOW_CLOSE_DAYS: f64 = 180.0;
const RECENT_COMMIT_DAYS: f64 = 30.0;
const STALE_COMMIT_DAYS: f64 = 365.0;

const SPEED_WEIGHT: f64 = 0.7;
const RECENCY_WEIGHT: f64 = 0.3;

/// How fast issues get closed and how recently the code changed.
#[derive(Constructor)]
pub struct ResponsiveMaintainer {
    context: MetricContext,
}

#[async_trait]
impl Metric for ResponsiveMaintainer {
    fn kind(&self) -> MetricKind {
        MetricKind::ResponsiveMaintainer
    }

    fn context(&self) -> &MetricContext {
        &self.context
    }

    async fn compute(&self) -> Result<f64> {
        let client = &self.context.client;
        let (owner, repo) = (self.context.owner(), self.context.repo());
        let (closed, open, commits) = tokio::try_join!(
            client.issues(owner, repo, StateFilter::Closed, PAGE_SIZE),
            client.issues(owner, repo, StateFilter::Open, PAGE_SIZE),
            client.commits(owner, repo, 1),
        )?;

        let now = Utc::now();
        let speed = speed_score(median_close_days(&closed), !open.is_empty());
        let latest_commit = commits.iter().filter_map(|commit| commit.date).max();
        let recency = recency_score(latest_commit, now);
        Ok(SPEED_WEIGHT * speed + RECENCY_WEIGHT * recency)
    }
}

fn median_close_days(closed: &[Issue]) -> Option<f64> {
    let mut days: Vec<f64> = closed
        .iter()
        .filter_map(|issue| issue.closed_at.map(|closed_at| closed_at - issue.created_at))
        .map(|duration| (duration.num_seconds().max(0) as f64) / SECONDS_PER_DAY)
        .collect();
    if days.is_empty() {
        return None;
    }
    days.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let middle = days.len() / 2;
    if days.len() % 2 == 0 {
        Some((days[middle - 1] + days[middle]) / 2.0)
    } else {
        Some(days[middle])
    }
}

/// Without closed issues the repository is responsive only if nothing is waiting.
fn speed_score(median_days: Option<f64>, has_open_issues: bool) -> f64 {
    match median_days {
        Some(days) => linear_decay(days, FAST_CLOSE_DAYS, SLOW_CLOSE_DAYS),
        None if has_open_issues => 0.0,
        None => 1.0,
    }
}

fn recency_score(latest_commit: Option<DateTime<Utc>>, now: DateTime<Utc>) -> f64 {
    latest_commit.map_or(0.0, |date| {
        let days = (now - date).num_seconds().max(0) as f64 / SECONDS_PER_DAY;
        linear_decay(days, RECENT_COMMIT_DAYS, STALE_COMMIT_DAYS)
    })
}

/// `1.0` up to `full`, falling linearly to `0.0` at `zero`.
fn linear_decay(value: f64, full: f64, zero: f64) -> f64 {
    if value <= full {
        1.0
    } else if value >= zero {
        0.0
    } else {
        (zero - value) / (zero - full)
    }
}
