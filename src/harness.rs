//! Fixture suites checking metrics against live repositories with known scores.

use crate::NetScoreApp;
use log::{debug, info, warn};
use net_score::metrics::all_metrics;
use net_score::{MetricContext, MetricKind, MetricOutcome};
use serde::Deserialize;
use std::collections::HashSet;
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

const BUILTIN_SUITES: &str = include_str!("../fixtures/self_test.json");
const DEFAULT_TOLERANCE: f64 = 0.1;
const NET_SCORE: &str = "netScore";

/// Score a fixture checks: the NetScore or a single metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(try_from = "String")]
pub enum Target {
    NetScore,
    Metric(MetricKind),
}

impl Target {
    fn all() -> impl Iterator<Item = Target> {
        std::iter::once(Target::NetScore).chain(MetricKind::all().map(Target::Metric))
    }
}

impl FromStr for Target {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        if value == NET_SCORE {
            return Ok(Target::NetScore);
        }
        MetricKind::from_str(value)
            .map(Target::Metric)
            .map_err(|_| format!("Unknown metric {}", value))
    }
}

impl TryFrom<String> for Target {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl Display for Target {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Target::NetScore => f.write_str(NET_SCORE),
            Target::Metric(kind) => write!(f, "{}", kind),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Suite {
    pub name: String,
    pub fixtures: Vec<Fixture>,
}

/// Without `expected` any score in `[0,1]` passes.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fixture {
    pub url: String,
    pub metric: Target,
    #[serde(default)]
    pub expected: Option<f64>,
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,
    /// Seconds.
    #[serde(default)]
    pub max_latency: Option<f64>,
}

fn default_tolerance() -> f64 {
    DEFAULT_TOLERANCE
}

impl Fixture {
    fn check(&self, outcome: &MetricOutcome, latency: Duration) -> Result<f64, String> {
        let value = match outcome {
            MetricOutcome::Scored(value) => *value,
            MetricOutcome::Failed(reason) => return Err(format!("failed: {}", reason)),
        };
        if let Some(expected) = self.expected {
            if (value - expected).abs() > self.tolerance {
                return Err(format!("got {:.3}, expected {} ± {}", value, expected, self.tolerance));
            }
        }
        if let Some(max_latency) = self.max_latency {
            if latency.as_secs_f64() >= max_latency {
                return Err(format!("took {:?}, limit {}s", latency, max_latency));
            }
        }
        Ok(value)
    }
}

pub fn builtin_suites() -> anyhow::Result<Vec<Suite>> {
    Ok(serde_json::from_str(BUILTIN_SUITES)?)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HarnessSummary {
    pub total: usize,
    pub passed: usize,
    /// Scores (NetScore and metrics) with at least one passing fixture.
    pub covered: usize,
}

impl HarnessSummary {
    pub fn coverage(&self) -> usize {
        self.covered * 100 / Target::all().count()
    }
}

impl Display for HarnessSummary {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Total: {}", self.total)?;
        writeln!(f, "Passed: {}", self.passed)?;
        writeln!(f, "Coverage: {}%", self.coverage())?;
        writeln!(
            f,
            "{}/{} test cases passed. {}% line coverage achieved.",
            self.passed,
            self.total,
            self.coverage()
        )
    }
}

pub(crate) async fn run_suites(app: &NetScoreApp, suites: &[Suite]) -> HarnessSummary {
    let mut summary = HarnessSummary::default();
    let mut covered = HashSet::new();
    for suite in suites {
        let before = remaining_quota(app).await;
        for fixture in &suite.fixtures {
            summary.total += 1;
            match run_fixture(app, fixture).await {
                Ok(value) => {
                    summary.passed += 1;
                    covered.insert(fixture.metric);
                    info!("PASS {} {}: {:.3}", fixture.metric, fixture.url, value);
                }
                Err(reason) => warn!("FAIL {} {}: {}", fixture.metric, fixture.url, reason),
            }
        }
        if let (Some(before), Some(after)) = (before, remaining_quota(app).await) {
            debug!("Suite {} used {} API requests", suite.name, before.saturating_sub(after));
        }
    }
    summary.covered = covered.len();
    summary
}

async fn remaining_quota(app: &NetScoreApp) -> Option<u32> {
    app.client
        .rate_limit_status()
        .await
        .map(|status| status.remaining)
        .map_err(|err| warn!("Failed to fetch rate limit: {}", err))
        .ok()
}

async fn run_fixture(app: &NetScoreApp, fixture: &Fixture) -> Result<f64, String> {
    let repository = app
        .resolver
        .resolve(&fixture.url)
        .await
        .map_err(|err| err.to_string())?;
    match fixture.metric {
        Target::NetScore => {
            let report = app.aggregator.evaluate(repository).await;
            fixture.check(&MetricOutcome::scored(report.net_score()), report.latency())
        }
        Target::Metric(kind) => {
            let options = app.aggregator.options();
            let context = MetricContext::new(app.client.clone(), Arc::new(repository), options.metric_timeout);
            let metric = all_metrics(&context, app.aggregator.policy(), options)
                .into_iter()
                .find(|metric| metric.kind() == kind)
                .ok_or_else(|| format!("No metric {}", kind))?;
            let result = metric.evaluate().await;
            fixture.check(&result.outcome, result.latency)
        }
    }
}
