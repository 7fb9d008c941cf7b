use crate::metric::{MetricKind, MetricOutcome, MetricResult};
use crate::policy::Weights;
use crate::repository::RepositoryReference;
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Scores of one repository: every metric plus the weighted NetScore.
#[derive(Debug, Clone, PartialEq)]
pub struct NetScoreReport {
    repository: Arc<RepositoryReference>,
    results: Vec<MetricResult>,
    net_score: f64,
    latency: Duration,
}

impl NetScoreReport {
    /// Combines metric results into a report. Failed or missing metrics contribute 0 to the
    /// NetScore, the remaining weights are not renormalized.
    pub fn aggregate(repository: Arc<RepositoryReference>, results: Vec<MetricResult>, weights: &Weights) -> Self {
        let results: Vec<MetricResult> = MetricKind::all()
            .map(|kind| {
                results
                    .iter()
                    .find(|result| result.kind == kind)
                    .cloned()
                    .unwrap_or_else(|| MetricResult::new(kind, MetricOutcome::failed("not evaluated"), Duration::ZERO))
            })
            .collect();

        let started = Instant::now();
        let net_score = weighted_sum(&results, weights);
        let latency = started.elapsed();

        NetScoreReport {
            repository,
            results,
            net_score,
            latency,
        }
    }

    pub fn repository(&self) -> &RepositoryReference {
        &self.repository
    }

    pub fn net_score(&self) -> f64 {
        self.net_score
    }

    pub fn latency(&self) -> Duration {
        self.latency
    }

    /// Results in [`MetricKind`] order.
    pub fn results(&self) -> &[MetricResult] {
        &self.results
    }

    pub fn result(&self, kind: MetricKind) -> Option<&MetricResult> {
        self.results.iter().find(|result| result.kind == kind)
    }

    /// Whether the package may be ingested into the registry.
    pub fn is_ingestible(&self, threshold: f64) -> bool {
        self.net_score > threshold
    }
}

fn weighted_sum(results: &[MetricResult], weights: &Weights) -> f64 {
    results
        .iter()
        .map(|result| weights.weight(result.kind) * result.outcome.value().unwrap_or(0.0))
        .sum::<f64>()
        .clamp(0.0, 1.0)
}

impl Serialize for NetScoreReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(3 + 2 * self.results.len()))?;
        map.serialize_entry("URL", self.repository.native_url())?;
        map.serialize_entry("netScore", &self.net_score)?;
        map.serialize_entry("netScoreLatency", &self.latency.as_secs_f64())?;
        for result in &self.results {
            map.serialize_entry(result.kind.as_ref(), &result.outcome.projected())?;
            map.serialize_entry(&result.kind.latency_key(), &result.latency.as_secs_f64())?;
        }
        map.end()
    }
}

/// Single-line JSON, as printed by the CLI.
impl Display for NetScoreReport {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let json = serde_json::to_string(self).map_err(|_| std::fmt::Error)?;
        f.write_str(&json)
    }
}
