use crate::error::{Error, Result};
use crate::repository::RepositoryReference;
use async_trait::async_trait;
use clients::api::RepoApi;
use derive_more::Constructor;
use log::{debug, info, warn};
use std::sync::Arc;
use std::time::{Duration, Instant};
use strum::IntoEnumIterator;
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};

/// The metrics a NetScore is made of, in aggregation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumIter, EnumString, AsRefStr)]
#[strum(serialize_all = "camelCase")]
pub enum MetricKind {
    RampUp,
    Correctness,
    BusFactor,
    ResponsiveMaintainer,
    License,
    DependencyPinning,
    CodeReviewFraction,
}

impl MetricKind {
    pub fn all() -> impl Iterator<Item = MetricKind> {
        MetricKind::iter()
    }

    /// Report key of the metric's latency, e.g. `busFactorLatency`.
    pub fn latency_key(&self) -> String {
        format!("{}Latency", self)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MetricOutcome {
    /// Value in `[0,1]`.
    Scored(f64),
    Failed(String),
}

impl MetricOutcome {
    /// Clamps finite values into `[0,1]`; NaN and infinities become failures.
    pub fn scored(value: f64) -> Self {
        if value.is_finite() {
            MetricOutcome::Scored(value.clamp(0.0, 1.0))
        } else {
            MetricOutcome::Failed(format!("non-finite score {}", value))
        }
    }

    pub fn failed<E: ToString>(reason: E) -> Self {
        MetricOutcome::Failed(reason.to_string())
    }

    pub fn value(&self) -> Option<f64> {
        match self {
            MetricOutcome::Scored(value) => Some(*value),
            MetricOutcome::Failed(_) => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, MetricOutcome::Failed(_))
    }

    /// Value as reported to consumers, `-1` for failures.
    pub fn projected(&self) -> f64 {
        self.value().unwrap_or(-1.0)
    }
}

#[derive(Debug, Clone, PartialEq, Constructor)]
pub struct MetricResult {
    pub kind: MetricKind,
    pub outcome: MetricOutcome,
    pub latency: Duration,
}

/// Everything a metric needs to score one repository.
#[derive(Clone, Constructor)]
pub struct MetricContext {
    pub client: Arc<dyn RepoApi>,
    pub repository: Arc<RepositoryReference>,
    pub timeout: Duration,
}

impl MetricContext {
    pub fn owner(&self) -> &str {
        self.repository.owner()
    }

    pub fn repo(&self) -> &str {
        self.repository.repo()
    }
}

#[async_trait]
pub trait Metric: Send + Sync {
    fn kind(&self) -> MetricKind;

    fn context(&self) -> &MetricContext;

    /// Raw score of the repository. Callers go through [`Metric::evaluate`].
    async fn compute(&self) -> Result<f64>;

    /// Scores the repository. Never fails: quota exhaustion, API errors, timeouts and
    /// out-of-range values all end up as [`MetricOutcome::Failed`]. Latency is always measured.
    async fn evaluate(&self) -> MetricResult {
        let started = Instant::now();
        let computed = guarded_compute(self).await;
        let latency = started.elapsed();

        let repository = &self.context().repository;
        let outcome = match computed {
            Ok(value) => MetricOutcome::scored(value),
            Err(err) if err.is_rate_limited() => {
                info!("{} of {} skipped: {}", self.kind(), repository, err);
                return MetricResult::new(self.kind(), MetricOutcome::failed(err), latency);
            }
            Err(err) => MetricOutcome::failed(err),
        };
        match &outcome {
            MetricOutcome::Scored(value) => debug!("{} of {}: {} in {:?}", self.kind(), repository, value, latency),
            MetricOutcome::Failed(reason) => warn!("{} of {} failed: {}", self.kind(), repository, reason),
        }
        MetricResult::new(self.kind(), outcome, latency)
    }
}

async fn guarded_compute<M: Metric + ?Sized>(metric: &M) -> Result<f64> {
    let context = metric.context();
    let status = context.client.rate_limit_status().await?;
    if status.is_exhausted() {
        return Err(clients::api::Error::RateLimited { reset: status.reset }.into());
    }
    tokio::time::timeout(context.timeout, metric.compute())
        .await
        .map_err(|_| Error::Timeout(context.timeout))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockRepoApi;
    use std::sync::atomic::Ordering;

    struct Fixed {
        context: MetricContext,
        value: f64,
    }

    #[async_trait]
    impl Metric for Fixed {
        fn kind(&self) -> MetricKind {
            MetricKind::License
        }

        fn context(&self) -> &MetricContext {
            &self.context
        }

        async fn compute(&self) -> Result<f64> {
            self.context.client.readme(self.context.owner(), self.context.repo()).await?;
            Ok(self.value)
        }
    }

    fn fixed(client: Arc<MockRepoApi>, value: f64) -> Fixed {
        let repository = Arc::new(RepositoryReference::from_github_url("https://github.com/a/b").unwrap());
        Fixed {
            context: MetricContext::new(client, repository, Duration::from_secs(10)),
            value,
        }
    }

    #[test]
    fn kind_names_test() {
        let names: Vec<String> = MetricKind::all().map(|kind| kind.to_string()).collect();
        assert_eq!(
            names,
            vec![
                "rampUp",
                "correctness",
                "busFactor",
                "responsiveMaintainer",
                "license",
                "dependencyPinning",
                "codeReviewFraction"
            ]
        );
        assert_eq!(MetricKind::BusFactor.latency_key(), "busFactorLatency");
        assert_eq!("license".parse::<MetricKind>().unwrap(), MetricKind::License);
    }

    #[test]
    fn outcome_scored_test() {
        assert_eq!(MetricOutcome::scored(0.25), MetricOutcome::Scored(0.25));
        assert_eq!(MetricOutcome::scored(1.5), MetricOutcome::Scored(1.0));
        assert_eq!(MetricOutcome::scored(-0.5), MetricOutcome::Scored(0.0));
        assert!(MetricOutcome::scored(f64::NAN).is_failed());
        assert!(MetricOutcome::scored(f64::INFINITY).is_failed());
        assert_eq!(MetricOutcome::failed("boom").projected(), -1.0);
    }

    #[tokio::test]
    async fn evaluate_scores() {
        let client = Arc::new(MockRepoApi::healthy());
        let result = fixed(client.clone(), 0.75).evaluate().await;
        assert_eq!(result.kind, MetricKind::License);
        assert_eq!(result.outcome, MetricOutcome::Scored(0.75));
        assert_eq!(client.data_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn evaluate_stops_on_exhausted_quota() {
        let client = Arc::new(MockRepoApi::exhausted());
        let result = fixed(client.clone(), 0.75).evaluate().await;
        assert!(result.outcome.is_failed());
        assert_eq!(result.outcome.projected(), -1.0);
        assert_eq!(client.status_calls.load(Ordering::SeqCst), 1);
        assert_eq!(client.data_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn evaluate_fails_on_non_finite_value() {
        let client = Arc::new(MockRepoApi::healthy());
        let result = fixed(client, f64::NAN).evaluate().await;
        assert!(result.outcome.is_failed());
    }
}
