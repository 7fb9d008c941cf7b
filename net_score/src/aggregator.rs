use crate::error::Error;
use crate::metric::{MetricContext, MetricKind, MetricOutcome, MetricResult};
use crate::metrics::all_metrics;
use crate::policy::{EvaluationOptions, Policy};
use crate::report::NetScoreReport;
use crate::repository::RepositoryReference;
use clients::api::RepoApi;
use futures::{stream, StreamExt};
use log::{debug, error, info, warn};
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinHandle;

/// Scores repositories: every metric of a repository runs as its own task, repositories are
/// scored a few at a time.
pub struct NetScoreAggregator {
    client: Arc<dyn RepoApi>,
    policy: Arc<Policy>,
    options: EvaluationOptions,
}

impl NetScoreAggregator {
    pub fn new(client: Arc<dyn RepoApi>, policy: Policy, options: EvaluationOptions) -> Self {
        NetScoreAggregator {
            client,
            policy: Arc::new(policy),
            options,
        }
    }

    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    pub fn options(&self) -> &EvaluationOptions {
        &self.options
    }

    pub async fn evaluate(&self, repository: RepositoryReference) -> NetScoreReport {
        let repository = Arc::new(repository);
        let context = MetricContext::new(self.client.clone(), repository.clone(), self.options.metric_timeout);

        let started = Instant::now();
        let tasks: Vec<(MetricKind, JoinHandle<MetricResult>)> = all_metrics(&context, &self.policy, &self.options)
            .into_iter()
            .map(|metric| (metric.kind(), tokio::spawn(async move { metric.evaluate().await })))
            .collect();

        let mut results = Vec::with_capacity(tasks.len());
        for (kind, task) in tasks {
            let result = task.await.unwrap_or_else(|err| {
                error!("{} task of {} failed: {}", kind, repository, err);
                MetricResult::new(kind, MetricOutcome::failed(Error::Task(err)), started.elapsed())
            });
            results.push(result);
        }

        let report = NetScoreReport::aggregate(repository, results, &self.policy.weights);
        info!(
            "NetScore of {}: {:.3} in {:?}",
            report.repository(),
            report.net_score(),
            started.elapsed()
        );
        report
    }

    /// Scores `repositories` concurrently, reports come back in input order.
    pub async fn evaluate_batch(&self, repositories: Vec<RepositoryReference>) -> Vec<NetScoreReport> {
        self.check_quota(repositories.len()).await;
        stream::iter(repositories)
            .map(|repository| self.evaluate(repository))
            .buffered(self.options.max_parallel_repositories.max(1))
            .collect()
            .await
    }

    async fn check_quota(&self, repositories: usize) {
        let needed = repositories as u64 * u64::from(self.options.estimated_calls_per_repository);
        match self.client.rate_limit_status().await {
            Ok(status) if u64::from(status.remaining) < needed => warn!(
                "Rate limit may not suffice: {} requests left until {}, scoring {} repositories needs about {}",
                status.remaining,
                status.reset_time(),
                repositories,
                needed
            ),
            Ok(status) => debug!("{} of {} requests left", status.remaining, status.limit),
            Err(err) => warn!("Failed to fetch rate limit: {}", err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{date, MockRepoApi};
    use clients::api::{Commit, Contributor, Issue, IssueState, PullRequest};
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    fn reference(url: &str) -> RepositoryReference {
        RepositoryReference::from_github_url(url).unwrap()
    }

    fn populated() -> MockRepoApi {
        MockRepoApi {
            license: Some("MIT".to_string()),
            readme: Some("# Lib\n## Usage\n```js\nlib()\n```\n".to_string()),
            contributors: vec![Contributor::new("a", 5), Contributor::new("b", 5)],
            commits: vec![Commit::new("abc".to_string(), None, Some(chrono::Utc::now()))],
            pull_requests: vec![PullRequest::new(1, None)],
            issues: vec![Issue::new(
                1,
                IssueState::Closed,
                date("2023-01-01T00:00:00Z"),
                Some(date("2023-01-01T12:00:00Z")),
            )],
            ..MockRepoApi::healthy()
        }
        .with_file("package.json", r#"{ "dependencies": { "a": "1.2.3", "b": "^2.0.0", "c": "~3.1.0" } }"#)
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn evaluate_all_metrics() {
        let aggregator = NetScoreAggregator::new(
            Arc::new(populated()),
            Policy::default(),
            EvaluationOptions::default(),
        );
        let report = aggregator.evaluate(reference("https://github.com/a/b")).await;

        assert_eq!(report.results().len(), 7);
        assert!(report.results().iter().all(|result| !result.outcome.is_failed()));
        let pinning = report.result(MetricKind::DependencyPinning).unwrap().outcome.value().unwrap();
        assert!((pinning - 1.0 / 3.0).abs() < 1e-9);
        assert_eq!(report.result(MetricKind::BusFactor).unwrap().outcome.value(), Some(0.5));
        assert_eq!(report.result(MetricKind::License).unwrap().outcome.value(), Some(1.0));
        assert!(report.net_score() > 0.0 && report.net_score() <= 1.0);
    }

    #[tokio::test]
    async fn exhausted_quota_fails_every_metric_without_data_calls() {
        let client = Arc::new(MockRepoApi::exhausted());
        let aggregator = NetScoreAggregator::new(client.clone(), Policy::default(), EvaluationOptions::default());
        let report = aggregator.evaluate(reference("https://github.com/a/b")).await;

        assert!(report
            .results()
            .iter()
            .all(|result| result.outcome.projected() == -1.0));
        assert_eq!(report.net_score(), 0.0);
        assert_eq!(client.data_calls.load(Ordering::SeqCst), 0);
        assert_eq!(client.status_calls.load(Ordering::SeqCst), 7);
    }

    #[tokio::test]
    async fn panicking_metric_fails_alone() {
        let client = Arc::new(MockRepoApi {
            panic_on_contributors: true,
            ..populated()
        });
        let aggregator = NetScoreAggregator::new(client, Policy::default(), EvaluationOptions::default());
        let report = aggregator.evaluate(reference("https://github.com/a/b")).await;

        assert!(report.result(MetricKind::BusFactor).unwrap().outcome.is_failed());
        assert_eq!(report.results().iter().filter(|result| result.outcome.is_failed()).count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_metric_times_out() {
        let client = Arc::new(MockRepoApi {
            readme_delay: Some(Duration::from_secs(60)),
            ..populated()
        });
        let options = EvaluationOptions {
            metric_timeout: Duration::from_secs(1),
            ..EvaluationOptions::default()
        };
        let aggregator = NetScoreAggregator::new(client, Policy::default(), options);
        let report = aggregator.evaluate(reference("https://github.com/a/b")).await;

        assert!(report.result(MetricKind::RampUp).unwrap().outcome.is_failed());
        assert!(!report.result(MetricKind::BusFactor).unwrap().outcome.is_failed());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn batch_keeps_input_order() {
        let aggregator = NetScoreAggregator::new(
            Arc::new(populated()),
            Policy::default(),
            EvaluationOptions {
                max_parallel_repositories: 2,
                ..EvaluationOptions::default()
            },
        );
        let urls = [
            "https://github.com/a/one",
            "https://github.com/b/two",
            "https://github.com/c/three",
            "https://github.com/d/four",
        ];
        let reports = aggregator
            .evaluate_batch(urls.iter().map(|url| reference(url)).collect())
            .await;
        let names: Vec<String> = reports.iter().map(|report| report.repository().to_string()).collect();
        assert_eq!(names, vec!["a/one", "b/two", "c/three", "d/four"]);
        let scores: Vec<u64> = reports.iter().map(|report| report.net_score().to_bits()).collect();
        assert!(scores.windows(2).all(|pair| pair[0] == pair[1]));
    }
}
