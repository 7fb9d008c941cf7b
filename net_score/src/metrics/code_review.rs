use super::PAGE_SIZE;
use crate::error::Result;
use crate::metric::{Metric, MetricContext, MetricKind};
use async_trait::async_trait;
use clients::api::StateFilter;
use futures::{stream, StreamExt, TryStreamExt};

/// Fraction of recently merged pull requests that received at least one review.
pub struct CodeReviewFraction {
    context: MetricContext,
    max_review_requests: usize,
}

impl CodeReviewFraction {
    pub fn new(context: MetricContext, max_review_requests: usize) -> Self {
        CodeReviewFraction {
            context,
            max_review_requests: max_review_requests.max(1),
        }
    }
}

#[async_trait]
impl Metric for CodeReviewFraction {
    fn kind(&self) -> MetricKind {
        MetricKind::CodeReviewFraction
    }

    fn context(&self) -> &MetricContext {
        &self.context
    }

    async fn compute(&self) -> Result<f64> {
        let client = &self.context.client;
        let (owner, repo) = (self.context.owner(), self.context.repo());
        let merged: Vec<u64> = client
            .pull_requests(owner, repo, StateFilter::Closed, PAGE_SIZE)
            .await?
            .into_iter()
            .filter(|pull_request| pull_request.is_merged())
            .map(|pull_request| pull_request.number)
            .collect();
        if merged.is_empty() {
            return Ok(1.0);
        }

        let reviewed = stream::iter(merged.iter().copied())
            .map(|number| client.reviews(owner, repo, number))
            .buffered(self.max_review_requests)
            .try_fold(0usize, |reviewed, reviews| async move {
                Ok(reviewed + usize::from(!reviews.is_empty()))
            })
            .await?;
        Ok(reviewed as f64 / merged.len() as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metric::MetricOutcome;
    use crate::repository::RepositoryReference;
    use crate::testing::{date, MockRepoApi};
    use clients::api::{PullRequest, Review};
    use std::collections::HashMap;
    use std::sync::atomic::Ordering;
    use std::sync::Arc;
    use std::time::Duration;

    fn metric(client: Arc<MockRepoApi>) -> CodeReviewFraction {
        let repository = Arc::new(RepositoryReference::from_github_url("https://github.com/a/b").unwrap());
        CodeReviewFraction::new(MetricContext::new(client, repository, Duration::from_secs(10)), 2)
    }

    #[tokio::test]
    async fn reviewed_share_of_merged() {
        let merged_at = Some(date("2023-05-01T00:00:00Z"));
        let client = Arc::new(MockRepoApi {
            pull_requests: vec![
                PullRequest::new(1, merged_at),
                PullRequest::new(2, merged_at),
                PullRequest::new(3, None),
                PullRequest::new(4, merged_at),
                PullRequest::new(5, merged_at),
            ],
            reviews: HashMap::from([
                (1, vec![Review::new(Some("alice".to_string()), "APPROVED".to_string())]),
                (4, vec![Review::new(None, "COMMENTED".to_string())]),
            ]),
            ..MockRepoApi::healthy()
        });
        let result = metric(client.clone()).evaluate().await;
        assert_eq!(result.outcome, MetricOutcome::Scored(0.5));
        // one pull request listing plus a review listing per merged pull request
        assert_eq!(client.data_calls.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn nothing_merged_scores_one() {
        let client = Arc::new(MockRepoApi {
            pull_requests: vec![PullRequest::new(3, None)],
            ..MockRepoApi::healthy()
        });
        assert_eq!(metric(client).evaluate().await.outcome, MetricOutcome::Scored(1.0));
    }
}
