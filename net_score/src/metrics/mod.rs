//! The seven repository metrics. Each one is a [`Metric`] built around a shared [`MetricContext`].

mod bus_factor;
mod code_review;
mod correctness;
mod dependency_pinning;
mod license;
mod ramp_up;
mod responsive_maintainer;

pub use bus_factor::BusFactor;
pub use code_review::CodeReviewFraction;
pub use correctness::Correctness;
pub use dependency_pinning::DependencyPinning;
pub use license::License;
pub use ramp_up::RampUp;
pub use responsive_maintainer::ResponsiveMaintainer;

use crate::metric::{Metric, MetricContext};
use crate::policy::{EvaluationOptions, Policy};
use std::sync::Arc;

/// Page size used for every list endpoint.
const PAGE_SIZE: u32 = 100;

const MANIFEST_PATH: &str = "package.json";

/// One metric of each kind, in aggregation order.
pub fn all_metrics(context: &MetricContext, policy: &Policy, options: &EvaluationOptions) -> Vec<Box<dyn Metric>> {
    vec![
        Box::new(RampUp::new(context.clone())),
        Box::new(Correctness::new(context.clone())),
        Box::new(BusFactor::new(context.clone())),
        Box::new(ResponsiveMaintainer::new(context.clone())),
        Box::new(License::new(context.clone(), Arc::new(policy.licenses.clone()))),
        Box::new(DependencyPinning::new(context.clone())),
        Box::new(CodeReviewFraction::new(context.clone(), options.max_review_requests)),
    ]
}

/// Text of an ATX markdown heading (`## Usage`), `None` for any other line.
fn heading_text(line: &str) -> Option<&str> {
    let line = line.trim_start();
    let text = line.trim_start_matches('#');
    let level = line.len() - text.len();
    if (1..=6).contains(&level) && (text.is_empty() || text.starts_with(char::is_whitespace)) {
        Some(text.trim().trim_end_matches('#').trim())
    } else {
        None
    }
}

/// Headings of a markdown document, ignoring `#` lines inside fenced code blocks.
fn markdown_headings(markdown: &str) -> Vec<&str> {
    let mut in_fence = false;
    markdown
        .lines()
        .filter_map(|line| {
            if line.trim_start().starts_with("```") {
                in_fence = !in_fence;
                return None;
            }
            if in_fence {
                None
            } else {
                heading_text(line)
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metric::MetricKind;
    use crate::repository::RepositoryReference;
    use crate::testing::MockRepoApi;
    use std::time::Duration;

    #[test]
    fn all_metrics_in_kind_order() {
        let repository = Arc::new(RepositoryReference::from_github_url("https://github.com/a/b").unwrap());
        let context = MetricContext::new(Arc::new(MockRepoApi::healthy()), repository, Duration::from_secs(1));
        let kinds: Vec<MetricKind> = all_metrics(&context, &Policy::default(), &EvaluationOptions::default())
            .iter()
            .map(|metric| metric.kind())
            .collect();
        assert_eq!(kinds, MetricKind::all().collect::<Vec<_>>());
    }

    #[test]
    fn heading_text_test() {
        assert_eq!(heading_text("## Usage"), Some("Usage"));
        assert_eq!(heading_text("# Title #"), Some("Title"));
        assert_eq!(heading_text("#hashtag"), None);
        assert_eq!(heading_text("####### too deep"), None);
        assert_eq!(heading_text("plain text"), None);
    }

    #[test]
    fn headings_skip_code_fences() {
        let markdown = "# Title\n```sh\n# not a heading\n```\n## Install\n";
        assert_eq!(markdown_headings(markdown), vec!["Title", "Install"]);
    }
}
