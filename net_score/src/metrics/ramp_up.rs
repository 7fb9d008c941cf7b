use super::markdown_headings;
use crate::error::Result;
use crate::metric::{Metric, MetricContext, MetricKind};
use async_trait::async_trait;
use derive_more::Constructor;

/// README length at which the length signal saturates.
const FULL_LENGTH: f64 = 5000.0;
const FULL_HEADINGS: f64 = 5.0;
const USAGE_KEYWORDS: [&str; 5] = ["usage", "example", "getting started", "quick start", "install"];

/// How quickly a newcomer can start using the package, judged from its README.
#[derive(Constructor)]
pub struct RampUp {
    context: MetricContext,
}

#[async_trait]
impl Metric for RampUp {
    fn kind(&self) -> MetricKind {
        MetricKind::RampUp
    }

    fn context(&self) -> &MetricContext {
        &self.context
    }

    async fn compute(&self) -> Result<f64> {
        let readme = self
            .context
            .client
            .readme(self.context.owner(), self.context.repo())
            .await?;
        Ok(readme.as_deref().map_or(0.0, readme_score))
    }
}

fn readme_score(readme: &str) -> f64 {
    let length = (readme.chars().count() as f64 / FULL_LENGTH).min(1.0);
    let headings = markdown_headings(readme);
    let structure = (headings.len() as f64 / FULL_HEADINGS).min(1.0);
    let has_usage = headings.iter().any(|heading| {
        let heading = heading.to_lowercase();
        USAGE_KEYWORDS.iter().any(|keyword| heading.contains(keyword))
    }) || readme.contains("```");
    0.4 * length + 0.3 * structure + 0.3 * if has_usage { 1.0 } else { 0.0 }
}
