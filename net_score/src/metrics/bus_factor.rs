use super::PAGE_SIZE;
use crate::error::Result;
use crate::metric::{Metric, MetricContext, MetricKind};
use async_trait::async_trait;
use clients::api::Contributor;
use derive_more::Constructor;

const FIRST_PAGE_NUMBER: u32 = 1;

/// Share of commits not made by the single most active contributor.
#[derive(Constructor)]
pub struct BusFactor {
    context: MetricContext,
}

#[async_trait]
impl Metric for BusFactor {
    fn kind(&self) -> MetricKind {
        MetricKind::BusFactor
    }

    fn context(&self) -> &MetricContext {
        &self.context
    }

    async fn compute(&self) -> Result<f64> {
        let contributors = self
            .context
            .client
            .top_contributors(self.context.owner(), self.context.repo(), FIRST_PAGE_NUMBER, PAGE_SIZE)
            .await?;
        Ok(contributors_bus_factor(&contributors))
    }
}

/// Returns `1 - top / total` rounded to two decimal points, `0.0` without contributions.
///
/// # Arguments
/// * `contributors` - List of `Contributor`s sorted by contributions in desc order
fn contributors_bus_factor(contributors: &[Contributor]) -> f64 {
    let top_contributions = match contributors.iter().map(|contributor| contributor.contributions).max() {
        Some(top) => top,
        None => return 0.0,
    };
    let total_contributions: u64 = contributors
        .iter()
        .map(|contributor| u64::from(contributor.contributions))
        .sum();
    if total_contributions == 0 {
        return 0.0;
    }
    round_to_hundredths(1.0 - f64::from(top_contributions) / total_contributions as f64)
}

fn round_to_hundredths(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[test]
fn bus_factor_spread_test() {
    let contributors = vec![
        Contributor::new("a", 7),
        Contributor::new("b", 2),
        Contributor::new("c", 1),
    ];
    assert_eq!(contributors_bus_factor(&contributors), 0.3);
}

#[test]
fn bus_factor_rounding_test() {
    let contributors = vec![Contributor::new("a", 2), Contributor::new("b", 1)];
    assert_eq!(contributors_bus_factor(&contributors), 0.33);
}

#[test]
fn bus_factor_onedev_test() {
    let contributors = vec![Contributor::new("a", 7)];
    assert_eq!(contributors_bus_factor(&contributors), 0.0);
}

#[test]
fn bus_factor_empty_test() {
    assert_eq!(contributors_bus_factor(&[]), 0.0);
    assert_eq!(contributors_bus_factor(&[Contributor::new("a", 0)]), 0.0);
}
