//! Package quality metrics
//!
//! # Overview
//!
//! Before a package is ingested into a registry its source repository is scored on a handful of
//! independent signals: license compatibility, bus factor, maintainer responsiveness, correctness,
//! ramp-up (documentation quality), dependency pinning and code review coverage.
//! Each signal is normalized into `[0,1]` and measured for latency. A metric that cannot be computed
//! (exhausted API quota, missing data, timeout) reports `-1` instead of failing the whole run.
//! The weighted sum of the metrics is the NetScore. Packages with a NetScore above a threshold
//! (`0.5` by default) are fit for ingestion.
//!
//! Repositories are given either as GitHub URLs or as npm package URLs. The latter are resolved to
//! GitHub through the package's `repository` field, see [`UrlResolver`].

pub mod aggregator;
pub mod error;
pub mod metric;
pub mod metrics;
pub mod policy;
pub mod report;
pub mod repository;
pub mod resolver;

#[cfg(test)]
mod testing;

pub use aggregator::NetScoreAggregator;
pub use error::{Error, Result};
pub use metric::{Metric, MetricContext, MetricKind, MetricOutcome, MetricResult};
pub use policy::{EvaluationOptions, LicensePolicy, Policy, Weights};
pub use report::NetScoreReport;
pub use repository::RepositoryReference;
pub use resolver::UrlResolver;

/// NetScore a package must exceed to be ingested.
pub const DEFAULT_INGEST_THRESHOLD: f64 = 0.5;
