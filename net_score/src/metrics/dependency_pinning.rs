use super::MANIFEST_PATH;
use crate::error::{Error, Result};
use crate::metric::{Metric, MetricContext, MetricKind};
use async_trait::async_trait;
use derive_more::Constructor;
use serde_json::Value;

/// Fraction of `package.json` dependencies pinned to an exact version.
#[derive(Constructor)]
pub struct DependencyPinning {
    context: MetricContext,
}

#[async_trait]
impl Metric for DependencyPinning {
    fn kind(&self) -> MetricKind {
        MetricKind::DependencyPinning
    }

    fn context(&self) -> &MetricContext {
        &self.context
    }

    async fn compute(&self) -> Result<f64> {
        let manifest = self
            .context
            .client
            .file_content(self.context.owner(), self.context.repo(), MANIFEST_PATH)
            .await?
            .ok_or(Error::MissingFile(MANIFEST_PATH))?;
        pinned_fraction(&manifest)
    }
}

/// `1.0` when nothing is declared. Non-string or empty versions count as unpinned.
fn pinned_fraction(manifest: &str) -> Result<f64> {
    let manifest: Value = serde_json::from_str(manifest).map_err(|err| Error::Manifest(err.to_string()))?;
    let manifest = manifest
        .as_object()
        .ok_or_else(|| Error::Manifest("top level is not an object".to_string()))?;
    let dependencies = match manifest.get("dependencies") {
        None | Some(Value::Null) => return Ok(1.0),
        Some(Value::Object(dependencies)) => dependencies,
        Some(_) => return Err(Error::Manifest("dependencies is not an object".to_string())),
    };
    if dependencies.is_empty() {
        return Ok(1.0);
    }
    let pinned = dependencies
        .values()
        .filter(|version| version.as_str().map_or(false, is_pinned))
        .count();
    Ok(pinned as f64 / dependencies.len() as f64)
}

/// Caret and tilde ranges float, anything else names a fixed version.
fn is_pinned(version: &str) -> bool {
    let version = version.trim();
    !version.is_empty() && !version.starts_with(|c| c == '^' || c == '~')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metric::MetricOutcome;
    use crate::repository::RepositoryReference;
    use crate::testing::MockRepoApi;
    use std::sync::Arc;
    use std::time::Duration;

    fn metric(client: MockRepoApi) -> DependencyPinning {
        let repository = Arc::new(RepositoryReference::from_github_url("https://github.com/a/b").unwrap());
        DependencyPinning::new(MetricContext::new(Arc::new(client), repository, Duration::from_secs(10)))
    }

    #[test]
    fn one_of_three_pinned() {
        let manifest = r#"{ "dependencies": { "a": "1.2.3", "b": "^2.0.0", "c": "~3.1.0" } }"#;
        let fraction = pinned_fraction(manifest).unwrap();
        assert!((fraction - 1.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn no_dependencies_is_fully_pinned() {
        assert_eq!(pinned_fraction(r#"{ "name": "x" }"#).unwrap(), 1.0);
        assert_eq!(pinned_fraction(r#"{ "dependencies": {} }"#).unwrap(), 1.0);
        assert_eq!(pinned_fraction(r#"{ "dependencies": null }"#).unwrap(), 1.0);
    }

    #[test]
    fn odd_versions_are_unpinned() {
        let manifest = r#"{ "dependencies": { "a": "", "b": 3, "c": "2.0.0" } }"#;
        let fraction = pinned_fraction(manifest).unwrap();
        assert!((fraction - 1.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn malformed_manifest_is_an_error() {
        assert!(matches!(pinned_fraction("{ not json"), Err(Error::Manifest(_))));
        assert!(matches!(pinned_fraction("[]"), Err(Error::Manifest(_))));
        assert!(matches!(
            pinned_fraction(r#"{ "dependencies": ["a"] }"#),
            Err(Error::Manifest(_))
        ));
    }

    #[tokio::test]
    async fn missing_manifest_fails() {
        let result = metric(MockRepoApi::healthy()).evaluate().await;
        assert_eq!(result.outcome.projected(), -1.0);
    }

    #[tokio::test]
    async fn evaluates_manifest_from_repository() {
        let client = MockRepoApi::healthy().with_file(
            "package.json",
            r#"{ "dependencies": { "a": "1.0.0", "b": "^1.0.0" } }"#,
        );
        let result = metric(client).evaluate().await;
        assert_eq!(result.outcome, MetricOutcome::Scored(0.5));
    }
}
