use super::{MANIFEST_PATH, PAGE_SIZE};
use crate::error::Result;
use crate::metric::{Metric, MetricContext, MetricKind};
use async_trait::async_trait;
use clients::api::{DirEntry, EntryKind, Issue, IssueState, StateFilter};
use derive_more::Constructor;
use serde_json::Value;

const TEST_DIRECTORIES: [&str; 5] = ["test", "tests", "__tests__", "spec", "specs"];
const CI_CONFIGS: [&str; 2] = [".travis.yml", ".circleci"];
const WORKFLOWS_PATH: &str = ".github/workflows";
/// `npm init` default for `scripts.test`.
const PLACEHOLDER_TEST_SCRIPT: &str = "no test specified";

const TESTS_WEIGHT: f64 = 0.4;
const CI_WEIGHT: f64 = 0.3;
const CLOSURE_WEIGHT: f64 = 0.3;

/// Signals that the code is tested and that reported problems get fixed.
#[derive(Constructor)]
pub struct Correctness {
    context: MetricContext,
}

#[async_trait]
impl Metric for Correctness {
    fn kind(&self) -> MetricKind {
        MetricKind::Correctness
    }

    fn context(&self) -> &MetricContext {
        &self.context
    }

    async fn compute(&self) -> Result<f64> {
        let client = &self.context.client;
        let (owner, repo) = (self.context.owner(), self.context.repo());
        let (root, workflows, manifest, issues) = tokio::try_join!(
            client.directory(owner, repo, ""),
            client.directory(owner, repo, WORKFLOWS_PATH),
            client.file_content(owner, repo, MANIFEST_PATH),
            client.issues(owner, repo, StateFilter::All, PAGE_SIZE),
        )?;

        let root = root.unwrap_or_default();
        let has_tests = has_test_directory(&root) || manifest.as_deref().map_or(false, declares_test_script);
        let has_ci = workflows.map_or(false, |workflows| !workflows.is_empty()) || has_ci_config(&root);
        Ok(correctness_score(has_tests, has_ci, closure_ratio(&issues)))
    }
}

fn correctness_score(has_tests: bool, has_ci: bool, closure_ratio: f64) -> f64 {
    TESTS_WEIGHT * flag(has_tests) + CI_WEIGHT * flag(has_ci) + CLOSURE_WEIGHT * closure_ratio
}

fn flag(value: bool) -> f64 {
    if value {
        1.0
    } else {
        0.0
    }
}

fn has_test_directory(root: &[DirEntry]) -> bool {
    root.iter()
        .any(|entry| entry.kind == EntryKind::Dir && TEST_DIRECTORIES.contains(&entry.name.as_str()))
}

fn has_ci_config(root: &[DirEntry]) -> bool {
    root.iter().any(|entry| CI_CONFIGS.contains(&entry.name.as_str()))
}

fn declares_test_script(manifest: &str) -> bool {
    serde_json::from_str::<Value>(manifest)
        .ok()
        .as_ref()
        .and_then(|manifest| manifest.pointer("/scripts/test"))
        .and_then(Value::as_str)
        .map_or(false, |script| {
            !script.trim().is_empty() && !script.contains(PLACEHOLDER_TEST_SCRIPT)
        })
}

/// Closed share of the sampled issues, `1.0` when there are none.
fn closure_ratio(issues: &[Issue]) -> f64 {
    if issues.is_empty() {
        return 1.0;
    }
    let closed = issues.iter().filter(|issue| issue.state == IssueState::Closed).count();
    closed as f64 / issues.len() as f64
}
