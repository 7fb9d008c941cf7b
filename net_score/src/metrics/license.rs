use super::heading_text;
use crate::error::Result;
use crate::metric::{Metric, MetricContext, MetricKind};
use crate::policy::LicensePolicy;
use async_trait::async_trait;
use derive_more::Constructor;
use log::debug;
use std::sync::Arc;

/// SPDX id GitHub reports for licenses it cannot identify.
const UNKNOWN_LICENSE: &str = "NOASSERTION";

/// `1.0` when the repository's license is on the allow-list, `0.0` otherwise.
#[derive(Constructor)]
pub struct License {
    context: MetricContext,
    licenses: Arc<LicensePolicy>,
}

#[async_trait]
impl Metric for License {
    fn kind(&self) -> MetricKind {
        MetricKind::License
    }

    fn context(&self) -> &MetricContext {
        &self.context
    }

    async fn compute(&self) -> Result<f64> {
        let (owner, repo) = (self.context.owner(), self.context.repo());
        let metadata = self.context.client.repository(owner, repo).await?;
        let detected = metadata
            .license
            .as_deref()
            .map(str::trim)
            .filter(|spdx_id| !spdx_id.is_empty() && !spdx_id.eq_ignore_ascii_case(UNKNOWN_LICENSE));
        if let Some(spdx_id) = detected {
            return Ok(score(self.licenses.is_compatible(spdx_id)));
        }

        debug!("No SPDX license detected for {}, scanning README", self.context.repository);
        let readme = self.context.client.readme(owner, repo).await?;
        let found = readme
            .as_deref()
            .and_then(license_section)
            .and_then(|section| self.licenses.find_in_text(&section).map(str::to_string));
        Ok(score(found.is_some()))
    }
}

fn score(compatible: bool) -> f64 {
    if compatible {
        1.0
    } else {
        0.0
    }
}

/// Body of the first `License`/`Licence` section of a markdown README.
fn license_section(readme: &str) -> Option<String> {
    let mut lines = readme.lines().skip_while(|line| {
        !heading_text(line).map_or(false, |heading| heading.to_lowercase().contains("licen"))
    });
    lines.next()?;
    let section: Vec<&str> = lines.take_while(|line| heading_text(line).is_none()).collect();
    Some(section.join("\n"))
}
