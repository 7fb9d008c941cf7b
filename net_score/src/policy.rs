use crate::error::{Error, Result};
use crate::metric::MetricKind;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

/// Weight of every metric in the NetScore. Each weight is in `[0,1]` and all of them sum to 1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawWeights")]
pub struct Weights {
    ramp_up: f64,
    correctness: f64,
    bus_factor: f64,
    responsive_maintainer: f64,
    license: f64,
    dependency_pinning: f64,
    code_review_fraction: f64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct RawWeights {
    #[serde(default)]
    ramp_up: f64,
    #[serde(default)]
    correctness: f64,
    #[serde(default)]
    bus_factor: f64,
    #[serde(default)]
    responsive_maintainer: f64,
    #[serde(default)]
    license: f64,
    #[serde(default)]
    dependency_pinning: f64,
    #[serde(default)]
    code_review_fraction: f64,
}

impl TryFrom<RawWeights> for Weights {
    type Error = Error;

    fn try_from(raw: RawWeights) -> Result<Self> {
        Weights {
            ramp_up: raw.ramp_up,
            correctness: raw.correctness,
            bus_factor: raw.bus_factor,
            responsive_maintainer: raw.responsive_maintainer,
            license: raw.license,
            dependency_pinning: raw.dependency_pinning,
            code_review_fraction: raw.code_review_fraction,
        }
        .validated()
    }
}

impl Weights {
    /// Builds weights from `(kind, weight)` pairs, kinds not listed weigh 0.
    pub fn from_pairs<I: IntoIterator<Item = (MetricKind, f64)>>(pairs: I) -> Result<Self> {
        let mut weights = Weights {
            ramp_up: 0.0,
            correctness: 0.0,
            bus_factor: 0.0,
            responsive_maintainer: 0.0,
            license: 0.0,
            dependency_pinning: 0.0,
            code_review_fraction: 0.0,
        };
        for (kind, weight) in pairs {
            *weights.slot(kind) = weight;
        }
        weights.validated()
    }

    pub fn weight(&self, kind: MetricKind) -> f64 {
        match kind {
            MetricKind::RampUp => self.ramp_up,
            MetricKind::Correctness => self.correctness,
            MetricKind::BusFactor => self.bus_factor,
            MetricKind::ResponsiveMaintainer => self.responsive_maintainer,
            MetricKind::License => self.license,
            MetricKind::DependencyPinning => self.dependency_pinning,
            MetricKind::CodeReviewFraction => self.code_review_fraction,
        }
    }

    fn slot(&mut self, kind: MetricKind) -> &mut f64 {
        match kind {
            MetricKind::RampUp => &mut self.ramp_up,
            MetricKind::Correctness => &mut self.correctness,
            MetricKind::BusFactor => &mut self.bus_factor,
            MetricKind::ResponsiveMaintainer => &mut self.responsive_maintainer,
            MetricKind::License => &mut self.license,
            MetricKind::DependencyPinning => &mut self.dependency_pinning,
            MetricKind::CodeReviewFraction => &mut self.code_review_fraction,
        }
    }

    fn validated(self) -> Result<Self> {
        let mut sum = 0.0;
        for kind in MetricKind::all() {
            let weight = self.weight(kind);
            if !(0.0..=1.0).contains(&weight) {
                return Err(Error::Policy(format!("weight of {} is {}, not in [0, 1]", kind, weight)));
            }
            sum += weight;
        }
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(Error::Policy(format!("weights sum to {}, expected 1", sum)));
        }
        Ok(self)
    }
}

impl Default for Weights {
    fn default() -> Self {
        Weights {
            ramp_up: 0.15,
            correctness: 0.15,
            bus_factor: 0.15,
            responsive_maintainer: 0.15,
            license: 0.15,
            dependency_pinning: 0.125,
            code_review_fraction: 0.125,
        }
    }
}

const DEFAULT_LICENSES: [&str; 23] = [
    "MIT",
    "Apache-2.0",
    "BSD-2-Clause",
    "BSD-3-Clause",
    "ISC",
    "0BSD",
    "Unlicense",
    "CC0-1.0",
    "Zlib",
    "MPL-2.0",
    "LGPL-2.1",
    "LGPL-2.1-only",
    "LGPL-2.1-or-later",
    "LGPL-3.0",
    "LGPL-3.0-only",
    "LGPL-3.0-or-later",
    "GPL-2.0",
    "GPL-2.0-only",
    "GPL-2.0-or-later",
    "GPL-3.0",
    "GPL-3.0-only",
    "GPL-3.0-or-later",
    "Artistic-2.0",
];

/// Spelled-out names under which allow-listed licenses show up in READMEs.
const LICENSE_ALIASES: [(&str, &str); 12] = [
    ("MIT", "mit license"),
    ("Apache-2.0", "apache license"),
    ("Apache-2.0", "apache 2.0"),
    ("BSD-2-Clause", "bsd 2-clause"),
    ("BSD-3-Clause", "bsd 3-clause"),
    ("ISC", "isc license"),
    ("Unlicense", "unlicense"),
    ("MPL-2.0", "mozilla public license"),
    ("LGPL-3.0", "gnu lesser general public license"),
    ("GPL-3.0", "gnu general public license"),
    ("Zlib", "zlib license"),
    ("CC0-1.0", "cc0"),
];

/// SPDX identifiers compatible with the registry's own license.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LicensePolicy {
    allowed: Vec<String>,
}

impl LicensePolicy {
    pub fn new<I, STR>(allowed: I) -> Self
    where
        I: IntoIterator<Item = STR>,
        STR: Into<String>,
    {
        LicensePolicy {
            allowed: allowed.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_compatible(&self, spdx_id: &str) -> bool {
        let spdx_id = spdx_id.trim();
        self.allowed.iter().any(|allowed| allowed.eq_ignore_ascii_case(spdx_id))
    }

    /// First allow-listed license named in `text`, by SPDX id or a common spelled-out name.
    pub fn find_in_text(&self, text: &str) -> Option<&str> {
        let text = text.to_lowercase();
        let by_id = self
            .allowed
            .iter()
            .find(|allowed| contains_word(&text, &allowed.to_lowercase()));
        let by_alias = || {
            LICENSE_ALIASES
                .iter()
                .filter(|(_, alias)| text.contains(alias))
                .find_map(|(id, _)| self.allowed.iter().find(|allowed| allowed.eq_ignore_ascii_case(id)))
        };
        by_id.or_else(by_alias).map(String::as_str)
    }
}

impl Default for LicensePolicy {
    fn default() -> Self {
        LicensePolicy::new(DEFAULT_LICENSES)
    }
}

/// `needle` occurs in `haystack` not glued to other alphanumerics, so `MIT` does not match `submit`.
fn contains_word(haystack: &str, needle: &str) -> bool {
    haystack.match_indices(needle).any(|(start, _)| {
        let before = haystack[..start].chars().next_back();
        let after = haystack[start + needle.len()..].chars().next();
        !before.map_or(false, char::is_alphanumeric) && !after.map_or(false, char::is_alphanumeric)
    })
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Policy {
    pub weights: Weights,
    pub licenses: LicensePolicy,
}

impl Policy {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|err| Error::Policy(err.to_string()))
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|err| Error::Policy(format!("cannot read {}: {}", path.display(), err)))?;
        Self::from_json(&json)
    }
}

/// Knobs of a scoring run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvaluationOptions {
    pub metric_timeout: Duration,
    pub max_parallel_repositories: usize,
    pub max_review_requests: usize,
    /// Rough quota cost of scoring one repository, used to warn before a batch.
    pub estimated_calls_per_repository: u32,
}

impl Default for EvaluationOptions {
    fn default() -> Self {
        EvaluationOptions {
            metric_timeout: Duration::from_secs(10),
            max_parallel_repositories: 4,
            max_review_requests: 10,
            estimated_calls_per_repository: 120,
        }
    }
}
