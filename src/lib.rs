mod args;
mod harness;

pub use args::{Args, Command};
pub use harness::{builtin_suites, Fixture, HarnessSummary, Suite, Target};

use clients::api::{PackageRegistry, RepoApi};
use github_client::GithubClientBuilder;
use log::{info, warn, LevelFilter};
use net_score::{EvaluationOptions, NetScoreAggregator, NetScoreReport, Policy, UrlResolver};
use npm_client::NpmClient;
use secrecy::SecretString;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Rate limit too low: {remaining} requests left, {required} required. Resets at {reset}")]
    LowRateLimit { remaining: u32, required: u32, reset: String },
    #[error("None of the given URLs resolves to a GitHub repository")]
    NoValidUrl,
    #[error("Cannot open log file {path}: {source}")]
    LogFile { path: PathBuf, source: std::io::Error },
    #[error(transparent)]
    Score(#[from] net_score::Error),
    #[error(transparent)]
    Api(#[from] clients::api::Error),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Routes `log` records to stderr, or appends them to `log_file`.
pub fn init_logging(level: LevelFilter, log_file: Option<&Path>) -> Result<()> {
    let mut builder = env_logger::Builder::new();
    builder.filter_level(level);
    if let Some(path) = log_file {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|source| Error::LogFile {
                path: path.to_path_buf(),
                source,
            })?;
        builder.target(env_logger::Target::Pipe(Box::new(file)));
    }
    builder.try_init().map_err(anyhow::Error::from)?;
    Ok(())
}

/// Resolves package URLs and scores their repositories.
pub struct NetScoreApp {
    client: Arc<dyn RepoApi>,
    resolver: UrlResolver,
    aggregator: NetScoreAggregator,
    ingest_threshold: f64,
    min_rate_limit: u32,
}

impl NetScoreApp {
    pub fn new(
        client: Arc<dyn RepoApi>,
        registry: Arc<dyn PackageRegistry>,
        policy: Policy,
        options: EvaluationOptions,
    ) -> Self {
        NetScoreApp {
            aggregator: NetScoreAggregator::new(client.clone(), policy, options),
            resolver: UrlResolver::new(registry),
            client,
            ingest_threshold: net_score::DEFAULT_INGEST_THRESHOLD,
            min_rate_limit: 300,
        }
    }

    pub fn try_from_args(args: &Args, github_token: Option<SecretString>) -> Result<Self> {
        let mut github = GithubClientBuilder::default()
            .with_github_url(&args.api_url)
            .with_max_concurrent_requests(args.max_concurrent_requests);
        if let Some(token) = github_token {
            github = github.try_with_token(token)?;
        }
        let registry = NpmClient::new(&args.registry_url)?;
        let policy = match &args.policy {
            Some(path) => Policy::from_file(path)?,
            None => Policy::default(),
        };
        let options = EvaluationOptions {
            metric_timeout: Duration::from_secs(args.metric_timeout),
            max_parallel_repositories: args.max_parallel_repos,
            max_review_requests: args.max_review_requests,
            ..EvaluationOptions::default()
        };

        Ok(NetScoreApp::new(Arc::new(github.build()?), Arc::new(registry), policy, options)
            .with_ingest_threshold(args.ingest_threshold)
            .with_min_rate_limit(args.min_rate_limit))
    }

    pub fn with_ingest_threshold(mut self, threshold: f64) -> Self {
        self.ingest_threshold = threshold;
        self
    }

    pub fn with_min_rate_limit(mut self, min_rate_limit: u32) -> Self {
        self.min_rate_limit = min_rate_limit;
        self
    }

    /// Scores every URL that resolves, in input order.
    pub async fn score<STR: AsRef<str>>(&self, urls: &[STR]) -> Result<Vec<NetScoreReport>> {
        let repositories = self.resolver.resolve_all(urls).await;
        if repositories.is_empty() {
            return Err(Error::NoValidUrl);
        }
        info!("Scoring {} of {} packages", repositories.len(), urls.len());

        let reports = self.aggregator.evaluate_batch(repositories).await;
        for report in &reports {
            let verdict = if report.is_ingestible(self.ingest_threshold) {
                "ingestible"
            } else {
                "not ingestible"
            };
            info!(
                "{} is {} (NetScore {:.3}, threshold {})",
                report.repository().native_url(),
                verdict,
                report.net_score(),
                self.ingest_threshold
            );
        }
        Ok(reports)
    }

    /// Runs `suites` once the API quota is known to cover them.
    pub async fn self_test(&self, suites: &[Suite]) -> Result<HarnessSummary> {
        let status = self.client.rate_limit_status().await?;
        if status.remaining < self.min_rate_limit {
            warn!(
                "Only {} API requests left until {}, the self test needs {}",
                status.remaining,
                status.reset_time(),
                self.min_rate_limit
            );
            return Err(Error::LowRateLimit {
                remaining: status.remaining,
                required: self.min_rate_limit,
                reset: status.reset_time(),
            });
        }
        Ok(harness::run_suites(self, suites).await)
    }
}

pub async fn run(mut args: Args) -> Result<()> {
    init_logging(args.log_level, args.log_file.as_deref())?;
    let github_token = args.github_token.take();
    let app = NetScoreApp::try_from_args(&args, github_token)?;

    match args.command {
        Some(Command::Test) => {
            let summary = app.self_test(&harness::builtin_suites()?).await?;
            print!("{}", summary);
        }
        None => {
            for report in app.score(&args.urls).await? {
                println!("{}", report);
            }
        }
    }
    Ok(())
}
