use clap::{Parser, Subcommand};
use github_client::DEFAULT_GITHUB_URL;
use log::LevelFilter;
use npm_client::DEFAULT_REGISTRY_URL;
use secrecy::SecretString;
use std::path::PathBuf;
use std::{fmt::Display, str::FromStr};

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    #[clap(subcommand)]
    pub command: Option<Command>,

    /// GitHub repository or npm package URLs
    pub urls: Vec<String>,

    /// GitHub OAuth access token
    #[clap(long, env = "GITHUB_TOKEN")]
    pub github_token: Option<SecretString>,

    /// Repository API URL
    #[clap(long, env, default_value = DEFAULT_GITHUB_URL)]
    pub api_url: String,

    /// npm registry URL
    #[clap(long, env, default_value = DEFAULT_REGISTRY_URL)]
    pub registry_url: String,

    /// 0 (errors only), 1 (info), 2 (debug) or a level name
    #[clap(long, env = "LOG_LEVEL", default_value = "0", parse(try_from_str=parse_log_level))]
    pub log_level: LevelFilter,

    /// File logs are appended to, stderr if not set
    #[clap(long, env = "LOG_FILE")]
    pub log_file: Option<PathBuf>,

    /// JSON file with metric weights and the license allow-list
    #[clap(long, env)]
    pub policy: Option<PathBuf>,

    /// Seconds a single metric may take
    #[clap(long, env, default_value_t = 10, parse(try_from_str=metric_timeout_in_range))]
    pub metric_timeout: u64,

    /// Maximal repositories scored in parallel
    #[clap(long, env, default_value_t = 4, parse(try_from_str=max_parallel_repos_in_range))]
    pub max_parallel_repos: usize,

    /// Maximal parallel pull request review requests of a repository
    #[clap(long, env, default_value_t = 10, parse(try_from_str=max_review_requests_in_range))]
    pub max_review_requests: usize,

    /// Maximal in-flight API requests
    #[clap(long, env, default_value_t = 8, parse(try_from_str=max_concurrent_requests_in_range))]
    pub max_concurrent_requests: usize,

    /// Remaining API requests required to run the self test
    #[clap(long, env, default_value_t = 300)]
    pub min_rate_limit: u32,

    /// NetScore a package must exceed to be ingested
    #[clap(long, env, default_value_t = net_score::DEFAULT_INGEST_THRESHOLD, parse(try_from_str=threshold_in_range))]
    pub ingest_threshold: f64,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// Run the built-in metric fixtures against the live API
    Test,
}

fn parse_log_level(value: &str) -> clap::Result<LevelFilter, String> {
    match value.trim() {
        "0" => Ok(LevelFilter::Error),
        "1" => Ok(LevelFilter::Info),
        "2" => Ok(LevelFilter::Debug),
        name => LevelFilter::from_str(name).map_err(|_| format!("Unknown log level {}.", name)),
    }
}

fn threshold_in_range(value: &str) -> clap::Result<f64, String> {
    number_in_range(value, 0.0, 1.0, "ingest_threshold".to_string())
}

fn metric_timeout_in_range(value: &str) -> clap::Result<u64, String> {
    number_in_range(value, 1, 3600, "metric_timeout".to_string())
}

fn max_parallel_repos_in_range(value: &str) -> clap::Result<usize, String> {
    number_in_range(value, 1, 64, "max_parallel_repos".to_string())
}

fn max_review_requests_in_range(value: &str) -> clap::Result<usize, String> {
    number_in_range(value, 1, 100, "max_review_requests".to_string())
}

fn max_concurrent_requests_in_range(value: &str) -> clap::Result<usize, String> {
    number_in_range(value, 1, 256, "max_concurrent_requests".to_string())
}

fn number_in_range<T>(value: &str, min: T, max: T, name: String) -> clap::Result<T, String>
where
    T: FromStr + PartialOrd + Display,
    <T as FromStr>::Err: Display,
{
    value.parse::<T>().map_err(|err| format!("{}", err)).and_then(|value| {
        if value < min || value > max {
            return Err(format!("{} is not in range {} .. {}.", name, min, max));
        }
        Ok(value)
    })
}
