use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Api(#[from] clients::api::Error),
    #[error("Invalid repository URL {url}: {reason}")]
    InvalidUrl { url: String, reason: &'static str },
    #[error("Unsupported URL {0}, expected a GitHub or npm package URL")]
    UnsupportedUrl(String),
    #[error("Package {0} does not declare a GitHub repository")]
    NoRepository(String),
    #[error("File {0} not found")]
    MissingFile(&'static str),
    #[error("Malformed manifest: {0}")]
    Manifest(String),
    #[error("Invalid policy: {0}")]
    Policy(String),
    #[error("Timed out after {0:?}")]
    Timeout(std::time::Duration),
    #[error("Metric task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    pub(crate) fn invalid_url(url: impl Into<String>, reason: &'static str) -> Self {
        Error::InvalidUrl { url: url.into(), reason }
    }

    /// Whether the hosting API refused the call for lack of quota.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Error::Api(err) if err.is_rate_limited())
    }
}


pub type Result<T> = std::result::Result<T, Error>;
