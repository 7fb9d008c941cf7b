//! npm registry implementation of [`clients::api::PackageRegistry`].

use async_trait::async_trait;
use clients::api::{Error, Result};
use log::debug;
use reqwest::Client;
use reqwest::StatusCode;
use serde::Deserialize;

pub const DEFAULT_REGISTRY_URL: &str = "https://registry.npmjs.org";

pub struct NpmClient {
    client: Client,
    registry_url: String,
}

impl NpmClient {
    pub fn new<STR: AsRef<str>>(registry_url: STR) -> Result<Self> {
        let client = Client::builder().user_agent("net-score").build()?;
        Ok(NpmClient {
            client,
            registry_url: registry_url.as_ref().trim_end_matches('/').to_string(),
        })
    }
}

#[derive(Deserialize, Debug)]
struct PackageBody {
    repository: Option<RepositoryField>,
}

/// `repository` is either a shorthand string or a `{ type, url }` object.
#[derive(Deserialize, Debug)]
#[serde(untagged)]
enum RepositoryField {
    Shorthand(String),
    Object { url: Option<String> },
}

impl RepositoryField {
    fn into_url(self) -> Option<String> {
        match self {
            RepositoryField::Shorthand(url) => Some(url),
            RepositoryField::Object { url } => url,
        }
        .filter(|url| !url.trim().is_empty())
    }
}

/// Scoped packages keep their `@`, the separating slash must be escaped.
fn package_path(package: &str) -> String {
    package.replacen('/', "%2F", 1)
}

#[async_trait]
impl clients::api::PackageRegistry for NpmClient {
    async fn repository_url(&self, package: &str) -> Result<Option<String>> {
        let url = format!("{}/{}", self.registry_url, package_path(package));
        debug!("GET {}", url);
        let response = self.client.get(&url).send().await?;
        match response.status() {
            status if status.is_success() => {
                let body = response.json::<PackageBody>().await?;
                Ok(body.repository.and_then(RepositoryField::into_url))
            }
            StatusCode::NOT_FOUND => Err(Error::NotFound(format!("npm package {}", package))),
            status => Err(Error::Status {
                status: status.as_u16(),
                url,
            }),
        }
    }
}
