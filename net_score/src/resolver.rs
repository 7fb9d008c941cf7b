use crate::error::{Error, Result};
use crate::repository::RepositoryReference;
use clients::api::PackageRegistry;
use futures::{stream, StreamExt};
use log::{info, warn};
use std::sync::Arc;
use url::Url;

const MAX_PARALLEL_LOOKUPS: usize = 4;

/// Turns user supplied GitHub or npm URLs into [`RepositoryReference`]s.
pub struct UrlResolver {
    registry: Arc<dyn PackageRegistry>,
}

impl UrlResolver {
    pub fn new(registry: Arc<dyn PackageRegistry>) -> Self {
        UrlResolver { registry }
    }

    pub async fn resolve(&self, raw_url: &str) -> Result<RepositoryReference> {
        let raw_url = raw_url.trim();
        if raw_url.contains("github.com") {
            return RepositoryReference::from_github_url(raw_url);
        }
        if raw_url.contains("npmjs.com") || raw_url.contains("npmjs.org") {
            let package = package_name(raw_url)?;
            let repository = self
                .registry
                .repository_url(&package)
                .await?
                .ok_or_else(|| Error::NoRepository(package.clone()))?;
            let github_url = normalize_repository_url(&repository);
            info!("Found GitHub URL for {}: {}", raw_url, github_url);
            return RepositoryReference::parse(raw_url, &github_url);
        }
        Err(Error::UnsupportedUrl(raw_url.to_string()))
    }

    /// Resolves every URL, in input order. URLs that fail to resolve are logged and skipped.
    pub async fn resolve_all<STR: AsRef<str>>(&self, urls: &[STR]) -> Vec<RepositoryReference> {
        stream::iter(urls.iter().map(AsRef::as_ref).filter(|url| !url.trim().is_empty()))
            .map(|url| async move { (url, self.resolve(url).await) })
            .buffered(MAX_PARALLEL_LOOKUPS)
            .filter_map(|(url, resolved)| async move {
                resolved
                    .map_err(|err| warn!("Skipping {}: {}", url, err))
                    .ok()
            })
            .collect()
            .await
    }
}

/// Package name of an npm website or registry URL, scoped names included.
fn package_name(npm_url: &str) -> Result<String> {
    let url = Url::parse(npm_url).map_err(|_| Error::invalid_url(npm_url, "not a URL"))?;
    let decoded: Vec<String> = url
        .path_segments()
        .map(|segments| {
            segments
                .map(|segment| segment.replace("%40", "@").replace("%2F", "/").replace("%2f", "/"))
                .collect::<Vec<_>>()
                .join("/")
        })
        .unwrap_or_default()
        .split('/')
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
        .collect();
    let segments: Vec<&str> = decoded.iter().map(String::as_str).collect();
    match segments.as_slice() {
        ["package", scope, name, ..] if scope.starts_with('@') => Ok(format!("{}/{}", scope, name)),
        ["package", name, ..] => Ok(name.to_string()),
        [.., scope, name] if scope.starts_with('@') => Ok(format!("{}/{}", scope, name)),
        [.., name] => Ok(name.to_string()),
        [] => Err(Error::invalid_url(npm_url, "no package name in path")),
    }
}

/// Rewrites the URL forms found in `repository.url` into `https://github.com/<owner>/<repo>`.
pub fn normalize_repository_url(repository_url: &str) -> String {
    let mut url = repository_url.trim();
    url = url.strip_prefix("git+").unwrap_or(url);
    let url = url.split('#').next().unwrap_or(url);

    let normalized = if let Some(rest) = url.strip_prefix("github:") {
        format!("https://github.com/{}", rest)
    } else if let Some(rest) = url.strip_prefix("git@github.com:") {
        format!("https://github.com/{}", rest)
    } else if let Some(rest) = url.strip_prefix("ssh://git@github.com") {
        format!("https://github.com{}", rest.trim_start_matches(':'))
    } else if let Some(rest) = url.strip_prefix("git://") {
        format!("https://{}", rest)
    } else if let Some(rest) = url.strip_prefix("http://") {
        format!("https://{}", rest)
    } else if !url.contains(':') && url.matches('/').count() == 1 {
        // npm shorthand `owner/repo` defaults to GitHub
        format!("https://github.com/{}", url)
    } else {
        url.to_string()
    };

    normalized.trim_end_matches('/').trim_end_matches(".git").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;

    struct StaticRegistry(HashMap<&'static str, Option<&'static str>>);

    #[async_trait]
    impl PackageRegistry for StaticRegistry {
        async fn repository_url(&self, package: &str) -> clients::api::Result<Option<String>> {
            match self.0.get(package) {
                Some(url) => Ok(url.map(str::to_string)),
                None => Err(clients::api::Error::NotFound(package.to_string())),
            }
        }
    }

    fn resolver() -> UrlResolver {
        let registry = StaticRegistry(HashMap::from([
            ("express", Some("git+https://github.com/expressjs/express.git")),
            ("@babel/core", Some("https://github.com/babel/babel.git#main")),
            ("no-repo", None),
            ("gitlab-only", Some("https://gitlab.com/a/b.git")),
        ]));
        UrlResolver::new(Arc::new(registry))
    }

    #[test]
    fn normalize_variants() {
        for (raw, expected) in [
            ("git+https://github.com/a/b.git", "https://github.com/a/b"),
            ("git://github.com/a/b.git", "https://github.com/a/b"),
            ("ssh://git@github.com/a/b.git", "https://github.com/a/b"),
            ("git+ssh://git@github.com/a/b.git", "https://github.com/a/b"),
            ("git@github.com:a/b.git", "https://github.com/a/b"),
            ("github:a/b", "https://github.com/a/b"),
            ("a/b", "https://github.com/a/b"),
            ("http://github.com/a/b", "https://github.com/a/b"),
            ("https://github.com/a/b#readme", "https://github.com/a/b"),
        ] {
            assert_eq!(normalize_repository_url(raw), expected, "normalizing {}", raw);
        }
    }

    #[test]
    fn package_name_forms() {
        assert_eq!(package_name("https://www.npmjs.com/package/express").unwrap(), "express");
        assert_eq!(package_name("https://www.npmjs.com/package/@babel/core").unwrap(), "@babel/core");
        assert_eq!(package_name("https://www.npmjs.com/package/express/v/4.18.2").unwrap(), "express");
        assert_eq!(package_name("https://registry.npmjs.org/lodash").unwrap(), "lodash");
        assert_eq!(package_name("https://www.npmjs.com/package/%40babel/core").unwrap(), "@babel/core");
        assert_eq!(package_name("https://registry.npmjs.org/@babel%2fcore").unwrap(), "@babel/core");
        assert!(package_name("https://www.npmjs.com/").is_err());
    }

    #[tokio::test]
    async fn resolve_github_and_npm() {
        let resolver = resolver();
        let github = resolver.resolve("https://github.com/lodash/lodash").await.unwrap();
        assert_eq!((github.owner(), github.repo()), ("lodash", "lodash"));

        let npm = resolver.resolve("https://www.npmjs.com/package/express").await.unwrap();
        assert_eq!(npm.native_url(), "https://www.npmjs.com/package/express");
        assert_eq!(npm.external_url(), "https://github.com/expressjs/express");

        let scoped = resolver.resolve("https://www.npmjs.com/package/@babel/core").await.unwrap();
        assert_eq!((scoped.owner(), scoped.repo()), ("babel", "babel"));
    }

    #[tokio::test]
    async fn resolve_failures() {
        let resolver = resolver();
        assert!(matches!(
            resolver.resolve("https://www.npmjs.com/package/no-repo").await,
            Err(Error::NoRepository(_))
        ));
        assert!(matches!(
            resolver.resolve("https://www.npmjs.com/package/gitlab-only").await,
            Err(Error::InvalidUrl { .. })
        ));
        assert!(matches!(
            resolver.resolve("https://example.com/a/b").await,
            Err(Error::UnsupportedUrl(_))
        ));
        assert!(matches!(
            resolver.resolve("https://www.npmjs.com/package/unknown").await,
            Err(Error::Api(_))
        ));
    }

    #[tokio::test]
    async fn resolve_all_skips_failures_and_keeps_order() {
        let urls = [
            "https://www.npmjs.com/package/no-repo",
            "https://github.com/lodash/lodash",
            "",
            "not a url",
            "https://www.npmjs.com/package/express",
        ];
        let resolved = resolver().resolve_all(&urls).await;
        let names: Vec<String> = resolved.iter().map(ToString::to_string).collect();
        assert_eq!(names, vec!["lodash/lodash", "expressjs/express"]);
    }
}
