// src/resolver/registry.rs
//! Resolver registry
//!
//! Ordered resolver lists per URL kind plus one list for version metadata.
//! The composition root decides what goes in; the pipeline only reads.

use super::github::{GithubClient, GithubRawResolver, GithubRepositoryResolver};
use super::http::HttpFetcher;
use super::local::LocalPackageResolver;
use super::spdx::OpenSourceOrgResolver;
use super::{UrlKind, UrlResolver, VersionInfoResolver};
use std::sync::Arc;
use url::Url;

/// Remote base URLs used by the default resolvers
#[derive(Debug, Clone)]
pub struct ResolverEndpoints {
    pub raw_content: Url,
    pub github_api: Url,
    pub spdx_api: Url,
}

#[derive(Default)]
pub struct ResolverRegistry {
    license: Vec<Arc<dyn UrlResolver>>,
    project: Vec<Arc<dyn UrlResolver>>,
    repository: Vec<Arc<dyn UrlResolver>>,
    version_info: Vec<Arc<dyn VersionInfoResolver>>,
}

impl ResolverRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in resolvers
    ///
    /// License URLs try the raw-content rewrite before the SPDX lookup.
    /// Project and repository URLs ask the repository license API first,
    /// since those usually point at a repository root rather than a file.
    pub fn with_defaults(http: HttpFetcher, endpoints: &ResolverEndpoints) -> Self {
        let github = Arc::new(GithubClient::new(
            http.clone(),
            endpoints.raw_content.clone(),
            endpoints.github_api.clone(),
        ));
        let raw: Arc<dyn UrlResolver> = Arc::new(GithubRawResolver::new(Arc::clone(&github)));
        let repository: Arc<dyn UrlResolver> = Arc::new(GithubRepositoryResolver::new(github));
        let spdx: Arc<dyn UrlResolver> =
            Arc::new(OpenSourceOrgResolver::new(http, endpoints.spdx_api.clone()));

        let mut registry = Self::new();
        registry.register_url(UrlKind::License, Arc::clone(&raw));
        registry.register_url(UrlKind::License, spdx);
        for kind in [UrlKind::Project, UrlKind::Repository] {
            registry.register_url(kind, Arc::clone(&repository));
            registry.register_url(kind, Arc::clone(&raw));
        }
        registry.register_version_info(Arc::new(LocalPackageResolver::new()));
        registry
    }

    /// Append a URL resolver for `kind`
    pub fn register_url(&mut self, kind: UrlKind, resolver: Arc<dyn UrlResolver>) {
        self.list_mut(kind).push(resolver);
    }

    pub fn register_version_info(&mut self, resolver: Arc<dyn VersionInfoResolver>) {
        self.version_info.push(resolver);
    }

    /// URL resolvers for `kind`, in registration order
    pub fn url_resolvers(&self, kind: UrlKind) -> &[Arc<dyn UrlResolver>] {
        match kind {
            UrlKind::License => &self.license,
            UrlKind::Project => &self.project,
            UrlKind::Repository => &self.repository,
        }
    }

    pub fn version_info_resolvers(&self) -> &[Arc<dyn VersionInfoResolver>] {
        &self.version_info
    }

    fn list_mut(&mut self, kind: UrlKind) -> &mut Vec<Arc<dyn UrlResolver>> {
        match kind {
            UrlKind::License => &mut self.license,
            UrlKind::Project => &mut self.project,
            UrlKind::Repository => &mut self.repository,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoints() -> ResolverEndpoints {
        ResolverEndpoints {
            raw_content: Url::parse("https://raw.githubusercontent.com").unwrap(),
            github_api: Url::parse("https://api.github.com").unwrap(),
            spdx_api: Url::parse("https://api.github.com").unwrap(),
        }
    }

    fn names(list: &[Arc<dyn UrlResolver>]) -> Vec<&str> {
        list.iter().map(|r| r.name()).collect()
    }

    #[test]
    fn test_default_order() {
        let registry =
            ResolverRegistry::with_defaults(HttpFetcher::new("notices-test").unwrap(), &endpoints());

        assert_eq!(
            names(registry.url_resolvers(UrlKind::License)),
            ["github-raw", "opensource-org"]
        );
        assert_eq!(
            names(registry.url_resolvers(UrlKind::Project)),
            ["github-repository", "github-raw"]
        );
        assert_eq!(
            names(registry.url_resolvers(UrlKind::Repository)),
            ["github-repository", "github-raw"]
        );
        assert_eq!(registry.version_info_resolvers().len(), 1);
        assert_eq!(registry.version_info_resolvers()[0].name(), "local-package");
    }

    #[test]
    fn test_empty_registry() {
        let registry = ResolverRegistry::new();
        assert!(registry.url_resolvers(UrlKind::License).is_empty());
        assert!(registry.version_info_resolvers().is_empty());
    }
}
