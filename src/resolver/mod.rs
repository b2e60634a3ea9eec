// src/resolver/mod.rs
//! Capability-typed license resolvers
//!
//! A resolver declares what kind of input it understands and how to turn it
//! into license text:
//!
//! - [`UrlResolver`]: license, project and repository URLs from a package
//!   manifest (GitHub raw content, GitHub repository license API, SPDX ids
//!   on opensource.org)
//! - [`VersionInfoResolver`]: binaries without a package manifest
//!
//! Resolvers are registered per [`UrlKind`] in a [`ResolverRegistry`] and
//! tried in registration order; the first non-empty answer wins. They never
//! retry: one failed attempt is a non-match.

pub mod github;
pub mod http;
pub mod local;
pub mod registry;
pub mod spdx;

pub use github::{GithubClient, GithubRawResolver, GithubRepositoryResolver};
pub use http::{HttpFetcher, HttpReply};
pub use local::LocalPackageResolver;
pub use registry::{ResolverEndpoints, ResolverRegistry};
pub use spdx::OpenSourceOrgResolver;

use crate::error::Result;
use crate::record::{PackageManifest, VersionInfo};
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Which manifest URL a resolver is being asked about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UrlKind {
    License,
    Project,
    Repository,
}

impl UrlKind {
    /// The manifest field holding this kind of URL
    pub fn of(self, manifest: &PackageManifest) -> Option<&str> {
        let url = match self {
            UrlKind::License => manifest.license_url.as_deref(),
            UrlKind::Project => manifest.project_url.as_deref(),
            UrlKind::Repository => manifest.repository_url.as_deref(),
        };
        url.map(str::trim).filter(|u| !u.is_empty())
    }
}

impl std::fmt::Display for UrlKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UrlKind::License => write!(f, "license URL"),
            UrlKind::Project => write!(f, "project URL"),
            UrlKind::Repository => write!(f, "repository URL"),
        }
    }
}

/// Per-run options handed to every resolver
#[derive(Debug, Clone, Default)]
pub struct ResolveContext {
    /// Bearer token for authenticated API calls (GitHub)
    pub token: Option<String>,
    /// Aborts in-flight requests when triggered
    pub cancel: CancellationToken,
}

impl ResolveContext {
    pub fn new(token: Option<String>, cancel: CancellationToken) -> Self {
        Self {
            token: token.filter(|t| !t.is_empty()),
            cancel,
        }
    }
}

/// Resolves license text from a URL
#[async_trait]
pub trait UrlResolver: Send + Sync {
    /// Name used in logs
    fn name(&self) -> &str;

    fn can_resolve(&self, url: &Url) -> bool;

    /// Fetch license text, `Ok(None)` when the source has none
    async fn resolve(&self, url: &Url, ctx: &ResolveContext) -> Result<Option<String>>;
}

/// Resolves license text from a binary's version metadata
#[async_trait]
pub trait VersionInfoResolver: Send + Sync {
    /// Name used in logs
    fn name(&self) -> &str;

    fn can_resolve(&self, info: &VersionInfo) -> bool;

    async fn resolve(&self, info: &VersionInfo, ctx: &ResolveContext) -> Result<Option<String>>;
}
