// tests/common/mod.rs

//! Shared test utilities and helpers for integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use notices::resolver::{HttpFetcher, ResolverEndpoints};
use notices::{
    LicenseCache, LicensePipeline, ResolveContext, ResolverRegistry, Result, UrlResolver,
};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use url::Url;
use wiremock::MockServer;

/// URL resolver answering a fixed text for URLs on one host and path prefix
pub struct CountingResolver {
    host: String,
    path_prefix: String,
    text: Option<String>,
    delay: Duration,
    calls: AtomicUsize,
}

impl CountingResolver {
    pub fn new(host: &str, text: Option<&str>) -> Arc<Self> {
        Self::build(host, "/", text, Duration::ZERO)
    }

    pub fn with_prefix(host: &str, path_prefix: &str, text: &str) -> Arc<Self> {
        Self::build(host, path_prefix, Some(text), Duration::ZERO)
    }

    pub fn slow(host: &str, text: &str, delay: Duration) -> Arc<Self> {
        Self::build(host, "/", Some(text), delay)
    }

    fn build(host: &str, path_prefix: &str, text: Option<&str>, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            host: host.to_string(),
            path_prefix: path_prefix.to_string(),
            text: text.map(str::to_string),
            delay,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl UrlResolver for CountingResolver {
    fn name(&self) -> &str {
        "counting"
    }

    fn can_resolve(&self, url: &Url) -> bool {
        url.host_str() == Some(self.host.as_str()) && url.path().starts_with(&self.path_prefix)
    }

    async fn resolve(&self, _url: &Url, _ctx: &ResolveContext) -> Result<Option<String>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        Ok(self.text.clone())
    }
}

pub fn fetcher() -> HttpFetcher {
    HttpFetcher::with_timeout("notices-test", Duration::from_secs(5)).unwrap()
}

/// Pipeline over `registry` with a fresh cache and no token
pub fn pipeline(registry: ResolverRegistry) -> LicensePipeline {
    LicensePipeline::new(
        Arc::new(registry),
        fetcher(),
        Arc::new(LicenseCache::new()),
        ResolveContext::default(),
    )
}

/// All remote endpoints pointed at a mock server
pub fn mock_endpoints(server: &MockServer) -> ResolverEndpoints {
    let base = Url::parse(&server.uri()).unwrap();
    ResolverEndpoints {
        raw_content: base.clone(),
        github_api: base.clone(),
        spdx_api: base,
    }
}

/// Pipeline with the built-in resolvers talking to `server`
pub fn default_pipeline(server: &MockServer) -> LicensePipeline {
    pipeline(ResolverRegistry::with_defaults(fetcher(), &mock_endpoints(server)))
}

/// Create a NuGet global-packages layout for one package
///
/// Returns the package directory (`{root}/{id}/{version}`); the binary is
/// `lib/net8.0/{id}.dll` inside it.
pub fn package_layout(root: &Path, id: &str, version: &str) -> std::path::PathBuf {
    let package = root.join(id.to_lowercase()).join(version);
    let lib = package.join("lib").join("net8.0");
    std::fs::create_dir_all(&lib).unwrap();
    std::fs::write(lib.join(format!("{id}.dll")), b"MZ").unwrap();
    package
}
