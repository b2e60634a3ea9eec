// src/resolver/github.rs
//! GitHub license resolvers
//!
//! Both resolvers match `github.com` URLs and share one [`GithubClient`]:
//!
//! - [`GithubRawResolver`] rewrites a blob URL to the raw-content host and
//!   accepts the answer only if it is `text/plain`
//! - [`GithubRepositoryResolver`] asks the repository API for the detected
//!   license file (`GET /repos/{owner}/{repo}/license`)

use super::http::{HttpFetcher, rebase};
use super::{ResolveContext, UrlResolver};
use crate::error::Result;
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;
use url::Url;

pub const GITHUB_HOST: &str = "github.com";
pub const DEFAULT_RAW_CONTENT_URL: &str = "https://raw.githubusercontent.com";
pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// Body of `GET /repos/{owner}/{repo}/license`
#[derive(Debug, Deserialize)]
struct RepositoryLicense {
    encoding: Option<String>,
    content: Option<String>,
}

impl RepositoryLicense {
    fn into_text(self) -> Result<Option<String>> {
        let Some(content) = self.content else {
            return Ok(None);
        };
        if self.encoding.as_deref() != Some("base64") {
            return Ok(Some(content));
        }
        // The API wraps base64 at 60 columns
        let compact: String = content.chars().filter(|c| !c.is_ascii_whitespace()).collect();
        let bytes = STANDARD.decode(compact)?;
        Ok(Some(String::from_utf8(bytes)?))
    }
}

pub fn is_github_url(url: &Url) -> bool {
    url.host_str() == Some(GITHUB_HOST)
}

/// Map a github.com blob URL onto the raw-content host
///
/// `https://github.com/org/repo/blob/main/LICENSE` becomes
/// `{raw_base}/org/repo/main/LICENSE`.
pub fn raw_content_url(url: &Url, raw_base: &Url) -> Url {
    let mut segments: Vec<&str> = url
        .path_segments()
        .map(|s| s.filter(|seg| !seg.is_empty()).collect())
        .unwrap_or_default();
    if let Some(blob) = segments.iter().position(|seg| *seg == "blob") {
        segments.remove(blob);
    }

    let mut raw = rebase(raw_base, &segments.join("/"));
    raw.set_query(url.query());
    raw
}

/// `https://github.com/org/repo.git` -> `("org", "repo")`
pub fn repository_coordinates(url: &Url) -> Option<(String, String)> {
    let mut segments = url.path_segments()?.filter(|seg| !seg.is_empty());
    let owner = segments.next()?;
    let repo = segments.next()?;
    let repo = repo.strip_suffix(".git").unwrap_or(repo);
    if repo.is_empty() {
        return None;
    }
    Some((owner.to_string(), repo.to_string()))
}

/// Fetch logic shared by the GitHub resolvers
pub struct GithubClient {
    http: HttpFetcher,
    raw_base: Url,
    api_base: Url,
}

impl GithubClient {
    pub fn new(http: HttpFetcher, raw_base: Url, api_base: Url) -> Self {
        Self {
            http,
            raw_base,
            api_base,
        }
    }

    /// Fetch a file through the raw-content host
    pub async fn fetch_raw(&self, url: &Url, ctx: &ResolveContext) -> Result<Option<String>> {
        let raw = raw_content_url(url, &self.raw_base);
        let reply = self.http.get_authorized(&raw, ctx).await?;
        if !reply.is_success() || !reply.is_plain_text() {
            debug!(
                "Raw content {} not usable (HTTP {}, {:?})",
                raw, reply.status, reply.media_type
            );
            return Ok(None);
        }
        Ok(Some(reply.body))
    }

    /// Fetch the license GitHub detected for a repository
    pub async fn fetch_repository_license(
        &self,
        url: &Url,
        ctx: &ResolveContext,
    ) -> Result<Option<String>> {
        let Some((owner, repo)) = repository_coordinates(url) else {
            return Ok(None);
        };
        let api = rebase(&self.api_base, &format!("repos/{owner}/{repo}/license"));
        let reply = self.http.get_authorized(&api, ctx).await?;
        if !reply.is_success() {
            debug!("Repository license API {} returned HTTP {}", api, reply.status);
            return Ok(None);
        }
        let license: RepositoryLicense = serde_json::from_str(&reply.body)?;
        license.into_text()
    }
}

/// License/project/repository URL resolver backed by raw.githubusercontent.com
pub struct GithubRawResolver {
    client: Arc<GithubClient>,
}

impl GithubRawResolver {
    pub fn new(client: Arc<GithubClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl UrlResolver for GithubRawResolver {
    fn name(&self) -> &str {
        "github-raw"
    }

    fn can_resolve(&self, url: &Url) -> bool {
        is_github_url(url)
    }

    async fn resolve(&self, url: &Url, ctx: &ResolveContext) -> Result<Option<String>> {
        self.client.fetch_raw(url, ctx).await
    }
}

/// Project/repository URL resolver backed by the repository license API
pub struct GithubRepositoryResolver {
    client: Arc<GithubClient>,
}

impl GithubRepositoryResolver {
    pub fn new(client: Arc<GithubClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl UrlResolver for GithubRepositoryResolver {
    fn name(&self) -> &str {
        "github-repository"
    }

    fn can_resolve(&self, url: &Url) -> bool {
        is_github_url(url)
    }

    async fn resolve(&self, url: &Url, ctx: &ResolveContext) -> Result<Option<String>> {
        self.client.fetch_repository_license(url, ctx).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> Arc<GithubClient> {
        let base = Url::parse(&server.uri()).unwrap();
        Arc::new(GithubClient::new(
            HttpFetcher::new("notices-test").unwrap(),
            base.clone(),
            base,
        ))
    }

    #[test]
    fn test_raw_content_rewrite() {
        let url = Url::parse("https://github.com/org/repo/blob/main/LICENSE").unwrap();
        let raw_base = Url::parse(DEFAULT_RAW_CONTENT_URL).unwrap();
        assert_eq!(
            raw_content_url(&url, &raw_base).as_str(),
            "https://raw.githubusercontent.com/org/repo/main/LICENSE"
        );
    }

    #[test]
    fn test_repository_coordinates() {
        let url = Url::parse("https://github.com/serilog/serilog.git").unwrap();
        assert_eq!(
            repository_coordinates(&url),
            Some(("serilog".to_string(), "serilog".to_string()))
        );

        let url = Url::parse("https://github.com/App-vNext/Polly/tree/main/").unwrap();
        assert_eq!(
            repository_coordinates(&url),
            Some(("App-vNext".to_string(), "Polly".to_string()))
        );

        let url = Url::parse("https://github.com/dotnet").unwrap();
        assert_eq!(repository_coordinates(&url), None);
    }

    #[test]
    fn test_only_github_host_matches() {
        let client = Arc::new(GithubClient::new(
            HttpFetcher::new("notices-test").unwrap(),
            Url::parse(DEFAULT_RAW_CONTENT_URL).unwrap(),
            Url::parse(DEFAULT_API_URL).unwrap(),
        ));
        let raw = GithubRawResolver::new(Arc::clone(&client));
        let repo = GithubRepositoryResolver::new(client);

        let github = Url::parse("https://github.com/org/repo").unwrap();
        let gitlab = Url::parse("https://gitlab.com/org/repo").unwrap();
        assert!(raw.can_resolve(&github));
        assert!(repo.can_resolve(&github));
        assert!(!raw.can_resolve(&gitlab));
        assert!(!repo.can_resolve(&gitlab));
    }

    #[test]
    fn test_base64_content_decoded() {
        let license: RepositoryLicense =
            serde_json::from_str(r#"{"encoding":"base64","content":"TElDRU5TRQ=="}"#).unwrap();
        assert_eq!(license.into_text().unwrap().as_deref(), Some("LICENSE"));
    }

    #[test]
    fn test_wrapped_base64_and_plain_content() {
        let license: RepositoryLicense =
            serde_json::from_str(r#"{"encoding":"base64","content":"TElD\nRU5T\nRQ==\n"}"#)
                .unwrap();
        assert_eq!(license.into_text().unwrap().as_deref(), Some("LICENSE"));

        let license: RepositoryLicense =
            serde_json::from_str(r#"{"encoding":"utf-8","content":"MIT"}"#).unwrap();
        assert_eq!(license.into_text().unwrap().as_deref(), Some("MIT"));
    }

    #[tokio::test]
    async fn test_raw_resolver_fetches_rewritten_url() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/org/repo/main/LICENSE"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/plain; charset=utf-8")
                    .set_body_string("Copyright (c) Org"),
            )
            .expect(1)
            .mount(&server)
            .await;

        let resolver = GithubRawResolver::new(client_for(&server));
        let url = Url::parse("https://github.com/org/repo/blob/main/LICENSE").unwrap();
        let text = resolver.resolve(&url, &ResolveContext::default()).await.unwrap();
        assert_eq!(text.as_deref(), Some("Copyright (c) Org"));
    }

    #[tokio::test]
    async fn test_raw_resolver_rejects_html() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200).set_body_raw("<html></html>", "text/html"),
            )
            .mount(&server)
            .await;

        let resolver = GithubRawResolver::new(client_for(&server));
        let url = Url::parse("https://github.com/org/repo").unwrap();
        assert!(resolver.resolve(&url, &ResolveContext::default()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_repository_resolver_decodes_api_response() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/org/repo/license"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "name": "LICENSE",
                "encoding": "base64",
                "content": "TElDRU5TRQ=="
            })))
            .mount(&server)
            .await;

        let resolver = GithubRepositoryResolver::new(client_for(&server));
        let url = Url::parse("https://github.com/org/repo.git").unwrap();
        let text = resolver.resolve(&url, &ResolveContext::default()).await.unwrap();
        assert_eq!(text.as_deref(), Some("LICENSE"));
    }

    #[tokio::test]
    async fn test_repository_resolver_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let resolver = GithubRepositoryResolver::new(client_for(&server));
        let url = Url::parse("https://github.com/org/missing").unwrap();
        assert!(resolver.resolve(&url, &ResolveContext::default()).await.unwrap().is_none());
    }
}
