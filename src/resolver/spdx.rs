// src/resolver/spdx.rs
//! SPDX id lookup for opensource.org license URLs
//!
//! `https://opensource.org/licenses/MIT` names a license by id; the text is
//! fetched from GitHub's license catalogue (`GET /licenses/{id}`).

use super::http::{HttpFetcher, rebase};
use super::{ResolveContext, UrlResolver};
use crate::error::Result;
use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;
use url::Url;

pub const OPENSOURCE_ORG_HOST: &str = "opensource.org";

#[derive(Debug, Deserialize)]
struct LicenseBody {
    body: Option<String>,
}

/// License id from an opensource.org URL (`/licenses/{id}`)
pub fn license_id(url: &Url) -> Option<String> {
    let mut segments = url.path_segments()?.filter(|seg| !seg.is_empty());
    if segments.next()? != "licenses" {
        return None;
    }
    // The catalogue keys are lowercase (`apache-2.0`)
    segments.next().map(str::to_ascii_lowercase)
}

pub struct OpenSourceOrgResolver {
    http: HttpFetcher,
    api_base: Url,
}

impl OpenSourceOrgResolver {
    pub fn new(http: HttpFetcher, api_base: Url) -> Self {
        Self { http, api_base }
    }
}

#[async_trait]
impl UrlResolver for OpenSourceOrgResolver {
    fn name(&self) -> &str {
        "opensource-org"
    }

    fn can_resolve(&self, url: &Url) -> bool {
        url.host_str() == Some(OPENSOURCE_ORG_HOST)
    }

    async fn resolve(&self, url: &Url, ctx: &ResolveContext) -> Result<Option<String>> {
        let Some(id) = license_id(url) else {
            return Ok(None);
        };
        let api = rebase(&self.api_base, &format!("licenses/{id}"));
        let reply = self.http.get_authorized(&api, ctx).await?;
        if !reply.is_success() {
            debug!("License catalogue has no {} (HTTP {})", id, reply.status);
            return Ok(None);
        }
        let license: LicenseBody = serde_json::from_str(&reply.body)?;
        Ok(license.body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_license_id() {
        let url = Url::parse("https://opensource.org/licenses/Apache-2.0").unwrap();
        assert_eq!(license_id(&url).as_deref(), Some("apache-2.0"));

        let url = Url::parse("https://opensource.org/licenses/").unwrap();
        assert_eq!(license_id(&url), None);

        let url = Url::parse("https://opensource.org/about").unwrap();
        assert_eq!(license_id(&url), None);
    }

    #[tokio::test]
    async fn test_resolves_body_field() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/licenses/mit"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "key": "mit",
                "spdx_id": "MIT",
                "body": "MIT License\n\nCopyright (c) [year] [fullname]"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let resolver = OpenSourceOrgResolver::new(
            HttpFetcher::new("notices-test").unwrap(),
            Url::parse(&server.uri()).unwrap(),
        );
        let url = Url::parse("https://opensource.org/licenses/MIT").unwrap();
        assert!(resolver.can_resolve(&url));

        let text = resolver.resolve(&url, &ResolveContext::default()).await.unwrap();
        assert!(text.unwrap().starts_with("MIT License"));
    }

    #[tokio::test]
    async fn test_malformed_json_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let resolver = OpenSourceOrgResolver::new(
            HttpFetcher::new("notices-test").unwrap(),
            Url::parse(&server.uri()).unwrap(),
        );
        let url = Url::parse("https://opensource.org/licenses/MIT").unwrap();
        assert!(resolver.resolve(&url, &ResolveContext::default()).await.is_err());
    }
}
