// src/resolver/http.rs

//! HTTP fetch shared by all remote resolvers
//!
//! Wraps reqwest with the run's cancellation token: every request and body
//! read races against it and surfaces `Error::Canceled` when it fires.
//! No retries here; a failed request is reported once.

use super::ResolveContext;
use crate::error::{Error, Result};
use reqwest::header::CONTENT_TYPE;
use reqwest::redirect::Policy;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Default timeout for HTTP requests (30 seconds)
pub const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Maximum redirects followed by the final pass
const MAX_REDIRECTS: usize = 10;

/// A fully read HTTP response
#[derive(Debug, Clone)]
pub struct HttpReply {
    pub status: u16,
    /// URL of the last request, after redirects
    pub url: Url,
    /// Media type without parameters, lowercased (`text/plain`)
    pub media_type: Option<String>,
    pub body: String,
}

impl HttpReply {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_plain_text(&self) -> bool {
        self.media_type.as_deref() == Some("text/plain")
    }
}

/// Strip parameters from a Content-Type value
fn parse_media_type(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// Cancellation-aware HTTP GET client
#[derive(Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Create a fetcher with the default timeout
    pub fn new(user_agent: &str) -> Result<Self> {
        Self::with_timeout(user_agent, HTTP_TIMEOUT)
    }

    pub fn with_timeout(user_agent: &str, timeout: Duration) -> Result<Self> {
        // GitHub rejects requests without a User-Agent
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .redirect(Policy::limited(MAX_REDIRECTS))
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self { client })
    }

    /// GET without credentials
    pub async fn get(&self, url: &Url, ctx: &ResolveContext) -> Result<HttpReply> {
        self.send(url, ctx, None).await
    }

    /// GET with the context's bearer token, when one is set
    pub async fn get_authorized(&self, url: &Url, ctx: &ResolveContext) -> Result<HttpReply> {
        self.send(url, ctx, ctx.token.as_deref()).await
    }

    async fn send(&self, url: &Url, ctx: &ResolveContext, token: Option<&str>) -> Result<HttpReply> {
        let mut request = self.client.get(url.clone());
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }

        let fetch = async {
            let response = request.send().await?;
            let status = response.status().as_u16();
            let final_url = response.url().clone();
            let media_type = response
                .headers()
                .get(CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .map(parse_media_type);
            let body = response.text().await?;

            debug!("GET {} -> {} ({})", url, status, final_url);
            Ok::<_, Error>(HttpReply {
                status,
                url: final_url,
                media_type,
                body,
            })
        };

        tokio::select! {
            biased;
            _ = ctx.cancel.cancelled() => Err(Error::Canceled),
            reply = fetch => reply,
        }
    }
}

/// Replace the path of `base` with `base.path() + path`, keeping `base`'s host
pub fn rebase(base: &Url, path: &str) -> Url {
    let mut url = base.clone();
    let joined = format!(
        "{}/{}",
        base.path().trim_end_matches('/'),
        path.trim_start_matches('/')
    );
    url.set_path(&joined);
    url.set_query(None);
    url.set_fragment(None);
    url
}

/// `https://host/LICENSE.txt` -> `https://host/LICENSE`
pub fn strip_txt_extension(url: &Url) -> Option<Url> {
    let stem = url.path().strip_suffix(".txt")?;
    let mut stripped = url.clone();
    stripped.set_path(stem);
    Some(stripped)
}
