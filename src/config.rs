// src/config.rs
//! Configuration file parsing
//!
//! Supports a TOML file with top-level run settings and an `[endpoints]`
//! table for the remote services:
//!
//! ```toml
//! github_token = "ghp_..."
//! concurrency = 8
//! timeout_secs = 30
//! output_filename = "third-party-notices.txt"
//!
//! [endpoints]
//! raw_content = "https://raw.githubusercontent.com"
//! github_api = "https://api.github.com"
//! spdx_api = "https://api.github.com"
//! ```

use crate::batch::DEFAULT_CONCURRENCY;
use crate::cache::LicenseCache;
use crate::pipeline::LicensePipeline;
use crate::resolver::github::{DEFAULT_API_URL, DEFAULT_RAW_CONTENT_URL};
use crate::resolver::registry::ResolverEndpoints;
use crate::resolver::{HttpFetcher, ResolveContext, ResolverRegistry};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Environment variable holding a GitHub token
pub const TOKEN_ENV: &str = "GITHUB_TOKEN";

/// Default notices file name
pub const DEFAULT_OUTPUT_FILENAME: &str = "third-party-notices.txt";

/// TOML configuration file structure
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NoticesConfig {
    /// Bearer token for GitHub API calls
    #[serde(default)]
    pub github_token: Option<String>,

    /// Records resolved at once
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Per-request timeout
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    #[serde(default = "default_output_filename")]
    pub output_filename: String,

    #[serde(default)]
    pub endpoints: EndpointsSection,
}

impl Default for NoticesConfig {
    fn default() -> Self {
        Self {
            github_token: None,
            concurrency: default_concurrency(),
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
            output_filename: default_output_filename(),
            endpoints: EndpointsSection::default(),
        }
    }
}

/// Remote service base URLs
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EndpointsSection {
    #[serde(default = "default_raw_content")]
    pub raw_content: String,

    #[serde(default = "default_github_api")]
    pub github_api: String,

    /// License catalogue used for opensource.org ids
    #[serde(default = "default_github_api")]
    pub spdx_api: String,
}

impl Default for EndpointsSection {
    fn default() -> Self {
        Self {
            raw_content: default_raw_content(),
            github_api: default_github_api(),
            spdx_api: default_github_api(),
        }
    }
}

fn default_concurrency() -> usize {
    DEFAULT_CONCURRENCY
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_user_agent() -> String {
    format!("notices/{}", env!("CARGO_PKG_VERSION"))
}

fn default_output_filename() -> String {
    DEFAULT_OUTPUT_FILENAME.to_string()
}

fn default_raw_content() -> String {
    DEFAULT_RAW_CONTENT_URL.to_string()
}

fn default_github_api() -> String {
    DEFAULT_API_URL.to_string()
}

fn parse_endpoint(name: &str, value: &str) -> Result<Url> {
    let url = Url::parse(value).with_context(|| format!("Invalid endpoints.{name} URL: {value}"))?;
    if !matches!(url.scheme(), "http" | "https") {
        anyhow::bail!("endpoints.{name} must be an http(s) URL, got '{value}'");
    }
    Ok(url)
}

impl NoticesConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: NoticesConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        config.validate()?;
        Ok(config)
    }

    /// Default config file location (`~/.config/notices/config.toml`)
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("notices").join("config.toml"))
    }

    /// Load `path`, else the default location if it exists, else defaults
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load(path);
        }
        match Self::default_path() {
            Some(path) if path.is_file() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Apply command-line and environment overrides
    ///
    /// Token precedence: `cli_token`, then `env_token`, then the file.
    pub fn apply_overrides(
        &mut self,
        cli_token: Option<String>,
        env_token: Option<String>,
        concurrency: Option<usize>,
    ) {
        if let Some(token) = cli_token.or(env_token).filter(|t| !t.trim().is_empty()) {
            self.github_token = Some(token);
        }
        if let Some(concurrency) = concurrency {
            self.concurrency = concurrency;
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.concurrency == 0 {
            anyhow::bail!("concurrency must be at least 1");
        }
        if self.timeout_secs == 0 {
            anyhow::bail!("timeout_secs must be at least 1");
        }
        if self.output_filename.trim().is_empty() {
            anyhow::bail!("output_filename must not be empty");
        }
        self.resolver_endpoints()?;
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Parsed endpoint URLs
    pub fn resolver_endpoints(&self) -> Result<ResolverEndpoints> {
        Ok(ResolverEndpoints {
            raw_content: parse_endpoint("raw_content", &self.endpoints.raw_content)?,
            github_api: parse_endpoint("github_api", &self.endpoints.github_api)?,
            spdx_api: parse_endpoint("spdx_api", &self.endpoints.spdx_api)?,
        })
    }

    /// Assemble the pipeline with the built-in resolvers
    pub fn build_pipeline(
        &self,
        cache: Arc<LicenseCache>,
        cancel: CancellationToken,
    ) -> Result<LicensePipeline> {
        let http = HttpFetcher::with_timeout(&self.user_agent, self.timeout())
            .context("Failed to create HTTP client")?;
        let registry = ResolverRegistry::with_defaults(http.clone(), &self.resolver_endpoints()?);
        let ctx = ResolveContext::new(self.github_token.clone(), cancel);
        Ok(LicensePipeline::new(Arc::new(registry), http, cache, ctx))
    }
}
