// src/pipeline.rs

//! License resolution pipeline
//!
//! Resolves one dependency record by trying each [`Strategy`] in order and
//! stopping at the first one that yields non-empty normalized text. Local
//! sources come first, then the declared URLs through the capability
//! resolvers, then version metadata, and finally the declared URLs again
//! with redirect-following and a plain-text fallback.
//!
//! Every success is written to the shared [`LicenseCache`] under all keys
//! that led to it. A failing strategy is a miss, never an error; only
//! cancellation stops the chain.

use crate::cache::LicenseCache;
use crate::error::{Error, Result};
use crate::normalize::normalize;
use crate::probe::{probe, read_license_text};
use crate::record::{ResolvedFile, path_key};
use crate::resolver::http::strip_txt_extension;
use crate::resolver::{HttpFetcher, ResolveContext, ResolverRegistry, UrlKind};
use std::fmt;
use std::path::{MAIN_SEPARATOR_STR, Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};
use url::Url;

/// Outcome of resolving one record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Resolved(String),
    Unresolved,
    /// The run was canceled before a result was found
    Canceled,
}

impl Resolution {
    pub fn text(&self) -> Option<&str> {
        match self {
            Resolution::Resolved(text) => Some(text),
            _ => None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, Resolution::Resolved(_))
    }
}

/// One step of the resolution chain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    LicenseFile,
    LicenseUrl,
    RepositoryUrl,
    ProjectUrl,
    PackageDirectory,
    SourceDirectory,
    VersionInfo,
    FinalLicenseUrl,
    FinalRepositoryUrl,
    FinalProjectUrl,
}

impl Strategy {
    /// Strategies in the order they are tried
    pub const ORDER: [Strategy; 10] = [
        Strategy::LicenseFile,
        Strategy::LicenseUrl,
        Strategy::RepositoryUrl,
        Strategy::ProjectUrl,
        Strategy::PackageDirectory,
        Strategy::SourceDirectory,
        Strategy::VersionInfo,
        Strategy::FinalLicenseUrl,
        Strategy::FinalRepositoryUrl,
        Strategy::FinalProjectUrl,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Strategy::LicenseFile => "license-file",
            Strategy::LicenseUrl => "license-url",
            Strategy::RepositoryUrl => "repository-url",
            Strategy::ProjectUrl => "project-url",
            Strategy::PackageDirectory => "package-directory",
            Strategy::SourceDirectory => "source-directory",
            Strategy::VersionInfo => "version-info",
            Strategy::FinalLicenseUrl => "final-license-url",
            Strategy::FinalRepositoryUrl => "final-repository-url",
            Strategy::FinalProjectUrl => "final-project-url",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Only absolute http(s) URLs are fetched
fn parse_http_url(raw: &str) -> Option<Url> {
    let url = Url::parse(raw).ok()?;
    matches!(url.scheme(), "http" | "https").then_some(url)
}

/// Join a manifest's license path onto the package directory
///
/// Manifests written on Windows use `\`; only `.txt` and `.md` files count.
fn license_file_path(package_dir: &Path, relative: &str) -> Option<PathBuf> {
    let relative = relative.trim().replace('\\', MAIN_SEPARATOR_STR);
    let lower = relative.to_ascii_lowercase();
    if !lower.ends_with(".txt") && !lower.ends_with(".md") {
        return None;
    }
    Some(package_dir.join(relative.trim_start_matches(MAIN_SEPARATOR_STR)))
}

/// Resolves license text for dependency records
pub struct LicensePipeline {
    registry: Arc<ResolverRegistry>,
    http: HttpFetcher,
    cache: Arc<LicenseCache>,
    ctx: ResolveContext,
}

impl LicensePipeline {
    pub fn new(
        registry: Arc<ResolverRegistry>,
        http: HttpFetcher,
        cache: Arc<LicenseCache>,
        ctx: ResolveContext,
    ) -> Self {
        Self {
            registry,
            http,
            cache,
            ctx,
        }
    }

    pub fn cache(&self) -> &Arc<LicenseCache> {
        &self.cache
    }

    pub fn context(&self) -> &ResolveContext {
        &self.ctx
    }

    /// Resolve the license text of one record
    ///
    /// Concurrent calls for records sharing a primary key run the chain
    /// once; the others get the same answer.
    pub async fn resolve(&self, record: &ResolvedFile) -> Resolution {
        if self.ctx.cancel.is_cancelled() {
            return Resolution::Canceled;
        }

        let key = record.primary_key();
        match self
            .cache
            .get_or_resolve(&key, || self.run_strategies(record))
            .await
        {
            Ok(Some(text)) => Resolution::Resolved(text),
            Ok(None) => Resolution::Unresolved,
            Err(e) if e.is_canceled() => Resolution::Canceled,
            Err(e) => {
                debug!("Resolution of {} failed: {}", record.display_name(), e);
                Resolution::Unresolved
            }
        }
    }

    async fn run_strategies(&self, record: &ResolvedFile) -> Result<Option<String>> {
        for strategy in Strategy::ORDER {
            if self.ctx.cancel.is_cancelled() {
                return Err(Error::Canceled);
            }

            match self.run(strategy, record).await {
                Ok(Some(text)) => {
                    debug!("{} resolved by {}", record.display_name(), strategy);
                    return Ok(Some(text));
                }
                Ok(None) => {}
                Err(e) if e.is_canceled() => return Err(e),
                Err(e) => debug!("{} failed for {}: {}", strategy, record.display_name(), e),
            }
        }
        Ok(None)
    }

    /// Run a single strategy against `record`
    pub async fn run(&self, strategy: Strategy, record: &ResolvedFile) -> Result<Option<String>> {
        match strategy {
            Strategy::LicenseFile => self.from_license_file(record),
            Strategy::LicenseUrl => self.from_url(record, UrlKind::License).await,
            Strategy::RepositoryUrl => self.from_url(record, UrlKind::Repository).await,
            Strategy::ProjectUrl => self.from_url(record, UrlKind::Project).await,
            Strategy::PackageDirectory => self.from_package_directory(record),
            Strategy::SourceDirectory => self.from_source_directory(record),
            Strategy::VersionInfo => self.from_version_info(record).await,
            Strategy::FinalLicenseUrl => self.from_final_url(record, UrlKind::License).await,
            Strategy::FinalRepositoryUrl => self.from_final_url(record, UrlKind::Repository).await,
            Strategy::FinalProjectUrl => self.from_final_url(record, UrlKind::Project).await,
        }
    }

    /// Store `text` under `keys` and the record's package id
    fn remember(&self, record: &ResolvedFile, keys: &[&str], text: &str) {
        if let Some(id) = record.package_id() {
            self.cache.put(id, text);
        }
        self.cache.put_all(keys.iter().copied(), text);
    }

    /// Cache lookup that also aliases the hit under the package id
    fn cached(&self, record: &ResolvedFile, key: &str) -> Option<String> {
        let text = self.cache.get(key)?;
        self.remember(record, &[], &text);
        Some(text)
    }

    fn from_license_file(&self, record: &ResolvedFile) -> Result<Option<String>> {
        let (Some(package_dir), Some(relative)) = (
            record.package_path.as_deref(),
            record
                .manifest
                .as_ref()
                .and_then(|m| m.license_relative_path.as_deref()),
        ) else {
            return Ok(None);
        };
        let Some(path) = license_file_path(package_dir, relative) else {
            return Ok(None);
        };

        let key = path_key(&path);
        if let Some(text) = self.cached(record, &key) {
            return Ok(Some(text));
        }
        if !path.is_file() {
            return Ok(None);
        }

        let Some(text) = normalize(&read_license_text(&path)?) else {
            return Ok(None);
        };
        self.remember(record, &[&key], &text);
        Ok(Some(text))
    }

    async fn from_url(&self, record: &ResolvedFile, kind: UrlKind) -> Result<Option<String>> {
        let Some(raw) = record.manifest.as_ref().and_then(|m| kind.of(m)) else {
            return Ok(None);
        };
        if let Some(text) = self.cached(record, raw) {
            return Ok(Some(text));
        }
        let Some(url) = parse_http_url(raw) else {
            debug!("Ignoring unusable {} '{}'", kind, raw);
            return Ok(None);
        };
        if !self
            .registry
            .url_resolvers(kind)
            .iter()
            .any(|r| r.can_resolve(&url))
        {
            return Ok(None);
        }

        // Packages sharing a URL share one flight
        let text = self
            .cache
            .get_or_resolve(raw, || async {
                let text = self.fetch_with_resolvers(kind, &url).await?;
                if let Some(text) = &text {
                    self.cache.put(raw, text.as_str());
                }
                Ok(text)
            })
            .await?;

        if let Some(text) = &text {
            self.remember(record, &[raw], text);
        }
        Ok(text)
    }

    fn from_package_directory(&self, record: &ResolvedFile) -> Result<Option<String>> {
        let Some(dir) = record.package_path.as_deref() else {
            return Ok(None);
        };
        let key = path_key(dir);
        self.probe_dir(record, dir, &key)
    }

    fn from_source_directory(&self, record: &ResolvedFile) -> Result<Option<String>> {
        let Some(dir) = record.source_path.parent() else {
            return Ok(None);
        };
        // Keyed by file: the base-name prefix differs between siblings
        let key = path_key(&record.source_path);
        self.probe_dir(record, dir, &key)
    }

    fn probe_dir(&self, record: &ResolvedFile, dir: &Path, key: &str) -> Result<Option<String>> {
        if let Some(text) = self.cached(record, key) {
            return Ok(Some(text));
        }
        let Some(raw) = probe(dir, record.base_name())? else {
            return Ok(None);
        };
        let Some(text) = normalize(&raw) else {
            return Ok(None);
        };
        self.remember(record, &[key], &text);
        Ok(Some(text))
    }

    async fn from_version_info(&self, record: &ResolvedFile) -> Result<Option<String>> {
        let Some(info) = &record.version_info else {
            return Ok(None);
        };
        let key = info.file_name.as_str();
        if let Some(text) = self.cached(record, key) {
            return Ok(Some(text));
        }

        for resolver in self.registry.version_info_resolvers() {
            if !resolver.can_resolve(info) {
                continue;
            }
            match resolver.resolve(info, &self.ctx).await {
                Ok(Some(raw)) => {
                    if let Some(text) = normalize(&raw) {
                        self.remember(record, &[key], &text);
                        return Ok(Some(text));
                    }
                }
                Ok(None) => {}
                Err(e) if e.is_canceled() => return Err(e),
                Err(e) => debug!("Resolver {} failed for {}: {}", resolver.name(), key, e),
            }
        }
        Ok(None)
    }

    async fn from_final_url(&self, record: &ResolvedFile, kind: UrlKind) -> Result<Option<String>> {
        let Some(raw) = record.manifest.as_ref().and_then(|m| kind.of(m)) else {
            return Ok(None);
        };
        if let Some(text) = self.cached(record, raw) {
            return Ok(Some(text));
        }
        let Some(url) = parse_http_url(raw) else {
            return Ok(None);
        };

        // Separate flight from the resolver pass on the same URL
        let flight = format!("final {raw}");
        let text = self
            .cache
            .coalesce(&flight, || async {
                if let Some(text) = self.cache.get(raw) {
                    return Ok(Some(text));
                }
                self.fetch_final(kind, &url).await
            })
            .await?;

        if let Some(text) = &text {
            self.remember(record, &[raw], text);
        }
        Ok(text)
    }

    /// First non-empty answer from the resolvers registered for `kind`
    async fn fetch_with_resolvers(&self, kind: UrlKind, url: &Url) -> Result<Option<String>> {
        for resolver in self.registry.url_resolvers(kind) {
            if !resolver.can_resolve(url) {
                continue;
            }
            match resolver.resolve(url, &self.ctx).await {
                Ok(Some(raw)) => {
                    if let Some(text) = normalize(&raw) {
                        debug!("{} resolved {} {}", resolver.name(), kind, url);
                        return Ok(Some(text));
                    }
                }
                Ok(None) => {}
                Err(e) if e.is_canceled() => return Err(e),
                Err(e) => debug!("Resolver {} failed for {}: {}", resolver.name(), url, e),
            }
        }
        Ok(None)
    }

    /// GET `url` following redirects, then fall back to the plain-text body
    async fn fetch_final(&self, kind: UrlKind, url: &Url) -> Result<Option<String>> {
        let mut reply = self.http.get(url, &self.ctx).await?;
        if !reply.is_success() {
            let Some(stripped) = strip_txt_extension(url) else {
                debug!("{} returned HTTP {}", url, reply.status);
                return Ok(None);
            };
            reply = self.http.get(&stripped, &self.ctx).await?;
            if !reply.is_success() {
                debug!("{} returned HTTP {}", stripped, reply.status);
                return Ok(None);
            }
        }

        if reply.url != *url {
            debug!("{} ended at {}", url, reply.url);
            if let Some(text) = self.fetch_with_resolvers(kind, &reply.url).await? {
                return Ok(Some(text));
            }
        }

        if !reply.is_plain_text() {
            debug!(
                "{} is not plain text ({:?})",
                reply.url, reply.media_type
            );
            return Ok(None);
        }
        Ok(normalize(&reply.body))
    }
}

impl fmt::Debug for LicensePipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LicensePipeline")
            .field("cached", &self.cache.len())
            .finish_non_exhaustive()
    }
}

/// Log a finished record at `info`
pub(crate) fn log_outcome(record: &ResolvedFile, resolution: &Resolution) {
    match resolution {
        Resolution::Resolved(_) => info!("Resolved license for {}", record.display_name()),
        Resolution::Unresolved => {}
        Resolution::Canceled => info!("Canceled before resolving {}", record.display_name()),
    }
}
