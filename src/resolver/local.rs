// src/resolver/local.rs
//! Version-info resolver for binaries restored from a package cache
//!
//! Plain assemblies carry no manifest, but when they live in a NuGet layout
//! the package directory usually ships a license file next to the nuspec.

use super::{ResolveContext, VersionInfoResolver};
use crate::error::Result;
use crate::manifest::package_dir_for;
use crate::probe::probe;
use crate::record::VersionInfo;
use async_trait::async_trait;
use std::path::Path;
use tracing::debug;

#[derive(Debug, Default, Clone, Copy)]
pub struct LocalPackageResolver;

impl LocalPackageResolver {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl VersionInfoResolver for LocalPackageResolver {
    fn name(&self) -> &str {
        "local-package"
    }

    fn can_resolve(&self, info: &VersionInfo) -> bool {
        !info.file_name.trim().is_empty()
    }

    async fn resolve(&self, info: &VersionInfo, _ctx: &ResolveContext) -> Result<Option<String>> {
        let binary = Path::new(&info.file_name);
        let Some(dir) = package_dir_for(binary).or_else(|| binary.parent().map(Path::to_path_buf))
        else {
            return Ok(None);
        };
        let base_name = binary.file_stem().and_then(|s| s.to_str());

        debug!("Probing {} for {}", dir.display(), info.file_name);
        probe(&dir, base_name)
    }
}
