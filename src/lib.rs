// src/lib.rs

//! Third-party license notices generator
//!
//! Finds the license text of every dependency file in a project and writes
//! one consolidated notices document.
//!
//! # Architecture
//!
//! - Records: one per dependency file, with optional package manifest and
//!   binary version metadata
//! - Pipeline: ordered strategies per record, local files before remote lookups
//! - Resolvers: capability-typed, registered per URL kind
//! - Cache: shared across the batch, keyed by package id, URL and path,
//!   with single-flight lookups
//! - Normalization: one canonical form for every accepted text

pub mod batch;
pub mod cache;
pub mod cli;
pub mod config;
mod error;
pub mod manifest;
pub mod normalize;
pub mod notices;
pub mod pipeline;
pub mod probe;
pub mod progress;
pub mod record;
pub mod resolver;
pub mod scan;

pub use batch::{BatchReport, LicenseGroup, resolve_all};
pub use cache::LicenseCache;
pub use config::NoticesConfig;
pub use error::{Error, Result};
pub use pipeline::{LicensePipeline, Resolution, Strategy};
pub use progress::{CliProgress, LogProgress, ProgressTracker, SilentProgress};
pub use record::{PackageManifest, ResolvedFile, VersionInfo};
pub use resolver::{ResolveContext, ResolverRegistry, UrlKind, UrlResolver, VersionInfoResolver};
