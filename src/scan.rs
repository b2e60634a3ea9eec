// src/scan.rs

//! Record intake
//!
//! Records come either from a JSON file written by an external scanner or
//! from [`scan_directory`], which walks a directory for binaries and fills
//! in package metadata from the NuGet layout.

use crate::error::Result;
use crate::manifest::{find_nuspec, package_dir_for, read_nuspec};
use crate::record::{ResolvedFile, VersionInfo};
use regex::Regex;
use std::fs;
use std::path::Path;
use tracing::{debug, info};
use walkdir::WalkDir;

/// File extensions treated as scannable binaries
pub const BINARY_EXTENSIONS: &[&str] = &["dll", "exe"];

fn is_binary(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| BINARY_EXTENSIONS.iter().any(|b| ext.eq_ignore_ascii_case(b)))
}

/// Build the record for one binary
pub fn record_for(root: &Path, binary: &Path) -> ResolvedFile {
    let relative = binary
        .strip_prefix(root)
        .unwrap_or(binary)
        .to_string_lossy()
        .replace('\\', "/");

    let mut record = ResolvedFile::new(binary)
        .with_relative_output_path(relative)
        .with_version_info(VersionInfo::new(binary.to_string_lossy()));

    let Some(package_dir) = package_dir_for(binary) else {
        return record;
    };
    record = record.with_package_path(&package_dir);

    let manifest = find_nuspec(&package_dir).and_then(|nuspec| match nuspec {
        Some(path) => read_nuspec(&path),
        None => Ok(None),
    });
    match manifest {
        Ok(Some(manifest)) => record.with_manifest(manifest),
        Ok(None) => record,
        Err(e) => {
            debug!("No usable manifest in {}: {}", package_dir.display(), e);
            record
        }
    }
}

/// Walk `root` for `.dll`/`.exe` files, optionally filtered by a path regex
///
/// Results are sorted by path.
pub fn scan_directory(root: &Path, filter: Option<&Regex>) -> Result<Vec<ResolvedFile>> {
    let mut records = Vec::new();

    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(std::io::Error::from)?;
        if !entry.file_type().is_file() || !is_binary(entry.path()) {
            continue;
        }
        let wanted = filter.is_none_or(|re| re.is_match(&entry.path().to_string_lossy()));
        if !wanted {
            continue;
        }
        records.push(record_for(root, entry.path()));
    }

    info!("Found {} binaries under {}", records.len(), root.display());
    Ok(records)
}

/// Read records from a JSON array
pub fn load_records(path: &Path) -> Result<Vec<ResolvedFile>> {
    let json = fs::read_to_string(path)?;
    let records: Vec<ResolvedFile> = serde_json::from_str(&json)?;
    info!("Loaded {} records from {}", records.len(), path.display());
    Ok(records)
}
