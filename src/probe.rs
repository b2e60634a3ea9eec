// src/probe.rs

//! Local filesystem probe for license files
//!
//! Looks one level deep in a directory for `license.txt` / `license.md`
//! (case-insensitive), optionally prefixed with a binary's base name and a
//! separator (`Foo-license.txt`, `Foo_LICENSE.md`, ...) so several
//! assemblies can share one package directory.

use crate::error::Result;
use regex::Regex;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Build the file name pattern for a probe
fn license_pattern(base_name: Option<&str>) -> Result<Regex> {
    let pattern = match base_name {
        Some(base) if !base.is_empty() => format!(
            r"(?i)^(?:{}[-_.+])?license\.(?:txt|md)$",
            regex::escape(base)
        ),
        _ => r"(?i)^license\.(?:txt|md)$".to_string(),
    };
    Ok(Regex::new(&pattern)?)
}

/// Find the license file in `dir`
///
/// Returns `Ok(None)` if the directory does not exist or holds no match.
/// When several files qualify the lexicographically smallest name wins.
pub fn find_license_file(dir: &Path, base_name: Option<&str>) -> Result<Option<PathBuf>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    let pattern = license_pattern(base_name)?;
    let mut candidates = Vec::new();
    for entry in entries {
        let entry = entry?;
        // Follows symlinks
        if !entry.path().is_file() {
            continue;
        }
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if pattern.is_match(name) {
            candidates.push(entry.path());
        }
    }

    candidates.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(candidates.into_iter().next())
}

/// Read the license file in `dir`, if any
pub fn probe(dir: &Path, base_name: Option<&str>) -> Result<Option<String>> {
    let Some(path) = find_license_file(dir, base_name)? else {
        return Ok(None);
    };
    debug!("Found license file {}", path.display());
    Ok(Some(read_license_text(&path)?))
}

/// Read a license file, replacing invalid UTF-8 sequences
pub fn read_license_text(path: &Path) -> Result<String> {
    let bytes = fs::read(path)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
