// src/manifest.rs

//! NuGet package manifest (`.nuspec`) reader
//!
//! Only the fields license resolution needs are read from `<metadata>`:
//! `id`, `version`, `licenseUrl`, `projectUrl`, `repository/@url` and a
//! `<license type="file">` path. Namespaces differ between nuspec schema
//! versions, so elements are matched by local name.

use crate::error::{Error, Result};
use crate::record::PackageManifest;
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

/// `…/{name}/{version}/lib/…` (global packages folder)
static VERSION_DIR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d+\.\d+\.\d+\S*$").unwrap());

/// `…/{name}.{version}/lib/…` (packages.config layout)
static NAME_VERSION_DIR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\S+\.\d+\.\d+\.\d+\S*$").unwrap());

fn manifest_error(path: &str, reason: impl ToString) -> Error {
    Error::Manifest {
        path: path.to_string(),
        reason: reason.to_string(),
    }
}

fn attribute(element: &BytesStart<'_>, name: &[u8], path: &str) -> Result<Option<String>> {
    for attr in element.attributes() {
        let attr = attr.map_err(|e| manifest_error(path, e))?;
        if attr.key.local_name().as_ref() == name {
            let value = attr.unescape_value().map_err(|e| manifest_error(path, e))?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

/// Parse nuspec XML
///
/// Returns `Ok(None)` when the document has no `<metadata><id>`. `origin` is
/// only used in error messages.
pub fn parse_nuspec(xml: &str, origin: &str) -> Result<Option<PackageManifest>> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut path: Vec<Vec<u8>> = Vec::new();
    let mut license_is_file = false;

    let mut id = None;
    let mut version = None;
    let mut license_url = None;
    let mut project_url = None;
    let mut repository_url = None;
    let mut license_path = None;

    loop {
        match reader.read_event().map_err(|e| manifest_error(origin, e))? {
            Event::Start(element) => {
                let name = element.local_name().as_ref().to_vec();
                let in_metadata = path.len() == 2 && path[1] == b"metadata";
                if in_metadata && name == b"license" {
                    license_is_file = attribute(&element, b"type", origin)?.as_deref() == Some("file");
                }
                if in_metadata && name == b"repository" {
                    repository_url = attribute(&element, b"url", origin)?;
                }
                path.push(name);
            }
            Event::Empty(element) => {
                let in_metadata = path.len() == 2 && path[1] == b"metadata";
                if in_metadata && element.local_name().as_ref() == b"repository" {
                    repository_url = attribute(&element, b"url", origin)?;
                }
            }
            Event::Text(text) => {
                if path.len() != 3 || path[1] != b"metadata" {
                    continue;
                }
                let value = text.unescape().map_err(|e| manifest_error(origin, e))?.trim().to_string();
                if value.is_empty() {
                    continue;
                }
                match path[2].as_slice() {
                    b"id" => id = Some(value),
                    b"version" => version = Some(value),
                    b"licenseUrl" => license_url = Some(value),
                    b"projectUrl" => project_url = Some(value),
                    b"license" if license_is_file => license_path = Some(value),
                    _ => {}
                }
            }
            Event::End(_) => {
                path.pop();
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(id.map(|id| PackageManifest {
        id,
        version,
        license_url,
        project_url,
        repository_url: repository_url.filter(|u| !u.trim().is_empty()),
        license_relative_path: license_path,
    }))
}

/// Read and parse a `.nuspec` file
pub fn read_nuspec(path: &Path) -> Result<Option<PackageManifest>> {
    let xml = fs::read_to_string(path)?;
    parse_nuspec(&xml, &path.display().to_string())
}

/// First `.nuspec` file (by name) directly inside `dir`
pub fn find_nuspec(dir: &Path) -> Result<Option<PathBuf>> {
    let mut found: Vec<PathBuf> = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let is_nuspec = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("nuspec"));
        if is_nuspec && entry.file_type()?.is_file() {
            found.push(path);
        }
    }
    found.sort();
    Ok(found.into_iter().next())
}

/// Package directory a binary was restored into, from the NuGet layout
///
/// Walks up from the binary and returns the innermost ancestor named like a
/// version (`serilog/2.12.0`) or, failing that, like `name.version`
/// (`Serilog.2.12.0`). `None` when the path is not inside a package.
pub fn package_dir_for(binary: &Path) -> Option<PathBuf> {
    let matches = |re: &Regex| {
        binary.ancestors().skip(1).find(|dir| {
            dir.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| re.is_match(n))
        })
    };
    matches(&VERSION_DIR)
        .or_else(|| matches(&NAME_VERSION_DIR))
        .map(Path::to_path_buf)
}
