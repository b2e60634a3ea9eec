// src/record.rs

//! Dependency records consumed by the resolution engine
//!
//! A scanner produces one [`ResolvedFile`] per dependency file. The engine
//! only ever reads these; results flow out through the cache and the
//! pipeline's return value.

use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};

/// Package manifest metadata (parsed from a `.nuspec`)
///
/// Identity is the package id: two manifests with the same id describe the
/// same package regardless of the other fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageManifest {
    pub id: String,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub license_url: Option<String>,
    #[serde(default)]
    pub project_url: Option<String>,
    #[serde(default)]
    pub repository_url: Option<String>,
    /// Path of the license file inside the package, when declared as `type="file"`
    #[serde(default)]
    pub license_relative_path: Option<String>,
}

impl PackageManifest {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            version: None,
            license_url: None,
            project_url: None,
            repository_url: None,
            license_relative_path: None,
        }
    }

    pub fn with_license_url(mut self, url: impl Into<String>) -> Self {
        self.license_url = Some(url.into());
        self
    }

    pub fn with_project_url(mut self, url: impl Into<String>) -> Self {
        self.project_url = Some(url.into());
        self
    }

    pub fn with_repository_url(mut self, url: impl Into<String>) -> Self {
        self.repository_url = Some(url.into());
        self
    }

    pub fn with_license_relative_path(mut self, path: impl Into<String>) -> Self {
        self.license_relative_path = Some(path.into());
        self
    }
}

impl PartialEq for PackageManifest {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for PackageManifest {}

impl Hash for PackageManifest {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// Version resource of a binary
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionInfo {
    /// Full path of the binary the metadata was read from
    pub file_name: String,
    #[serde(default)]
    pub product_name: Option<String>,
    #[serde(default)]
    pub product_version: Option<String>,
    #[serde(default)]
    pub file_version: Option<String>,
    #[serde(default)]
    pub company_name: Option<String>,
    #[serde(default)]
    pub file_description: Option<String>,
    #[serde(default)]
    pub legal_copyright: Option<String>,
}

impl VersionInfo {
    pub fn new(file_name: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            ..Default::default()
        }
    }
}

/// One dependency file plus whatever metadata the scanner found for it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedFile {
    pub source_path: PathBuf,
    #[serde(default)]
    pub relative_output_path: Option<String>,
    #[serde(default)]
    pub version_info: Option<VersionInfo>,
    #[serde(default)]
    pub package_path: Option<PathBuf>,
    #[serde(default)]
    pub manifest: Option<PackageManifest>,
}

impl ResolvedFile {
    pub fn new(source_path: impl Into<PathBuf>) -> Self {
        Self {
            source_path: source_path.into(),
            relative_output_path: None,
            version_info: None,
            package_path: None,
            manifest: None,
        }
    }

    pub fn with_relative_output_path(mut self, path: impl Into<String>) -> Self {
        self.relative_output_path = Some(path.into());
        self
    }

    pub fn with_package(mut self, package_path: impl Into<PathBuf>, manifest: PackageManifest) -> Self {
        self.package_path = Some(package_path.into());
        self.manifest = Some(manifest);
        self
    }

    pub fn with_package_path(mut self, package_path: impl Into<PathBuf>) -> Self {
        self.package_path = Some(package_path.into());
        self
    }

    pub fn with_manifest(mut self, manifest: PackageManifest) -> Self {
        self.manifest = Some(manifest);
        self
    }

    pub fn with_version_info(mut self, info: VersionInfo) -> Self {
        self.version_info = Some(info);
        self
    }

    /// Package id, when the file came from a package
    pub fn package_id(&self) -> Option<&str> {
        self.manifest.as_ref().map(|m| m.id.as_str())
    }

    /// File name without extension, used to match per-assembly license files
    pub fn base_name(&self) -> Option<&str> {
        self.source_path.file_stem().and_then(|s| s.to_str())
    }

    /// Name shown in the notices file
    pub fn display_name(&self) -> String {
        match &self.relative_output_path {
            Some(p) => p.clone(),
            None => self
                .source_path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| self.source_path.display().to_string()),
        }
    }

    /// Key used to single-flight the whole strategy chain for this record
    ///
    /// Package id first, then the binary's file name, then the source path.
    pub fn primary_key(&self) -> String {
        if let Some(id) = self.package_id() {
            return id.to_string();
        }
        if let Some(info) = &self.version_info {
            return info.file_name.clone();
        }
        path_key(&self.source_path)
    }
}

/// Cache key for a filesystem path
pub fn path_key(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_manifest_identity_is_id() {
        let a = PackageManifest::new("Newtonsoft.Json").with_license_url("https://a");
        let b = PackageManifest::new("Newtonsoft.Json").with_project_url("https://b");
        assert_eq!(a, b);

        let mut set = HashSet::new();
        set.insert(a);
        assert!(!set.insert(b));
    }

    #[test]
    fn test_primary_key_precedence() {
        let plain = ResolvedFile::new("/bin/tool.dll");
        assert_eq!(plain.primary_key(), "/bin/tool.dll");

        let with_info = plain.clone().with_version_info(VersionInfo::new("/bin/tool.dll.info"));
        assert_eq!(with_info.primary_key(), "/bin/tool.dll.info");

        let packaged = with_info.with_manifest(PackageManifest::new("Tool"));
        assert_eq!(packaged.primary_key(), "Tool");
    }

    #[test]
    fn test_display_name_falls_back_to_file_name() {
        let record = ResolvedFile::new("/pkgs/serilog/2.0.0/lib/net6.0/Serilog.dll");
        assert_eq!(record.display_name(), "Serilog.dll");
        assert_eq!(record.base_name(), Some("Serilog"));

        let record = record.with_relative_output_path("bin/Serilog.dll");
        assert_eq!(record.display_name(), "bin/Serilog.dll");
    }

    #[test]
    fn test_record_json_shape() {
        let json = r#"{
            "sourcePath": "/p/foo/1.0.0/lib/net8.0/Foo.dll",
            "relativeOutputPath": "Foo.dll",
            "packagePath": "/p/foo/1.0.0",
            "manifest": { "id": "Foo", "licenseUrl": "https://opensource.org/licenses/MIT" }
        }"#;
        let record: ResolvedFile = serde_json::from_str(json).unwrap();
        assert_eq!(record.package_id(), Some("Foo"));
        assert_eq!(
            record.manifest.unwrap().license_url.as_deref(),
            Some("https://opensource.org/licenses/MIT")
        );
        assert!(record.version_info.is_none());
    }
}
