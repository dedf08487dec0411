//! Extension manifest definition

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::application::errors::ExtensionError;

/// File name of the manifest inside an extension directory
pub const MANIFEST_FILE: &str = "extension.yaml";

/// Extension metadata
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct ExtensionManifest {
    /// Extension name (required)
    pub name: String,

    /// Extension version (required)
    pub version: String,

    /// Extension description
    pub description: Option<String>,

    /// Extension author
    pub author: Option<String>,

    /// Compiled-in extension this directory enables
    pub builtin: Option<String>,

    /// Path to the shared library, relative to the extension directory
    pub library: Option<PathBuf>,
}

/// Where an extension's code comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtensionSource {
    Builtin(String),
    Library(PathBuf),
}

impl ExtensionManifest {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ExtensionError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ExtensionError::Manifest(format!("Failed to read manifest: {}", e)))?;

        serde_yaml::from_str(&content)
            .map_err(|e| ExtensionError::Manifest(format!("Failed to parse manifest: {}", e)))
    }

    /// Resolve the source; libraries default to `libstatsbot_<name>.so`
    pub fn source(&self, dir: &Path) -> Result<ExtensionSource, ExtensionError> {
        match (&self.builtin, &self.library) {
            (Some(_), Some(_)) => Err(ExtensionError::Manifest(format!(
                "{}: builtin and library are mutually exclusive",
                self.name
            ))),
            (Some(builtin), None) => Ok(ExtensionSource::Builtin(builtin.clone())),
            (None, Some(lib)) => Ok(ExtensionSource::Library(dir.join(lib))),
            (None, None) => Ok(ExtensionSource::Library(
                dir.join(format!("libstatsbot_{}.so", self.name)),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(yaml: &str) -> ExtensionManifest {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn test_builtin_source() {
        let manifest = parse("name: tags\nversion: 0.1.0\nbuiltin: tags\n");
        assert_eq!(
            manifest.source(Path::new("ext/tags")).unwrap(),
            ExtensionSource::Builtin("tags".to_string())
        );
    }

    #[test]
    fn test_default_library_path() {
        let manifest = parse("name: clan\nversion: 1.0.0\n");
        assert_eq!(
            manifest.source(Path::new("ext/clan")).unwrap(),
            ExtensionSource::Library(PathBuf::from("ext/clan/libstatsbot_clan.so"))
        );
    }

    #[test]
    fn test_conflicting_sources_rejected() {
        let manifest = parse("name: x\nversion: 1.0.0\nbuiltin: x\nlibrary: libx.so\n");
        assert!(manifest.source(Path::new(".")).is_err());
    }

    #[test]
    fn test_missing_version_rejected() {
        assert!(serde_yaml::from_str::<ExtensionManifest>("name: x\n").is_err());
    }
}
