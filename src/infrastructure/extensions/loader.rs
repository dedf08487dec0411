//! Extension loader - Discovers extension directories and loads shared libraries

use std::path::{Path, PathBuf};

use libloading::{Library, Symbol};

use super::manifest::{ExtensionManifest, MANIFEST_FILE};
use crate::application::errors::ExtensionError;
use crate::extensions::Extension;

/// Function signature exported by extension libraries
pub type ExtensionInitFn = unsafe extern "C" fn() -> *mut Box<dyn Extension>;

/// Symbol every extension library exports
pub const ENTRY_SYMBOL: &[u8] = b"statsbot_extension_init";

/// An extension directory found during a scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredExtension {
    /// Directory name, used as the extension identifier
    pub identifier: String,
    pub path: PathBuf,
}

impl DiscoveredExtension {
    pub fn manifest(&self) -> Result<ExtensionManifest, ExtensionError> {
        let manifest_path = self.path.join(MANIFEST_FILE);
        if !manifest_path.exists() {
            return Err(ExtensionError::Manifest(format!(
                "Missing {} in {}",
                MANIFEST_FILE,
                self.path.display()
            )));
        }
        ExtensionManifest::from_file(&manifest_path)
    }
}

/// List every extension directory under `dir`, sorted by identifier.
/// Hidden directories and plain files are skipped.
pub fn discover(dir: &Path) -> Vec<DiscoveredExtension> {
    let mut found = Vec::new();

    if !dir.exists() {
        tracing::warn!("Extension directory does not exist: {}", dir.display());
        return found;
    }

    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!("Failed to read extension directory {}: {}", dir.display(), e);
            return found;
        }
    };

    for entry in entries {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                tracing::warn!("Failed to read directory entry: {}", e);
                continue;
            }
        };

        let path = entry.path();
        if !path.is_dir() {
            continue;
        }

        let Some(name) = path.file_name().and_then(|n| n.to_str()).map(str::to_string) else {
            continue;
        };
        if name.starts_with('.') {
            continue;
        }

        found.push(DiscoveredExtension { identifier: name, path });
    }

    found.sort_by(|a, b| a.identifier.cmp(&b.identifier));
    found
}

/// Load an extension from a shared library.
///
/// The returned library must outlive the extension and every command it declared.
pub fn load_library(path: &Path) -> Result<(Library, Box<dyn Extension>), ExtensionError> {
    if !path.exists() {
        return Err(ExtensionError::Library(format!("Library not found: {}", path.display())));
    }

    let library = unsafe {
        Library::new(path)
            .map_err(|e| ExtensionError::Library(format!("Failed to load library: {}", e)))?
    };

    let extension = unsafe {
        let init_fn: Symbol<ExtensionInitFn> = library
            .get(ENTRY_SYMBOL)
            .map_err(|e| ExtensionError::Library(format!("Failed to find init function: {}", e)))?;
        let raw = init_fn();
        if raw.is_null() {
            return Err(ExtensionError::Library("Extension init returned null".to_string()));
        }
        *Box::from_raw(raw)
    };

    Ok((library, extension))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_discover_skips_files_and_hidden_dirs() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("tags")).unwrap();
        std::fs::create_dir(dir.path().join("admin")).unwrap();
        std::fs::create_dir(dir.path().join(".cache")).unwrap();
        std::fs::write(dir.path().join("notes.txt"), "x").unwrap();

        let found: Vec<_> = discover(dir.path()).into_iter().map(|d| d.identifier).collect();
        assert_eq!(found, vec!["admin".to_string(), "tags".to_string()]);
    }

    #[test]
    fn test_discover_missing_directory() {
        assert!(discover(Path::new("/definitely/not/here")).is_empty());
    }

    #[test]
    fn test_missing_manifest_reported() {
        let dir = tempfile::tempdir().unwrap();
        let found = DiscoveredExtension {
            identifier: "empty".to_string(),
            path: dir.path().to_path_buf(),
        };
        assert!(matches!(found.manifest(), Err(ExtensionError::Manifest(_))));
    }

    #[test]
    fn test_missing_library_reported() {
        let err = load_library(Path::new("/nowhere/libstatsbot_x.so")).err().unwrap();
        assert!(matches!(err, ExtensionError::Library(_)));
    }
}
