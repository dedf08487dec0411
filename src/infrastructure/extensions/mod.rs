//! Extension discovery and shared-library loading

pub mod loader;
pub mod manifest;

pub use loader::{discover, load_library, DiscoveredExtension, ENTRY_SYMBOL};
pub use manifest::{ExtensionManifest, ExtensionSource, MANIFEST_FILE};
