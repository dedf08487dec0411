//! Extension system
//!
//! Extensions are bundles of commands loaded at connect time, either compiled in
//! (builtins enabled by name or by an `extension.yaml` manifest) or from a shared library.

pub mod admin;
pub mod registry;
pub mod tags;
pub mod trait_def;

use std::collections::HashMap;
use std::sync::Arc;

pub use registry::{ExtensionRegistry, LoadResult, LoadState};
pub use trait_def::{Extension, ExtensionFactory};

/// Every compiled-in extension, by name
pub fn builtin_catalog() -> HashMap<String, ExtensionFactory> {
    let mut catalog: HashMap<String, ExtensionFactory> = HashMap::new();
    catalog.insert("admin".to_string(), Arc::new(|| Box::new(admin::AdminExtension) as Box<dyn Extension>));
    catalog.insert("tags".to_string(), Arc::new(|| Box::new(tags::TagsExtension) as Box<dyn Extension>));
    catalog
}
