//! Extension trait definitions

use std::sync::Arc;

use crate::application::errors::ExtensionError;
use crate::domain::entities::CommandSet;

/// Core extension trait that all command modules implement
pub trait Extension: Send + Sync {
    /// Unique identifier, also used as the category of its commands
    fn name(&self) -> &str;

    /// Human-readable description
    fn description(&self) -> &str {
        ""
    }

    /// Hand every command this extension declares to the registry
    fn setup(&self, commands: &mut CommandSet) -> Result<(), ExtensionError>;

    /// Optional: Cleanup when the extension is replaced by a reload
    fn teardown(&self) {}
}

/// Constructor for a compiled-in extension
pub type ExtensionFactory = Arc<dyn Fn() -> Box<dyn Extension> + Send + Sync>;

/// Export an extension from a shared library.
///
/// The library must be built as a `cdylib` against the same version of this crate.
#[macro_export]
macro_rules! declare_extension {
    ($ctor:expr) => {
        #[no_mangle]
        pub extern "C" fn statsbot_extension_init() -> *mut Box<dyn $crate::extensions::Extension> {
            let extension: Box<dyn $crate::extensions::Extension> = Box::new($ctor);
            Box::into_raw(Box::new(extension))
        }
    };
}
