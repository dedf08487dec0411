//! Extension registry - loads extensions in isolation and assembles the command registry

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock};

use libloading::Library;
use tracing::{info, warn};

use super::trait_def::{Extension, ExtensionFactory};
use crate::application::errors::{ExtensionError, RegistryError};
use crate::domain::entities::{CommandRegistry, CommandSet};
use crate::infrastructure::extensions::{loader, ExtensionSource};

/// Load state of one extension
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadState {
    Loaded { commands: usize },
    Failed { kind: String, message: String },
}

/// Outcome of loading one extension
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadResult {
    pub identifier: String,
    pub state: LoadState,
}

impl LoadResult {
    fn failed(identifier: &str, error: &ExtensionError) -> Self {
        Self {
            identifier: identifier.to_string(),
            state: LoadState::Failed {
                kind: error.kind().to_string(),
                message: error.to_string(),
            },
        }
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self.state, LoadState::Loaded { .. })
    }
}

impl std::fmt::Display for LoadResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.state {
            LoadState::Loaded { commands } => {
                write!(f, "Loaded extension: {} ({} commands)", self.identifier, commands)
            }
            LoadState::Failed { kind, message } => {
                write!(f, "LoadError: {}\n{}: {}", self.identifier, kind, message)
            }
        }
    }
}

struct LoadedExtension {
    identifier: String,
    extension: Arc<dyn Extension>,
    commands: CommandSet,
}

/// Manages extension loading, reloading and the command declarations they contribute
pub struct ExtensionRegistry {
    directory: Option<PathBuf>,
    catalog: HashMap<String, ExtensionFactory>,
    /// Builtins loaded without a manifest
    enabled: Vec<String>,
    loaded: RwLock<Vec<LoadedExtension>>,
    results: RwLock<Vec<LoadResult>>,
    // shared objects stay mapped for the life of the process; handlers may point into them
    libraries: Mutex<Vec<Library>>,
}

impl ExtensionRegistry {
    pub fn new(directory: Option<PathBuf>) -> Self {
        Self {
            directory,
            catalog: HashMap::new(),
            enabled: Vec::new(),
            loaded: RwLock::new(Vec::new()),
            results: RwLock::new(Vec::new()),
            libraries: Mutex::new(Vec::new()),
        }
    }

    /// Make a compiled-in extension available to manifests
    pub fn with_builtin(mut self, name: impl Into<String>, factory: ExtensionFactory) -> Self {
        self.catalog.insert(name.into(), factory);
        self
    }

    pub fn with_builtins(mut self, catalog: HashMap<String, ExtensionFactory>) -> Self {
        self.catalog.extend(catalog);
        self
    }

    /// Load a compiled-in extension on every load pass
    pub fn enable(mut self, name: impl Into<String>) -> Self {
        self.enabled.push(name.into());
        self
    }

    pub fn directory(&self) -> Option<&Path> {
        self.directory.as_deref()
    }

    /// Load enabled builtins and every extension in the configured directory
    pub fn load_all(&self) -> Vec<LoadResult> {
        self.load_from(self.directory.as_deref())
    }

    /// Load enabled builtins and every extension in `directory`, replacing the loaded set.
    /// A failing extension is recorded and skipped.
    pub fn load_from(&self, directory: Option<&Path>) -> Vec<LoadResult> {
        let mut candidates: Vec<(String, Result<ExtensionSource, ExtensionError>)> = self
            .enabled
            .iter()
            .map(|name| (name.clone(), Ok(ExtensionSource::Builtin(name.clone()))))
            .collect();

        if let Some(dir) = directory {
            for found in loader::discover(dir) {
                let source = found
                    .manifest()
                    .and_then(|manifest| manifest.source(&found.path));
                candidates.push((found.identifier, source));
            }
        }

        let mut loaded = Vec::new();
        let mut results = Vec::new();
        for (identifier, source) in candidates {
            if loaded.iter().any(|l: &LoadedExtension| l.identifier == identifier) {
                let error = ExtensionError::Manifest(format!("{} is already loaded", identifier));
                warn!("LoadError: {}: {}", identifier, error);
                results.push(LoadResult::failed(&identifier, &error));
                continue;
            }
            match source.and_then(|source| self.load_one(&identifier, source)) {
                Ok(extension) => {
                    info!("Loaded extension: {} ({} commands)", identifier, extension.commands.len());
                    results.push(LoadResult {
                        identifier: identifier.clone(),
                        state: LoadState::Loaded {
                            commands: extension.commands.len(),
                        },
                    });
                    loaded.push(extension);
                }
                Err(e) => {
                    warn!("LoadError: {}: {}", identifier, e);
                    results.push(LoadResult::failed(&identifier, &e));
                }
            }
        }

        let previous = match self.loaded.write() {
            Ok(mut guard) => std::mem::replace(&mut *guard, loaded),
            Err(poisoned) => std::mem::replace(&mut *poisoned.into_inner(), loaded),
        };
        for old in previous {
            old.extension.teardown();
        }
        if let Ok(mut guard) = self.results.write() {
            *guard = results.clone();
        }
        results
    }

    fn load_one(&self, identifier: &str, source: ExtensionSource) -> Result<LoadedExtension, ExtensionError> {
        let extension: Arc<dyn Extension> = match source {
            ExtensionSource::Builtin(name) => {
                let factory = self
                    .catalog
                    .get(&name)
                    .ok_or_else(|| ExtensionError::UnknownBuiltin(name.clone()))?;
                let built = catch_unwind(AssertUnwindSafe(|| factory()))
                    .map_err(|panic| ExtensionError::Panicked(panic_message(panic)))?;
                Arc::from(built)
            }
            ExtensionSource::Library(path) => {
                let (library, extension) = loader::load_library(&path)?;
                if let Ok(mut libraries) = self.libraries.lock() {
                    libraries.push(library);
                } else {
                    std::mem::forget(library);
                }
                Arc::from(extension)
            }
        };

        let mut commands = CommandSet::new(extension.name());
        match catch_unwind(AssertUnwindSafe(|| extension.setup(&mut commands))) {
            Ok(Ok(())) => Ok(LoadedExtension {
                identifier: identifier.to_string(),
                extension,
                commands,
            }),
            Ok(Err(e)) => Err(e),
            Err(panic) => Err(ExtensionError::Panicked(panic_message(panic))),
        }
    }

    /// Build a fresh registry: the core set first, then each loaded extension.
    /// An extension whose names collide is dropped and marked failed; a collision
    /// inside the core set is an error.
    pub fn finalize(&self, core: &CommandSet) -> Result<CommandRegistry, RegistryError> {
        let mut registry = CommandRegistry::new();
        registry.register_set(core)?;

        let mut rejected = Vec::new();
        {
            let mut loaded = match self.loaded.write() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            loaded.retain(|ext| match registry.register_set(&ext.commands) {
                Ok(()) => true,
                Err(e) => {
                    warn!("LoadError: {}: {}", ext.identifier, e);
                    rejected.push((ext.identifier.clone(), ExtensionError::Registry(e)));
                    false
                }
            });
        }

        if !rejected.is_empty() {
            if let Ok(mut results) = self.results.write() {
                for (identifier, error) in &rejected {
                    match results.iter_mut().find(|r| &r.identifier == identifier) {
                        Some(result) => *result = LoadResult::failed(identifier, error),
                        None => results.push(LoadResult::failed(identifier, error)),
                    }
                }
            }
        }
        Ok(registry)
    }

    /// Results of the most recent load pass
    pub fn results(&self) -> Vec<LoadResult> {
        self.results.read().map(|r| r.clone()).unwrap_or_default()
    }

    /// Identifiers of the currently loaded extensions
    pub fn loaded(&self) -> Vec<String> {
        self.loaded
            .read()
            .map(|l| l.iter().map(|e| e.identifier.clone()).collect())
            .unwrap_or_default()
    }
}

fn panic_message(panic: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::Command;

    struct Simple {
        name: &'static str,
        commands: &'static [&'static str],
    }

    impl Extension for Simple {
        fn name(&self) -> &str {
            self.name
        }

        fn setup(&self, commands: &mut CommandSet) -> Result<(), ExtensionError> {
            for name in self.commands {
                commands.add(Command::new(*name).with_handler(|_ctx, _args| async { Ok(()) }))?;
            }
            Ok(())
        }
    }

    struct Broken;

    impl Extension for Broken {
        fn name(&self) -> &str {
            "broken"
        }

        fn setup(&self, _commands: &mut CommandSet) -> Result<(), ExtensionError> {
            Err(ExtensionError::Setup("missing api key".to_string()))
        }
    }

    struct Panicky;

    impl Extension for Panicky {
        fn name(&self) -> &str {
            "panicky"
        }

        fn setup(&self, _commands: &mut CommandSet) -> Result<(), ExtensionError> {
            panic!("boom")
        }
    }

    fn factory<E: Extension + 'static>(make: fn() -> E) -> ExtensionFactory {
        Arc::new(move || Box::new(make()) as Box<dyn Extension>)
    }

    fn core() -> CommandSet {
        let mut set = CommandSet::new("core");
        set.add(Command::new("ping").with_handler(|_ctx, _args| async { Ok(()) }))
            .unwrap();
        set
    }

    #[test]
    fn test_failure_isolated_between_builtins() {
        let registry = ExtensionRegistry::new(None)
            .with_builtin("alpha", factory(|| Simple { name: "alpha", commands: &["a1", "a2"] }))
            .with_builtin("broken", factory(|| Broken))
            .with_builtin("gamma", factory(|| Simple { name: "gamma", commands: &["g1"] }))
            .enable("alpha")
            .enable("broken")
            .enable("gamma");

        let results = registry.load_all();
        assert_eq!(results.len(), 3);
        assert!(results[0].is_loaded());
        assert!(matches!(&results[1].state, LoadState::Failed { kind, .. } if kind == "SetupError"));
        assert!(results[2].is_loaded());

        let commands = registry.finalize(&core()).unwrap();
        for name in ["ping", "a1", "a2", "g1"] {
            assert!(commands.resolve(name).is_some(), "{name} should be registered");
        }
    }

    #[test]
    fn test_panicking_setup_is_contained() {
        let registry = ExtensionRegistry::new(None)
            .with_builtin("panicky", factory(|| Panicky))
            .enable("panicky");
        let results = registry.load_all();
        assert!(matches!(&results[0].state, LoadState::Failed { kind, message }
            if kind == "Panic" && message.contains("boom")));
        assert!(registry.loaded().is_empty());
    }

    #[test]
    fn test_unknown_builtin_reported() {
        let registry = ExtensionRegistry::new(None).enable("ghost");
        let results = registry.load_all();
        assert!(matches!(&results[0].state, LoadState::Failed { kind, .. } if kind == "UnknownBuiltin"));
    }

    #[test]
    fn test_colliding_extension_dropped_at_finalize() {
        let registry = ExtensionRegistry::new(None)
            .with_builtin("clash", factory(|| Simple { name: "clash", commands: &["ping"] }))
            .with_builtin("fine", factory(|| Simple { name: "fine", commands: &["fine"] }))
            .enable("clash")
            .enable("fine");
        registry.load_all();

        let commands = registry.finalize(&core()).unwrap();
        assert_eq!(commands.resolve("ping").unwrap().category, "core");
        assert!(commands.resolve("fine").is_some());
        assert_eq!(registry.loaded(), vec!["fine".to_string()]);
        let clash = registry
            .results()
            .into_iter()
            .find(|r| r.identifier == "clash")
            .unwrap();
        assert!(matches!(clash.state, LoadState::Failed { ref kind, .. } if kind == "DuplicateName"));
    }

    #[test]
    fn test_directory_manifests() {
        let dir = tempfile::tempdir().unwrap();
        let write = |name: &str, manifest: &str| {
            let path = dir.path().join(name);
            std::fs::create_dir(&path).unwrap();
            std::fs::write(path.join("extension.yaml"), manifest).unwrap();
        };
        write("one", "name: one\nversion: 0.1.0\nbuiltin: one\n");
        write("two", "name: two\nversion: [not, a, string\n");
        write("three", "name: three\nversion: 0.1.0\nbuiltin: three\n");

        let registry = ExtensionRegistry::new(Some(dir.path().to_path_buf()))
            .with_builtin("one", factory(|| Simple { name: "one", commands: &["first"] }))
            .with_builtin("three", factory(|| Simple { name: "three", commands: &["third"] }));

        let results = registry.load_all();
        let loaded: Vec<_> = results.iter().filter(|r| r.is_loaded()).map(|r| r.identifier.as_str()).collect();
        assert_eq!(loaded, vec!["one", "three"]);
        assert!(matches!(
            &results.iter().find(|r| r.identifier == "two").unwrap().state,
            LoadState::Failed { kind, .. } if kind == "ManifestError"
        ));

        let commands = registry.finalize(&core()).unwrap();
        assert!(commands.resolve("first").is_some());
        assert!(commands.resolve("third").is_some());
    }

    #[test]
    fn test_reload_replaces_loaded_set() {
        let registry = ExtensionRegistry::new(None)
            .with_builtin("alpha", factory(|| Simple { name: "alpha", commands: &["a1"] }))
            .enable("alpha");
        registry.load_all();
        registry.load_all();
        assert_eq!(registry.loaded(), vec!["alpha".to_string()]);
        assert!(registry.finalize(&core()).is_ok());
    }
}
