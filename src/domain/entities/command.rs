use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::application::errors::{CommandError, RegistryError};
use crate::application::messaging::Context;

/// Boxed future returned by command handlers
pub type HandlerFuture = Pin<Box<dyn Future<Output = Result<(), CommandError>> + Send>>;

/// Command handler function type. Receives the invocation context and the raw argument string.
pub type CommandHandler = Arc<dyn Fn(Context, String) -> HandlerFuture + Send + Sync>;

/// Permission predicate evaluated before the handler runs
pub type Check = Arc<dyn Fn(&Context) -> Result<(), CommandError> + Send + Sync>;

/// Category of commands declared by the bot itself
pub const CORE_CATEGORY: &str = "core";

/// Represents a bot command
#[derive(Clone)]
pub struct Command {
    pub name: String,
    pub description: Option<String>,
    pub aliases: Vec<String>,
    pub usage: Option<String>,
    /// Declaring extension, or [`CORE_CATEGORY`]
    pub category: String,
    pub hidden: bool,
    pub handler: Option<CommandHandler>,
    pub checks: Vec<Check>,
}

impl Command {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            aliases: Vec::new(),
            usage: None,
            category: CORE_CATEGORY.to_string(),
            hidden: false,
            handler: None,
            checks: Vec::new(),
        }
    }

    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    /// Argument usage, e.g. `<prefix>`
    pub fn with_usage(mut self, usage: impl Into<String>) -> Self {
        self.usage = Some(usage.into());
        self
    }

    pub fn with_check(mut self, check: Check) -> Self {
        self.checks.push(check);
        self
    }

    /// Hide from help listings
    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    pub fn with_handler<F, Fut>(mut self, handler: F) -> Self
    where
        F: Fn(Context, String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), CommandError>> + Send + 'static,
    {
        self.handler = Some(Arc::new(move |ctx, args| Box::pin(handler(ctx, args))));
        self
    }

    /// Name followed by usage, as shown in help
    pub fn signature(&self) -> String {
        self.signature_as(&self.name)
    }

    /// Usage line spelled with the name or alias the caller typed
    pub fn signature_as(&self, invoked: &str) -> String {
        match &self.usage {
            Some(usage) => format!("{} {}", invoked, usage),
            None => invoked.to_string(),
        }
    }

    /// First line of the description
    pub fn short_doc(&self) -> &str {
        self.description
            .as_deref()
            .and_then(|d| d.lines().next())
            .unwrap_or("")
    }

    /// Every token this command answers to
    pub fn names(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.name.as_str()).chain(self.aliases.iter().map(String::as_str))
    }

    /// Run every check against the context
    pub fn can_run(&self, ctx: &Context) -> Result<(), CommandError> {
        self.checks.iter().try_for_each(|check| check(ctx))
    }

    /// Invoke the handler
    pub async fn invoke(&self, ctx: Context, args: String) -> Result<(), CommandError> {
        match &self.handler {
            Some(handler) => handler(ctx, args).await,
            None => Err(CommandError::Failed(format!(
                "Command {} not implemented",
                self.name
            ))),
        }
    }
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Command")
            .field("name", &self.name)
            .field("aliases", &self.aliases)
            .field("category", &self.category)
            .field("hidden", &self.hidden)
            .finish_non_exhaustive()
    }
}

/// Commands declared by one extension (or the core), staged before they reach a registry
#[derive(Clone, Debug)]
pub struct CommandSet {
    category: String,
    commands: Vec<Arc<Command>>,
}

impl CommandSet {
    pub fn new(category: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            commands: Vec::new(),
        }
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    /// Stage a command. Fails if a name or alias collides with one already staged.
    pub fn add(&mut self, mut command: Command) -> Result<(), RegistryError> {
        for token in command.names() {
            if self.commands.iter().any(|c| c.names().any(|n| n == token)) {
                return Err(RegistryError::DuplicateName(token.to_string()));
            }
        }
        command.category = self.category.clone();
        self.commands.push(Arc::new(command));
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Command>> {
        self.commands.iter()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

/// Command registry for managing available commands.
///
/// Every name and alias maps directly to its command, so lookups are a single hash probe.
#[derive(Default, Debug)]
pub struct CommandRegistry {
    lookup: HashMap<String, Arc<Command>>,
    commands: Vec<Arc<Command>>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, command: Command) -> Result<(), RegistryError> {
        self.insert(Arc::new(command))
    }

    /// Register a whole set, or nothing if any token collides
    pub fn register_set(&mut self, set: &CommandSet) -> Result<(), RegistryError> {
        let mut seen = std::collections::HashSet::new();
        for command in set.iter() {
            for token in command.names() {
                if self.lookup.contains_key(token) || !seen.insert(token) {
                    return Err(RegistryError::DuplicateName(token.to_string()));
                }
            }
        }
        for command in set.iter() {
            self.insert(Arc::clone(command))?;
        }
        Ok(())
    }

    fn insert(&mut self, command: Arc<Command>) -> Result<(), RegistryError> {
        let mut seen = std::collections::HashSet::new();
        for token in command.names() {
            if self.lookup.contains_key(token) || !seen.insert(token) {
                return Err(RegistryError::DuplicateName(token.to_string()));
            }
        }
        for token in command.names() {
            self.lookup.insert(token.to_string(), Arc::clone(&command));
        }
        self.commands.push(command);
        Ok(())
    }

    /// Case-sensitive lookup by name or alias
    pub fn resolve(&self, token: &str) -> Option<Arc<Command>> {
        self.lookup.get(token).cloned()
    }

    pub fn all(&self) -> impl Iterator<Item = &Arc<Command>> {
        self.commands.iter()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop(name: &str) -> Command {
        Command::new(name).with_handler(|_ctx, _args| async { Ok(()) })
    }

    #[test]
    fn test_resolve_by_name_and_alias() {
        let mut registry = CommandRegistry::new();
        registry.register(noop("bot").with_alias("about")).unwrap();

        assert_eq!(registry.resolve("bot").unwrap().name, "bot");
        assert_eq!(registry.resolve("about").unwrap().name, "bot");
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_resolve_is_case_sensitive() {
        let mut registry = CommandRegistry::new();
        registry.register(noop("ping")).unwrap();
        assert!(registry.resolve("PING").is_none());
        assert!(registry.resolve("pin").is_none());
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let mut registry = CommandRegistry::new();
        registry.register(noop("ping")).unwrap();
        let err = registry.register(noop("ping")).unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateName(ref n) if n == "ping"));
    }

    #[test]
    fn test_alias_colliding_with_name_rejected() {
        let mut registry = CommandRegistry::new();
        registry.register(noop("help")).unwrap();
        let err = registry.register(noop("info").with_alias("help")).unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateName(ref n) if n == "help"));
        // nothing from the rejected command leaks in
        assert!(registry.resolve("info").is_none());
    }

    #[test]
    fn test_self_colliding_alias_rejected() {
        let mut registry = CommandRegistry::new();
        assert!(registry.register(noop("tag").with_alias("tag")).is_err());
    }

    #[test]
    fn test_register_set_is_atomic() {
        let mut registry = CommandRegistry::new();
        registry.register(noop("ping")).unwrap();

        let mut set = CommandSet::new("extra");
        set.add(noop("usage")).unwrap();
        set.add(noop("pong").with_alias("ping")).unwrap();

        assert!(registry.register_set(&set).is_err());
        assert!(registry.resolve("usage").is_none());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_command_set_tags_category() {
        let mut set = CommandSet::new("tags");
        set.add(noop("save")).unwrap();
        assert!(set.add(noop("other").with_alias("save")).is_err());
        assert_eq!(set.iter().next().unwrap().category, "tags");
    }

    #[test]
    fn test_signature_and_short_doc() {
        let cmd = noop("prefix")
            .with_usage("<prefix>")
            .with_description("Change the bot prefix for your server.\nRequires Manage Server.");
        assert_eq!(cmd.signature(), "prefix <prefix>");
        assert_eq!(cmd.signature_as("setprefix"), "setprefix <prefix>");
        assert_eq!(noop("ping").signature_as("pong"), "pong");
        assert_eq!(cmd.short_doc(), "Change the bot prefix for your server.");
    }
}
