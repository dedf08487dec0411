//! Application layer errors

use thiserror::Error;

/// General bot errors
#[derive(Error, Debug)]
pub enum BotError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("Extension error: {0}")]
    Extension(#[from] ExtensionError),

    #[error("Command '{command}' failed: {message}")]
    Handler { command: String, message: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Command execution errors, classified by the dispatcher
#[derive(Error, Debug)]
pub enum CommandError {
    /// A player tag contained characters outside the tag alphabet
    #[error("Invalid tag: {0}")]
    InvalidTag(String),

    #[error("Missing argument: {0}")]
    MissingArgument(String),

    #[error("This command cannot be used in private messages")]
    GuildOnly,

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Execution failed: {0}")]
    Failed(String),
}

/// How the dispatcher surfaces a command error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Recovered locally with a fixed explanation
    UserInput,
    /// Surfaced as a denial message
    Permission,
    /// Escalated to the event loop
    Fault,
}

impl CommandError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CommandError::InvalidTag(_)
            | CommandError::MissingArgument(_)
            | CommandError::GuildOnly => ErrorKind::UserInput,
            CommandError::PermissionDenied(_) => ErrorKind::Permission,
            CommandError::Gateway(_) | CommandError::Storage(_) | CommandError::Failed(_) => {
                ErrorKind::Fault
            }
        }
    }
}

/// Command registration errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Duplicate command name or alias: {0}")]
    DuplicateName(String),
}

/// Extension loading errors, isolated per extension
#[derive(Error, Debug)]
pub enum ExtensionError {
    #[error("Manifest error: {0}")]
    Manifest(String),

    #[error("Library error: {0}")]
    Library(String),

    #[error("Unknown builtin extension: {0}")]
    UnknownBuiltin(String),

    #[error("Setup failed: {0}")]
    Setup(String),

    #[error("Setup panicked: {0}")]
    Panicked(String),

    #[error("Registration failed: {0}")]
    Registry(#[from] RegistryError),
}

impl ExtensionError {
    /// Short kind name reported in load results
    pub fn kind(&self) -> &'static str {
        match self {
            ExtensionError::Manifest(_) => "ManifestError",
            ExtensionError::Library(_) => "LibraryError",
            ExtensionError::UnknownBuiltin(_) => "UnknownBuiltin",
            ExtensionError::Setup(_) => "SetupError",
            ExtensionError::Panicked(_) => "Panic",
            ExtensionError::Registry(_) => "DuplicateName",
        }
    }
}

/// Gateway transport errors
#[derive(Error, Debug, Clone)]
pub enum GatewayError {
    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Gateway closed")]
    Closed,
}

/// Storage errors
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value: {0}")]
    InvalidValue(String),

    #[error("Parse error: {0}")]
    Parse(String),
}
