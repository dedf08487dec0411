//! Domain layer - Core business objects
//! 
//! This layer contains:
//! - Entities: Core business objects (User, Message, Command, SessionState)
//! - Traits: Abstractions for collaborators (Gateway, ConfigStore)

pub mod entities;
pub mod traits;
