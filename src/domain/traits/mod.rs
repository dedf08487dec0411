//! Domain traits - Abstractions for infrastructure implementations

pub mod gateway;
pub mod store;

pub use gateway::{CacheStats, Emoji, Gateway, GatewayEvent};
pub use store::{ConfigStore, DocumentUpdate};
