//! statsbot - a command bot for chat servers
//!
//! Commands are declared by the core and by extensions, collected into a registry when
//! the gateway connects, and dispatched per inbound message with a freshly built context.

pub mod application;
pub mod domain;
pub mod extensions;
pub mod infrastructure;
