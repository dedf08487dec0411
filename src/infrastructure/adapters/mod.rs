//! Gateway adapters

pub mod console;
pub mod memory;

pub use console::ConsoleGateway;
pub use memory::{MemoryGateway, Reaction, SentMessage};
