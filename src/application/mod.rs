//! Application layer - Use cases and business logic
//! 
//! This layer contains:
//! - State: the explicitly owned process-wide bot state
//! - Services: core commands, eval sandbox, usage counters, text helpers
//! - Errors: Domain-specific errors
//! - Messaging: context building, parsing, dispatching

pub mod errors;
pub mod messaging;
pub mod services;
pub mod state;

pub use state::{BotSettings, BotState};
