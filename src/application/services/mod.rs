//! Application services - Core commands, eval sandbox and shared helpers

pub mod core_commands;
pub mod eval;
pub mod tags;
pub mod text;
pub mod usage;

pub use core_commands::core_commands;
pub use eval::{EvalOutcome, EvalSandbox, EvalSettings};
pub use usage::UsageCounters;
