//! Message handling - Event-driven message processing

pub mod checks;
pub mod context;
pub mod dispatcher;
pub mod parser;

pub use context::{Context, ContextBuilder};
pub use dispatcher::{Dispatcher, Invocation};
pub use parser::{MessageParser, ParsedInvocation};
