//! Domain entities - Core business objects

pub mod user;
pub mod message;
pub mod command;
pub mod permissions;
pub mod session;

pub use user::User;
pub use message::{Embed, EmbedField, Message, Outbound};
pub use command::{Check, Command, CommandHandler, CommandRegistry, CommandSet, CORE_CATEGORY};
pub use permissions::Permissions;
pub use session::{LifecycleSignal, SessionState};
