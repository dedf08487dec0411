use async_trait::async_trait;
use std::time::Duration;

use crate::application::errors::GatewayError;
use crate::domain::entities::{Message, Outbound, User};

/// Gateway trait - abstraction over the real-time chat transport
#[async_trait]
pub trait Gateway: Send + Sync {
    /// Send a reply to a channel, returning the new message id
    async fn send_message(&self, channel_id: &str, message: Outbound) -> Result<String, GatewayError>;

    /// React to a message with a marker
    async fn add_reaction(&self, channel_id: &str, message_id: &str, marker: &str) -> Result<(), GatewayError>;

    /// Custom emojis of a guild. Fails if the guild is not accessible.
    async fn guild_emojis(&self, guild_id: &str) -> Result<Vec<Emoji>, GatewayError>;

    /// Average heartbeat latency
    fn latency(&self) -> Duration;

    /// The bot's own account, known once connected
    fn current_user(&self) -> User;

    /// Counts from the gateway's cache
    fn cache_stats(&self) -> CacheStats;
}

/// Events delivered by the gateway
#[derive(Debug, Clone)]
pub enum GatewayEvent {
    Connect,
    ShardReady(u64),
    Ready,
    Disconnect,
    Message(Message),
}

/// A guild's custom emoji
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Emoji {
    pub id: String,
    pub name: String,
    pub guild_id: String,
}

/// Cache counts reported by the gateway
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub guilds: usize,
    pub channels: usize,
    pub users: usize,
    pub online_users: usize,
}
