//! In-memory gateway that records everything sent through it

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::application::errors::GatewayError;
use crate::domain::entities::{Outbound, User};
use crate::domain::traits::{CacheStats, Emoji, Gateway};

/// A message sent through the gateway
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub id: String,
    pub channel_id: String,
    pub message: Outbound,
}

impl SentMessage {
    /// Text content, or the embed description when there is none
    pub fn text(&self) -> String {
        match (&self.message.content, &self.message.embed) {
            (Some(content), _) => content.clone(),
            (None, Some(embed)) => embed.description.clone().unwrap_or_default(),
            (None, None) => String::new(),
        }
    }
}

/// A reaction added through the gateway
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reaction {
    pub channel_id: String,
    pub message_id: String,
    pub marker: String,
}

/// Recording gateway for tests and dry runs
pub struct MemoryGateway {
    me: User,
    latency: Duration,
    forbid_embeds: AtomicBool,
    emojis: HashMap<String, Vec<Emoji>>,
    stats: CacheStats,
    next_id: AtomicU64,
    sent: Mutex<Vec<SentMessage>>,
    reactions: Mutex<Vec<Reaction>>,
}

impl MemoryGateway {
    pub fn new(me: User) -> Self {
        Self {
            me,
            latency: Duration::ZERO,
            forbid_embeds: AtomicBool::new(false),
            emojis: HashMap::new(),
            stats: CacheStats::default(),
            next_id: AtomicU64::new(1),
            sent: Mutex::new(Vec::new()),
            reactions: Mutex::new(Vec::new()),
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Make a guild's emojis accessible; guilds never added are inaccessible
    pub fn with_guild_emojis(mut self, guild_id: impl Into<String>, emojis: Vec<Emoji>) -> Self {
        self.emojis.insert(guild_id.into(), emojis);
        self
    }

    pub fn with_stats(mut self, stats: CacheStats) -> Self {
        self.stats = stats;
        self
    }

    /// Reject embeds the way a channel without the embed permission does
    pub fn forbid_embeds(&self, forbid: bool) {
        self.forbid_embeds.store(forbid, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }

    pub fn reactions(&self) -> Vec<Reaction> {
        self.reactions.lock().map(|r| r.clone()).unwrap_or_default()
    }

    pub fn clear(&self) {
        if let Ok(mut sent) = self.sent.lock() {
            sent.clear();
        }
        if let Ok(mut reactions) = self.reactions.lock() {
            reactions.clear();
        }
    }
}

#[async_trait]
impl Gateway for MemoryGateway {
    async fn send_message(&self, channel_id: &str, message: Outbound) -> Result<String, GatewayError> {
        if message.embed.is_some() && self.forbid_embeds.load(Ordering::SeqCst) {
            return Err(GatewayError::Forbidden("Missing Permissions: embed links".to_string()));
        }
        let id = format!("m{}", self.next_id.fetch_add(1, Ordering::Relaxed));
        let mut sent = self
            .sent
            .lock()
            .map_err(|_| GatewayError::Network("recorder poisoned".to_string()))?;
        sent.push(SentMessage {
            id: id.clone(),
            channel_id: channel_id.to_string(),
            message,
        });
        Ok(id)
    }

    async fn add_reaction(&self, channel_id: &str, message_id: &str, marker: &str) -> Result<(), GatewayError> {
        let mut reactions = self
            .reactions
            .lock()
            .map_err(|_| GatewayError::Network("recorder poisoned".to_string()))?;
        reactions.push(Reaction {
            channel_id: channel_id.to_string(),
            message_id: message_id.to_string(),
            marker: marker.to_string(),
        });
        Ok(())
    }

    async fn guild_emojis(&self, guild_id: &str) -> Result<Vec<Emoji>, GatewayError> {
        self.emojis
            .get(guild_id)
            .cloned()
            .ok_or_else(|| GatewayError::NotFound(format!("Unknown Guild {}", guild_id)))
    }

    fn latency(&self) -> Duration {
        self.latency
    }

    fn current_user(&self) -> User {
        self.me.clone()
    }

    fn cache_stats(&self) -> CacheStats {
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::Embed;

    #[tokio::test]
    async fn test_records_messages_and_reactions() {
        let gateway = MemoryGateway::new(User::new("9").bot());
        let id = gateway.send_message("c1", Outbound::text("hi")).await.unwrap();
        gateway.add_reaction("c1", &id, "x").await.unwrap();

        let sent = gateway.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].text(), "hi");
        assert_eq!(gateway.reactions()[0].message_id, id);
    }

    #[tokio::test]
    async fn test_forbidden_embeds() {
        let gateway = MemoryGateway::new(User::new("9").bot());
        gateway.forbid_embeds(true);
        let result = gateway.send_message("c1", Outbound::embed(Embed::new())).await;
        assert!(matches!(result, Err(GatewayError::Forbidden(_))));
        assert!(gateway.send_message("c1", Outbound::text("ok")).await.is_ok());
    }
}
