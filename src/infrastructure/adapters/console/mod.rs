//! Console adapter for development/testing
//!
//! Pretends to be a single-shard gateway: every stdin line becomes a message from
//! the configured console user, and replies are printed to stdout.

use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use crate::application::errors::GatewayError;
use crate::domain::entities::{Message, Outbound, Permissions, User};
use crate::domain::traits::{CacheStats, Emoji, Gateway, GatewayEvent};
use crate::infrastructure::config::ConsoleConfig;

/// Console gateway for local development
pub struct ConsoleGateway {
    me: User,
    config: ConsoleConfig,
    next_id: AtomicU64,
}

impl ConsoleGateway {
    pub fn new(bot_name: &str, config: ConsoleConfig) -> Self {
        Self {
            me: User::new("1").with_username(bot_name).bot(),
            config,
            next_id: AtomicU64::new(1),
        }
    }

    fn author(&self) -> User {
        User::new(self.config.user_id.clone()).with_username("console")
    }

    /// Turn one typed line into an inbound message
    pub fn message(&self, line: &str) -> Message {
        let mut message = Message::new(self.config.channel_id.clone(), self.author(), line)
            .with_permissions(Permissions::ADMINISTRATOR);
        if let Some(guild_id) = &self.config.guild_id {
            message = message.in_guild(guild_id.clone());
        }
        message
    }

    /// Emit the connect sequence, then one message per stdin line until EOF
    pub async fn run(&self, events: mpsc::Sender<GatewayEvent>) -> Result<(), GatewayError> {
        tracing::info!("Starting console gateway (dev mode)");
        for event in [GatewayEvent::Connect, GatewayEvent::ShardReady(0), GatewayEvent::Ready] {
            events.send(event).await.map_err(|_| GatewayError::Closed)?;
        }

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            let line = match lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => break,
                Err(e) => return Err(GatewayError::Network(e.to_string())),
            };
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if matches!(line, "/quit" | "/exit") {
                break;
            }
            events
                .send(GatewayEvent::Message(self.message(line)))
                .await
                .map_err(|_| GatewayError::Closed)?;
        }

        let _ = events.send(GatewayEvent::Disconnect).await;
        Ok(())
    }

    fn render(message: &Outbound) -> String {
        let mut out = Vec::new();
        if let Some(content) = &message.content {
            out.push(content.clone());
        }
        if let Some(embed) = &message.embed {
            if let Some(title) = &embed.title {
                out.push(format!("== {} ==", title));
            }
            if let Some(description) = &embed.description {
                out.push(description.clone());
            }
            for field in &embed.fields {
                out.push(format!("  {}: {}", field.name, field.value));
            }
            if let Some(footer) = &embed.footer {
                out.push(format!("-- {}", footer));
            }
        }
        out.join("\n")
    }
}

#[async_trait]
impl Gateway for ConsoleGateway {
    async fn send_message(&self, _channel_id: &str, message: Outbound) -> Result<String, GatewayError> {
        println!("[BOT] {}", Self::render(&message));
        Ok(format!("console-{}", self.next_id.fetch_add(1, Ordering::Relaxed)))
    }

    async fn add_reaction(&self, _channel_id: &str, message_id: &str, marker: &str) -> Result<(), GatewayError> {
        println!("[BOT] reacted {} to {}", marker, message_id);
        Ok(())
    }

    async fn guild_emojis(&self, guild_id: &str) -> Result<Vec<Emoji>, GatewayError> {
        match self.config.guild_id.as_deref() {
            Some(id) if id == guild_id => Ok(Vec::new()),
            _ => Err(GatewayError::NotFound(format!("guild {}", guild_id))),
        }
    }

    // no heartbeat on a local pipe
    fn latency(&self) -> Duration {
        Duration::ZERO
    }

    fn current_user(&self) -> User {
        self.me.clone()
    }

    fn cache_stats(&self) -> CacheStats {
        CacheStats {
            guilds: usize::from(self.config.guild_id.is_some()),
            channels: 1,
            users: 2,
            online_users: 2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_from_line() {
        let gateway = ConsoleGateway::new("statsbot", ConsoleConfig::default());
        let message = gateway.message("#ping");
        assert_eq!(message.content, "#ping");
        assert_eq!(message.guild_id.as_deref(), Some("console-guild"));
        assert!(message.author_permissions.contains(Permissions::MANAGE_GUILD));
        assert!(!message.author.is_bot);
    }

    #[test]
    fn test_render_embed() {
        let embed = crate::domain::entities::Embed::new()
            .title("Stats")
            .field("Guilds", 1, true);
        let rendered = ConsoleGateway::render(&Outbound::embed(embed));
        assert_eq!(rendered, "== Stats ==\n  Guilds: 1");
    }

    #[tokio::test]
    async fn test_unknown_emoji_guild() {
        let gateway = ConsoleGateway::new("statsbot", ConsoleConfig::default());
        assert!(gateway.guild_emojis("console-guild").await.unwrap().is_empty());
        assert!(gateway.guild_emojis("other").await.is_err());
    }
}
