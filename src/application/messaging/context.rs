//! Invocation context and its builder

use std::sync::Arc;

use serde_json::Value;

use crate::application::errors::CommandError;
use crate::application::services::text::{paginate, redact, MAX_MESSAGE_LEN};
use crate::application::state::BotState;
use crate::domain::entities::{Message, Outbound, User};

/// Per-invocation execution context. Built for one inbound message and owned by
/// the call that handles it.
#[derive(Clone)]
pub struct Context {
    pub message: Message,
    /// The prefix the message matched, if any
    pub prefix: Option<String>,
    /// The token the command was invoked with (name or alias)
    pub invoked_with: Option<String>,
    pub state: Arc<BotState>,
}

impl Context {
    pub fn author(&self) -> &User {
        &self.message.author
    }

    pub fn channel_id(&self) -> &str {
        &self.message.channel_id
    }

    pub fn guild_id(&self) -> Option<&str> {
        self.message.guild_id.as_deref()
    }

    pub fn is_operator(&self) -> bool {
        self.state.is_operator(&self.message.author.id)
    }

    /// Whether the message matched one of the bot's mention prefixes
    pub fn invoked_by_mention(&self) -> bool {
        let me = self.state.gateway.current_user();
        match &self.prefix {
            Some(prefix) => {
                let prefix = prefix.trim_end();
                prefix == me.mention() || prefix == me.nick_mention()
            }
            None => false,
        }
    }

    /// The scope's text prefix: the configured one or the default
    pub async fn text_prefix(&self) -> String {
        text_prefix(&self.state, self.guild_id()).await
    }

    /// Send a reply to the invoking channel. The live token is redacted from all text.
    pub async fn send(&self, message: impl Into<Outbound>) -> Result<String, CommandError> {
        let token = self.state.settings.token.as_str();
        let mut message = message.into();
        message.content = message.content.map(|c| redact(&c, token).into_owned());
        message.embed = message
            .embed
            .map(|e| e.map_text(|t| redact(t, token).into_owned()));
        let id = self
            .state
            .gateway
            .send_message(self.channel_id(), message)
            .await?;
        Ok(id)
    }

    /// React to a message in the invoking channel
    pub async fn react(&self, message_id: &str, marker: &str) -> Result<(), CommandError> {
        self.state
            .gateway
            .add_reaction(self.channel_id(), message_id, marker)
            .await?;
        Ok(())
    }

    /// Split text into chunks that fit a single message
    pub fn paginate(&self, text: &str) -> Vec<String> {
        paginate(text, MAX_MESSAGE_LEN)
    }

    pub async fn load_json(&self, name: &str) -> Result<Value, CommandError> {
        Ok(self.state.store.load_document(name).await?)
    }

    pub async fn save_json(&self, name: &str, data: &Value) -> Result<(), CommandError> {
        Ok(self.state.store.save_document(name, data).await?)
    }

    /// Read-modify-write a document. The write happens only if the read succeeded.
    pub async fn update_json<F>(&self, name: &str, mutate: F) -> Result<Value, CommandError>
    where
        F: FnOnce(&mut Value) + Send,
    {
        Ok(self
            .state
            .store
            .update_document(name, Box::new(mutate))
            .await?)
    }
}

async fn text_prefix(state: &BotState, guild_id: Option<&str>) -> String {
    let Some(guild_id) = guild_id else {
        return state.settings.default_prefix.clone();
    };
    match state.store.get(guild_id).await {
        Ok(Some(prefix)) => prefix,
        Ok(None) => state.settings.default_prefix.clone(),
        Err(e) => {
            tracing::warn!("Failed to read prefix for guild {}: {}", guild_id, e);
            state.settings.default_prefix.clone()
        }
    }
}

/// Builds contexts, resolving prefixes against current config on every call
#[derive(Clone)]
pub struct ContextBuilder {
    state: Arc<BotState>,
}

impl ContextBuilder {
    pub fn new(state: Arc<BotState>) -> Self {
        Self { state }
    }

    /// Every prefix accepted in a scope: the two mention forms, then the text prefix
    pub async fn prefixes(&self, guild_id: Option<&str>) -> Vec<String> {
        let me = self.state.gateway.current_user();
        vec![
            format!("{} ", me.mention()),
            format!("{} ", me.nick_mention()),
            text_prefix(&self.state, guild_id).await,
        ]
    }

    pub async fn build(&self, message: Message) -> Context {
        let prefixes = self.prefixes(message.guild_id.as_deref()).await;
        let prefix = prefixes
            .into_iter()
            .find(|p| !p.is_empty() && message.content.starts_with(p.as_str()));
        Context {
            message,
            prefix,
            invoked_with: None,
            state: Arc::clone(&self.state),
        }
    }
}
