use super::{Permissions, User};
use chrono::{DateTime, Utc};

/// An inbound chat message delivered by the gateway
#[derive(Debug, Clone)]
pub struct Message {
    pub id: String,
    pub channel_id: String,
    /// Originating scope; `None` for direct messages
    pub guild_id: Option<String>,
    pub author: User,
    /// Permissions the author holds in the originating scope
    pub author_permissions: Permissions,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    pub fn new(channel_id: impl Into<String>, author: User, content: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            channel_id: channel_id.into(),
            guild_id: None,
            author,
            author_permissions: Permissions::none(),
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn in_guild(mut self, guild_id: impl Into<String>) -> Self {
        self.guild_id = Some(guild_id.into());
        self
    }

    pub fn with_permissions(mut self, permissions: Permissions) -> Self {
        self.author_permissions = permissions;
        self
    }
}

/// A field of an embed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

/// Structured rich reply
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Embed {
    pub title: Option<String>,
    pub description: Option<String>,
    pub color: Option<u32>,
    pub fields: Vec<EmbedField>,
    pub footer: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
}

impl Embed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn color(mut self, color: u32) -> Self {
        self.color = Some(color);
        self
    }

    pub fn field(mut self, name: impl Into<String>, value: impl ToString, inline: bool) -> Self {
        self.fields.push(EmbedField {
            name: name.into(),
            value: value.to_string(),
            inline,
        });
        self
    }

    pub fn footer(mut self, footer: impl Into<String>) -> Self {
        self.footer = Some(footer.into());
        self
    }

    pub fn timestamp(mut self, at: DateTime<Utc>) -> Self {
        self.timestamp = Some(at);
        self
    }

    /// Apply `f` to every text the embed carries
    pub fn map_text(mut self, f: impl Fn(&str) -> String) -> Self {
        self.title = self.title.as_deref().map(&f);
        self.description = self.description.as_deref().map(&f);
        self.footer = self.footer.as_deref().map(&f);
        for field in &mut self.fields {
            field.name = f(&field.name);
            field.value = f(&field.value);
        }
        self
    }
}

/// Outbound reply: plain text, an embed, or both
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Outbound {
    pub content: Option<String>,
    pub embed: Option<Embed>,
}

impl Outbound {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            embed: None,
        }
    }

    pub fn embed(embed: Embed) -> Self {
        Self {
            content: None,
            embed: Some(embed),
        }
    }
}

impl From<String> for Outbound {
    fn from(value: String) -> Self {
        Outbound::text(value)
    }
}

impl From<&str> for Outbound {
    fn from(value: &str) -> Self {
        Outbound::text(value)
    }
}

impl From<Embed> for Outbound {
    fn from(value: Embed) -> Self {
        Outbound::embed(value)
    }
}
