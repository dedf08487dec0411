use std::fmt;

/// Represents a chat account seen by the bot
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct User {
    pub id: String,
    pub username: Option<String>,
    pub discriminator: Option<String>,
    pub is_bot: bool,
}

impl User {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            username: None,
            discriminator: None,
            is_bot: false,
        }
    }

    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    pub fn with_discriminator(mut self, discriminator: impl Into<String>) -> Self {
        self.discriminator = Some(discriminator.into());
        self
    }

    /// Mark the account as automated
    pub fn bot(mut self) -> Self {
        self.is_bot = true;
        self
    }

    /// Plain mention form, `<@ID>`
    pub fn mention(&self) -> String {
        format!("<@{}>", self.id)
    }

    /// Nickname mention form, `<@!ID>`
    pub fn nick_mention(&self) -> String {
        format!("<@!{}>", self.id)
    }

    pub fn display_name(&self) -> String {
        match (&self.username, &self.discriminator) {
            (Some(name), Some(tag)) => format!("{}#{}", name, tag),
            (Some(name), None) => name.clone(),
            _ => self.id.clone(),
        }
    }
}

impl fmt::Display for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mention_forms() {
        let user = User::new("42");
        assert_eq!(user.mention(), "<@42>");
        assert_eq!(user.nick_mention(), "<@!42>");
    }

    #[test]
    fn test_display_name_falls_back_to_id() {
        assert_eq!(User::new("7").display_name(), "7");
        let named = User::new("7").with_username("verix").with_discriminator("7220");
        assert_eq!(named.to_string(), "verix#7220");
    }
}
