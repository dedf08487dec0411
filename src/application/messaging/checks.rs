//! Reusable permission checks for commands

use std::sync::Arc;

use crate::application::errors::CommandError;
use crate::application::messaging::Context;
use crate::domain::entities::{Check, Permissions};

/// Require the author to hold `required` in the originating guild
pub fn has_permissions(required: Permissions, label: &'static str) -> Check {
    Arc::new(move |ctx: &Context| {
        if ctx.guild_id().is_none() {
            return Err(CommandError::GuildOnly);
        }
        if ctx.message.author_permissions.contains(required) {
            Ok(())
        } else {
            Err(CommandError::PermissionDenied(format!(
                "you need the {} permission",
                label
            )))
        }
    })
}

/// Require the author to be on the operator allow-list
pub fn is_operator() -> Check {
    Arc::new(|ctx: &Context| {
        if ctx.is_operator() {
            Ok(())
        } else {
            Err(CommandError::PermissionDenied(
                "this command is restricted to bot operators".to_string(),
            ))
        }
    })
}
