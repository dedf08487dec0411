//! Player tag commands

use serde_json::Value;

use super::trait_def::Extension;
use crate::application::errors::{CommandError, ExtensionError};
use crate::application::messaging::Context;
use crate::application::services::tags::{validate_tag, TAGS_DOCUMENT};
use crate::domain::entities::{Command, CommandSet};

pub struct TagsExtension;

impl Extension for TagsExtension {
    fn name(&self) -> &str {
        "tags"
    }

    fn description(&self) -> &str {
        "Save and recall player tags"
    }

    fn setup(&self, commands: &mut CommandSet) -> Result<(), ExtensionError> {
        commands.add(
            Command::new("save")
                .with_description("Saves your player tag.")
                .with_usage("<tag>")
                .with_handler(|ctx, args| async move { save(ctx, args).await }),
        )?;

        commands.add(
            Command::new("tag")
                .with_alias("mytag")
                .with_description("Shows your saved player tag.")
                .with_handler(|ctx, _args| async move { show(ctx).await }),
        )?;

        Ok(())
    }
}

async fn save(ctx: Context, args: String) -> Result<(), CommandError> {
    let raw = args.split_whitespace().next().unwrap_or("");
    if raw.is_empty() {
        return Err(CommandError::MissingArgument("tag".to_string()));
    }
    let tag = validate_tag(raw)?;
    let author = ctx.author().id.clone();

    let stored = tag.clone();
    ctx.update_json(TAGS_DOCUMENT, move |doc| {
        if !doc.is_object() {
            *doc = Value::Object(Default::default());
        }
        if let Value::Object(map) = doc {
            map.insert(author, Value::String(stored));
        }
    })
    .await?;

    ctx.send(format!("Your tag (#{}) has been successfully saved.", tag)).await?;
    Ok(())
}

async fn show(ctx: Context) -> Result<(), CommandError> {
    let tags = ctx.load_json(TAGS_DOCUMENT).await?;
    let reply = match tags.get(&ctx.author().id).and_then(Value::as_str) {
        Some(tag) => format!("Your saved tag is #{}.", tag),
        None => {
            let prefix = ctx.text_prefix().await;
            format!("You don't have a saved tag. Save one using `{}save <tag>`.", prefix)
        }
    };
    ctx.send(reply).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declares_commands() {
        let mut set = CommandSet::new("tags");
        TagsExtension.setup(&mut set).unwrap();
        let names: Vec<_> = set.iter().flat_map(|c| c.names().map(str::to_string).collect::<Vec<_>>()).collect();
        assert_eq!(names, vec!["save", "tag", "mytag"]);
    }
}
