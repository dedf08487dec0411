//! Operator-only maintenance commands

use std::sync::Arc;

use super::trait_def::Extension;
use crate::application::errors::{CommandError, ExtensionError};
use crate::application::messaging::{checks, Context};
use crate::domain::entities::{Command, CommandSet};

pub struct AdminExtension;

impl Extension for AdminExtension {
    fn name(&self) -> &str {
        "admin"
    }

    fn description(&self) -> &str {
        "Extension reloads and usage statistics"
    }

    fn setup(&self, commands: &mut CommandSet) -> Result<(), ExtensionError> {
        commands.add(
            Command::new("reload")
                .with_description("Reloads every extension.")
                .hidden()
                .with_check(checks::is_operator())
                .with_handler(|ctx, _args| async move { reload(ctx).await }),
        )?;

        commands.add(
            Command::new("usage")
                .with_description("Shows how often each command has run.")
                .hidden()
                .with_check(checks::is_operator())
                .with_handler(|ctx, _args| async move { usage(ctx).await }),
        )?;

        Ok(())
    }
}

async fn reload(ctx: Context) -> Result<(), CommandError> {
    let state = Arc::clone(&ctx.state);
    let results = tokio::task::spawn_blocking(move || state.reload_extensions())
        .await
        .map_err(|e| CommandError::Failed(format!("reload task failed: {}", e)))?
        .map_err(|e| CommandError::Failed(e.to_string()))?;

    let report = if results.is_empty() {
        "No extensions configured.".to_string()
    } else {
        results
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n")
    };
    for page in ctx.paginate(&report) {
        ctx.send(page).await?;
    }
    Ok(())
}

/// One line per command, most used first
pub fn format_usage(mut counts: Vec<(String, u64)>, messages_seen: u64) -> String {
    counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    let mut out = format!("Messages seen: {}\n", messages_seen);
    if counts.is_empty() {
        out.push_str("No commands run yet.");
    }
    for (name, count) in counts {
        out.push_str(&format!("`{}`: {}\n", name, count));
    }
    out.trim_end().to_string()
}

async fn usage(ctx: Context) -> Result<(), CommandError> {
    let usage = &ctx.state.usage;
    let report = format_usage(usage.snapshot().into_iter().collect(), usage.messages_seen());
    for page in ctx.paginate(&report) {
        ctx.send(page).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declares_hidden_commands() {
        let mut set = CommandSet::new("admin");
        AdminExtension.setup(&mut set).unwrap();
        let names: Vec<_> = set.iter().map(|c| c.name.clone()).collect();
        assert_eq!(names, vec!["reload", "usage"]);
        assert!(set.iter().all(|c| c.hidden && c.category == "admin"));
    }

    #[test]
    fn test_format_usage_orders_by_count() {
        let report = format_usage(
            vec![("ping".to_string(), 2), ("help".to_string(), 5), ("bot".to_string(), 2)],
            40,
        );
        assert_eq!(report, "Messages seen: 40\n`help`: 5\n`bot`: 2\n`ping`: 2");
    }

    #[test]
    fn test_format_usage_empty() {
        assert_eq!(format_usage(Vec::new(), 0), "Messages seen: 0\nNo commands run yet.");
    }
}
