//! Commands declared by the bot itself

use chrono::Utc;

use crate::application::errors::{CommandError, GatewayError, RegistryError};
use crate::application::messaging::{checks, Context};
use crate::application::services::tags::TAGS_DOCUMENT;
use crate::domain::entities::{Command, CommandSet, Embed, Outbound, Permissions, CORE_CATEGORY};

const GREEN: u32 = 0x2ecc71;
const PURPLE: u32 = 0x9b59b6;
const RED: u32 = 0xe74c3c;
const BLURPLE: u32 = 0x7289da;

/// The core command set: ping, invite, prefix, bot/about, help and eval
pub fn core_commands() -> Result<CommandSet, RegistryError> {
    let mut set = CommandSet::new(CORE_CATEGORY);

    set.add(Command::new("ping")
        .with_description("Pong! Returns average shard latency.")
        .with_handler(|ctx, _args| async move { ping(ctx).await }))?;

    set.add(Command::new("invite")
        .with_description("Returns the invite url for the bot.")
        .with_handler(|ctx, _args| async move {
            let url = oauth_url(&ctx.state.gateway.current_user().id, Permissions::invite_set());
            ctx.send(format!("**Invite link:** \n<{}>", url)).await?;
            Ok(())
        }))?;

    set.add(Command::new("prefix")
        .with_description("Change the bot prefix for your server.")
        .with_usage("<prefix>")
        .with_check(checks::has_permissions(Permissions::MANAGE_GUILD, "Manage Server"))
        .with_handler(|ctx, args| async move { set_prefix(ctx, args).await }))?;

    set.add(Command::new("bot")
        .with_alias("about")
        .with_description("Shows information and stats about the bot.")
        .with_handler(|ctx, _args| async move { about(ctx).await }))?;

    set.add(Command::new("help")
        .with_description("Shows the help message.")
        .with_handler(|ctx, _args| async move { help(ctx).await }))?;

    set.add(Command::new("eval")
        .with_description("Evaluates code.")
        .with_usage("<code>")
        .hidden()
        .with_check(checks::is_operator())
        .with_handler(|ctx, body| async move {
            if body.trim().is_empty() {
                return Err(CommandError::MissingArgument("code".to_string()));
            }
            ctx.state.eval.run(&body, &ctx).await
        }))?;

    Ok(set)
}

/// Gateway latency in milliseconds with four decimals
pub fn format_latency(latency: std::time::Duration) -> String {
    format!("{:.4} ms", latency.as_secs_f64() * 1000.0)
}

async fn ping(ctx: Context) -> Result<(), CommandError> {
    let title = "Pong! Websocket Latency: ";
    let description = format_latency(ctx.state.gateway.latency());
    let embed = Embed::new().title(title).description(&description).color(BLURPLE);
    match ctx.send(embed).await {
        Err(CommandError::Gateway(GatewayError::Forbidden(_))) => {
            ctx.send(Outbound::text(format!("{}{}", title, description))).await?;
            Ok(())
        }
        other => other.map(|_| ()),
    }
}

/// OAuth2 authorize URL inviting the bot with `permissions`
pub fn oauth_url(client_id: &str, permissions: Permissions) -> String {
    format!(
        "https://discord.com/oauth2/authorize?client_id={}&scope=bot&permissions={}",
        client_id,
        permissions.bits()
    )
}

async fn set_prefix(ctx: Context, args: String) -> Result<(), CommandError> {
    let prefix = args.trim();
    if prefix.is_empty() {
        return Err(CommandError::MissingArgument("prefix".to_string()));
    }
    let guild_id = ctx.guild_id().ok_or(CommandError::GuildOnly)?;
    ctx.state.store.set(guild_id, prefix).await?;
    tracing::info!("Guild {} prefix set to {:?}", guild_id, prefix);
    ctx.send(format!("Changed the prefix to: `{}`", prefix)).await?;
    Ok(())
}

/// `[Nd ]Hh Mm Ss`
pub fn format_uptime(total_seconds: i64) -> String {
    let total = total_seconds.max(0);
    let (hours, remainder) = (total / 3600, total % 3600);
    let (minutes, seconds) = (remainder / 60, remainder % 60);
    let (days, hours) = (hours / 24, hours % 24);
    if days > 0 {
        format!("{}d {}h {}m {}s", days, hours, minutes, seconds)
    } else {
        format!("{}h {}m {}s", hours, minutes, seconds)
    }
}

/// Resident memory of this process in MiB, where the platform exposes it
fn resident_memory_mib() -> Option<f64> {
    let status = std::fs::read_to_string("/proc/self/status").ok()?;
    let line = status.lines().find(|l| l.starts_with("VmRSS:"))?;
    let kib: f64 = line.split_whitespace().nth(1)?.parse().ok()?;
    Some(kib / 1024.0)
}

async fn about(ctx: Context) -> Result<(), CommandError> {
    let state = &ctx.state;
    let me = state.gateway.current_user();
    let stats = state.gateway.cache_stats();
    let session = state.session();

    let color = match session.is_ready() {
        true => GREEN,
        false if matches!(session, crate::domain::entities::SessionState::Disconnected) => RED,
        false => PURPLE,
    };
    let uptime = format_uptime((Utc::now() - state.started_at).num_seconds());
    let latency = state.gateway.latency().as_secs_f64() * 1000.0;
    let saved_tags = match ctx.load_json(TAGS_DOCUMENT).await? {
        serde_json::Value::Object(map) => map.len(),
        _ => 0,
    };
    let memory = resident_memory_mib()
        .map(|m| format!("{:.2} MiB", m))
        .unwrap_or_else(|| "n/a".to_string());

    let embed = Embed::new()
        .title("Stats")
        .description(format!("{} - a command bot for chat servers.", state.settings.name))
        .color(color)
        .timestamp(Utc::now())
        .field("Current Status", title_case(&session.to_string()), true)
        .field("Uptime", uptime, true)
        .field("Latency", format!("{:.2} ms", latency), true)
        .field("Guilds", stats.guilds, true)
        .field("Members", format!("{}/{} online", stats.online_users, stats.users), true)
        .field("Channels", format!("{} total", stats.channels), true)
        .field("RAM Usage", memory, true)
        .field("Commands Run", state.usage.total(), true)
        .field("Saved Tags", saved_tags, true)
        .field("Invite", format!("[Click Here]({})", oauth_url(&me.id, Permissions::invite_set())), true)
        .footer(format!("Bot ID: {}", me.id));

    ctx.send(embed).await?;
    Ok(())
}

fn title_case(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

async fn help(ctx: Context) -> Result<(), CommandError> {
    // a mention is not a useful prefix to advertise
    let prefix = match ctx.invoked_by_mention() {
        true => ctx.text_prefix().await,
        false => ctx.prefix.clone().unwrap_or_default(),
    };

    let registry = ctx.state.commands();
    let mut visible: Vec<_> = registry.all().filter(|c| !c.hidden).collect();
    visible.sort_by(|a, b| {
        let core_first = |c: &str| (c != CORE_CATEGORY, c.to_string());
        core_first(a.category.as_str())
            .cmp(&core_first(b.category.as_str()))
            .then_with(|| a.name.cmp(&b.name))
    });

    let mut embed = Embed::new()
        .title("`Stats - Help`")
        .description("Here is a list of commands you can use with this bot.")
        .color(BLURPLE);
    for cmd in visible {
        embed = embed.field(format!("{}{}", prefix, cmd.signature()), cmd.short_doc(), false);
    }

    ctx.send(embed).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_core_set_has_no_collisions() {
        let set = core_commands().unwrap();
        assert_eq!(set.len(), 6);
        assert!(set.iter().any(|c| c.name == "eval" && c.hidden));
    }

    #[test]
    fn test_format_latency_four_decimals() {
        assert_eq!(format_latency(Duration::from_micros(42_125)), "42.1250 ms");
        assert_eq!(format_latency(Duration::ZERO), "0.0000 ms");
    }

    #[test]
    fn test_format_uptime() {
        assert_eq!(format_uptime(59), "0h 0m 59s");
        assert_eq!(format_uptime(3_661), "1h 1m 1s");
        assert_eq!(format_uptime(90_061), "1d 1h 1m 1s");
    }

    #[test]
    fn test_oauth_url() {
        let url = oauth_url("123", Permissions::invite_set());
        assert_eq!(
            url,
            "https://discord.com/oauth2/authorize?client_id=123&scope=bot&permissions=314432"
        );
    }
}
