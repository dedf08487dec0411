//! Message dispatcher - Routes gateway events to lifecycle bookkeeping and command handlers

use std::sync::Arc;

use tokio::sync::mpsc;

use super::context::{Context, ContextBuilder};
use super::parser::MessageParser;
use crate::application::errors::{BotError, CommandError, ErrorKind};
use crate::application::services::tags::INVALID_TAG_HELP;
use crate::application::state::BotState;
use crate::domain::entities::{Command, LifecycleSignal, Message};
use crate::domain::traits::GatewayEvent;

/// A resolved command ready to run
pub struct Invocation {
    pub ctx: Context,
    pub command: Arc<Command>,
    pub args: String,
}

/// Event-driven core: receives gateway events and dispatches commands
pub struct Dispatcher {
    state: Arc<BotState>,
    builder: ContextBuilder,
    parser: MessageParser,
}

impl Dispatcher {
    pub fn new(state: Arc<BotState>) -> Self {
        Self {
            builder: ContextBuilder::new(Arc::clone(&state)),
            parser: MessageParser::new(),
            state,
        }
    }

    pub fn state(&self) -> &Arc<BotState> {
        &self.state
    }

    /// Route one gateway event, handling messages inline
    pub async fn handle_event(&self, event: GatewayEvent) -> Result<(), BotError> {
        match event {
            GatewayEvent::Connect => self.on_connect().await,
            GatewayEvent::ShardReady(id) => {
                self.on_shard_ready(id).await;
                Ok(())
            }
            GatewayEvent::Ready => {
                self.on_ready().await;
                Ok(())
            }
            GatewayEvent::Disconnect => {
                self.on_disconnect().await;
                Ok(())
            }
            GatewayEvent::Message(message) => self.on_message(message).await,
        }
    }

    /// Consume gateway events until the channel closes.
    ///
    /// Contexts are built in arrival order; handlers run as separate tasks so a slow
    /// handler never holds up the next message.
    pub async fn run(self: Arc<Self>, mut events: mpsc::Receiver<GatewayEvent>) -> Result<(), BotError> {
        tracing::info!("Starting event loop...");
        while let Some(event) = events.recv().await {
            match event {
                GatewayEvent::Message(message) => {
                    if !self.accept(&message) {
                        continue;
                    }
                    let Some(invocation) = self.prepare(message).await else {
                        continue;
                    };
                    let dispatcher = Arc::clone(&self);
                    tokio::spawn(async move {
                        if let Err(e) = dispatcher.invoke(invocation).await {
                            tracing::error!("Unhandled command error: {}", e);
                        }
                    });
                }
                other => self.handle_event(other).await?,
            }
        }
        tracing::info!("Gateway closed, event loop finished");
        Ok(())
    }

    /// Called when the gateway connection is established
    pub async fn on_connect(&self) -> Result<(), BotError> {
        self.state.apply(LifecycleSignal::Connect);
        tracing::info!("----------------------------");
        tracing::info!("{} connected!", self.state.settings.name);
        tracing::info!("----------------------------");

        // commands are registered only once the transport is live
        let count = self.state.finalize_commands()?;
        tracing::info!("Registered {} commands", count);
        Ok(())
    }

    pub async fn on_shard_ready(&self, shard_id: u64) {
        self.state.apply(LifecycleSignal::ShardReady(shard_id));
        tracing::info!("Shard `{}` ready!", shard_id);
    }

    /// Called once the gateway cache is populated
    pub async fn on_ready(&self) {
        self.state.apply(LifecycleSignal::Ready);
        let me = self.state.gateway.current_user();
        let stats = self.state.gateway.cache_stats();
        tracing::info!("{} is ready!", self.state.settings.name);
        tracing::info!("Logged in as: {}", me);
        tracing::info!("Client ID: {}", me.id);
        tracing::info!("Guilds: {}", stats.guilds);
        tracing::info!("Users: {}", stats.users);
        self.warm_emoji_cache().await;
    }

    pub async fn on_disconnect(&self) {
        self.state.apply(LifecycleSignal::Disconnect);
        tracing::warn!("Gateway disconnected");
    }

    /// Resolve the custom emojis of the configured guilds, skipping any that are inaccessible
    async fn warm_emoji_cache(&self) {
        let mut emojis = Vec::new();
        for guild_id in &self.state.settings.emoji_guilds {
            match self.state.gateway.guild_emojis(guild_id).await {
                Ok(found) => emojis.extend(found),
                Err(e) => tracing::warn!("Skipping emoji guild {}: {}", guild_id, e),
            }
        }
        tracing::info!("Cached {} custom emojis", emojis.len());
        self.state.set_emojis(emojis);
    }

    /// Called for every inbound message
    pub async fn on_message(&self, message: Message) -> Result<(), BotError> {
        if !self.accept(&message) {
            return Ok(());
        }
        match self.prepare(message).await {
            Some(invocation) => self.invoke(invocation).await,
            None => Ok(()),
        }
    }

    /// Count the message and drop anything from automated accounts
    fn accept(&self, message: &Message) -> bool {
        self.state.usage.record_message();
        if message.author.is_bot {
            tracing::trace!("[{}] ignoring bot author {}", message.channel_id, message.author.id);
            return false;
        }
        true
    }

    /// Build the context and resolve the command. Unknown commands resolve to `None`.
    pub async fn prepare(&self, message: Message) -> Option<Invocation> {
        let mut ctx = self.builder.build(message).await;
        let prefix = ctx.prefix.clone()?;
        let parsed = self.parser.parse(&ctx.message.content, &prefix)?;
        let name = parsed.name.to_string();
        let args = parsed.args.to_string();

        let command = self.state.commands().resolve(&name)?;
        tracing::debug!("[{}] {} invoked {}", ctx.message.channel_id, ctx.message.author.id, command.name);
        ctx.invoked_with = Some(name);
        Some(Invocation { ctx, command, args })
    }

    /// Run checks and the handler, then classify any error
    pub async fn invoke(&self, invocation: Invocation) -> Result<(), BotError> {
        let Invocation { ctx, command, args } = invocation;

        if let Err(e) = command.can_run(&ctx) {
            return self.on_command_error(&ctx, &command, e).await;
        }

        self.state.usage.increment(&command.name);
        match command.invoke(ctx.clone(), args).await {
            Ok(()) => Ok(()),
            Err(e) => self.on_command_error(&ctx, &command, e).await,
        }
    }

    /// Single top-level classifier for handler errors
    async fn on_command_error(
        &self,
        ctx: &Context,
        command: &Command,
        error: CommandError,
    ) -> Result<(), BotError> {
        let reply = match error.kind() {
            ErrorKind::UserInput => match &error {
                CommandError::InvalidTag(_) => INVALID_TAG_HELP.to_string(),
                CommandError::MissingArgument(arg) => {
                    let prefix = match ctx.invoked_by_mention() {
                        true => ctx.text_prefix().await,
                        false => ctx.prefix.clone().unwrap_or_default(),
                    };
                    format!(
                        "Missing argument `{}`.\nUsage: `{}{}`",
                        arg,
                        prefix,
                        command.signature_as(ctx.invoked_with.as_deref().unwrap_or(&command.name))
                    )
                }
                other => other.to_string(),
            },
            ErrorKind::Permission => error.to_string(),
            ErrorKind::Fault => {
                return Err(BotError::Handler {
                    command: command.name.clone(),
                    message: error.to_string(),
                });
            }
        };

        tracing::debug!("[{}] {} rejected: {}", ctx.channel_id(), command.name, error);
        if let Err(e) = ctx.send(reply).await {
            tracing::warn!("Failed to report error for {}: {}", command.name, e);
        }
        Ok(())
    }
}
