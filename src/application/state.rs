//! Explicitly owned bot state, constructed once at startup and shared by handle

use std::collections::HashSet;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};

use crate::application::errors::BotError;
use crate::application::services::{core_commands, EvalSandbox, UsageCounters};
use crate::domain::entities::{CommandRegistry, LifecycleSignal, SessionState};
use crate::domain::traits::{ConfigStore, Emoji, Gateway};
use crate::extensions::{ExtensionRegistry, LoadResult};

/// Static settings the core reads on every dispatch
#[derive(Debug, Clone)]
pub struct BotSettings {
    pub name: String,
    /// Prefix used when a guild has none configured
    pub default_prefix: String,
    /// Live authentication token, redacted from every reply
    pub token: String,
    /// Operator allow-list
    pub operators: HashSet<String>,
    /// Guilds whose custom emojis are cached when ready
    pub emoji_guilds: Vec<String>,
}

impl Default for BotSettings {
    fn default() -> Self {
        Self {
            name: "statsbot".to_string(),
            default_prefix: "#".to_string(),
            token: String::new(),
            operators: HashSet::new(),
            emoji_guilds: Vec::new(),
        }
    }
}

/// Process-wide state: counters, session, the live command set and collaborators
pub struct BotState {
    pub settings: BotSettings,
    pub gateway: Arc<dyn Gateway>,
    pub store: Arc<dyn ConfigStore>,
    pub usage: UsageCounters,
    pub eval: EvalSandbox,
    pub extensions: ExtensionRegistry,
    pub started_at: DateTime<Utc>,
    session: RwLock<SessionState>,
    commands: RwLock<Arc<CommandRegistry>>,
    emojis: RwLock<Vec<Emoji>>,
}

impl BotState {
    pub fn new(
        settings: BotSettings,
        gateway: Arc<dyn Gateway>,
        store: Arc<dyn ConfigStore>,
        eval: EvalSandbox,
        extensions: ExtensionRegistry,
    ) -> Self {
        Self {
            settings,
            gateway,
            store,
            usage: UsageCounters::new(),
            eval,
            extensions,
            started_at: Utc::now(),
            session: RwLock::new(SessionState::default()),
            commands: RwLock::new(Arc::new(CommandRegistry::new())),
            emojis: RwLock::new(Vec::new()),
        }
    }

    pub fn session(&self) -> SessionState {
        self.session
            .read()
            .map(|s| s.clone())
            .unwrap_or_default()
    }

    /// Apply a lifecycle signal. Out-of-order signals leave the state unchanged.
    pub fn apply(&self, signal: LifecycleSignal) -> bool {
        let mut session = match self.session.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        match session.transition(signal) {
            Some(next) => {
                *session = next;
                true
            }
            None => {
                tracing::warn!("Ignoring {:?} while {}", signal, *session);
                false
            }
        }
    }

    /// The live command registry
    pub fn commands(&self) -> Arc<CommandRegistry> {
        self.commands
            .read()
            .map(|c| Arc::clone(&*c))
            .unwrap_or_else(|poisoned| Arc::clone(&*poisoned.into_inner()))
    }

    /// Build the registry from the core commands plus every loaded extension and swap it in
    pub fn finalize_commands(&self) -> Result<usize, BotError> {
        let core = core_commands()?;
        let registry = self.extensions.finalize(&core)?;
        let count = registry.len();
        let mut commands = match self.commands.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *commands = Arc::new(registry);
        Ok(count)
    }

    /// Re-run extension loading and refresh the command registry
    pub fn reload_extensions(&self) -> Result<Vec<LoadResult>, BotError> {
        let results = self.extensions.load_all();
        self.finalize_commands()?;
        Ok(results)
    }

    pub fn set_emojis(&self, emojis: Vec<Emoji>) {
        if let Ok(mut cached) = self.emojis.write() {
            *cached = emojis;
        }
    }

    pub fn emojis(&self) -> Vec<Emoji> {
        self.emojis.read().map(|e| e.clone()).unwrap_or_default()
    }

    pub fn is_operator(&self, user_id: &str) -> bool {
        self.settings.operators.contains(user_id)
    }
}
