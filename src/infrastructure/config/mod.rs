//! Configuration management

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::application::errors::ConfigError;
use crate::application::services::EvalSettings;
use crate::application::state::BotSettings;

/// Bot configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Config {
    pub bot: BotConfig,
    pub extensions: ExtensionsConfig,
    pub eval: EvalConfig,
    pub adapters: AdaptersConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct BotConfig {
    pub name: String,
    /// Prefix used in guilds without a configured one, and in private messages
    pub prefix: String,
    pub token: Option<String>,
    /// User ids allowed to run operator commands
    pub owners: Vec<String>,
    /// Guilds whose emojis are cached on ready
    pub emoji_guilds: Vec<String>,
    pub data_dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct ExtensionsConfig {
    pub directory: Option<PathBuf>,
    pub auto_load: bool,
    /// Compiled-in extensions loaded without a manifest
    pub builtin: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct EvalConfig {
    pub interpreter: String,
    pub check_args: Vec<String>,
    pub script_flag: String,
    /// Code fence language for replies
    pub language: String,
    /// `PATH` visible to evaluated code
    pub path: String,
    pub timeout_seconds: Option<u64>,
    /// Bytes kept per output stream
    pub max_output_bytes: usize,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct AdaptersConfig {
    pub console: ConsoleConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct ConsoleConfig {
    pub enabled: bool,
    /// Guild the console session pretends to type in; `None` for a private channel
    pub guild_id: Option<String>,
    pub channel_id: String,
    pub user_id: String,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            name: "statsbot".to_string(),
            prefix: "#".to_string(),
            token: None,
            owners: Vec::new(),
            emoji_guilds: Vec::new(),
            data_dir: PathBuf::from("data"),
        }
    }
}

impl Default for ExtensionsConfig {
    fn default() -> Self {
        Self {
            directory: Some(PathBuf::from("extensions")),
            auto_load: true,
            builtin: vec!["admin".to_string(), "tags".to_string()],
        }
    }
}

impl Default for EvalConfig {
    fn default() -> Self {
        let defaults = EvalSettings::default();
        Self {
            interpreter: defaults.interpreter,
            check_args: defaults.check_args,
            script_flag: defaults.script_flag,
            language: defaults.language,
            path: defaults.helper_path,
            timeout_seconds: None,
            max_output_bytes: defaults.max_output_bytes,
        }
    }
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            guild_id: Some("console-guild".to_string()),
            channel_id: "console".to_string(),
            user_id: "console-user".to_string(),
        }
    }
}

impl Config {
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let content = std::fs::read_to_string(&path)
            .map_err(|e| ConfigError::Parse(format!("Failed to read config: {}", e)))?;

        let config: Config = serde_yaml::from_str(&content)
            .map_err(|e| ConfigError::Parse(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load_env() -> Self {
        let mut config = Config::default();

        if let Ok(token) = std::env::var("BOT_TOKEN") {
            config.bot.token = Some(token);
        }

        if let Ok(prefix) = std::env::var("BOT_PREFIX") {
            config.bot.prefix = prefix;
        }

        config
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bot.prefix.is_empty() {
            return Err(ConfigError::InvalidValue("bot.prefix must not be empty".to_string()));
        }
        if self.eval.interpreter.is_empty() {
            return Err(ConfigError::InvalidValue("eval.interpreter must not be empty".to_string()));
        }
        if self.eval.timeout_seconds == Some(0) {
            return Err(ConfigError::InvalidValue("eval.timeout-seconds must be positive".to_string()));
        }
        if self.eval.max_output_bytes == 0 {
            return Err(ConfigError::InvalidValue("eval.max-output-bytes must be positive".to_string()));
        }
        Ok(())
    }

    /// Resolve the token: explicit value, then `BOT_TOKEN`, then `bot.token`,
    /// then the legacy `config.json` in the data directory.
    pub fn resolve_token(&self, explicit: Option<&str>) -> Result<String, ConfigError> {
        if let Some(token) = explicit.filter(|t| !t.is_empty()) {
            return Ok(token.to_string());
        }
        if let Ok(token) = std::env::var("BOT_TOKEN") {
            if !token.is_empty() {
                return Ok(token);
            }
        }
        if let Some(token) = self.bot.token.as_deref().filter(|t| !t.is_empty()) {
            return Ok(token.to_string());
        }
        read_legacy_token(&self.bot.data_dir.join("config.json"))?
            .ok_or_else(|| ConfigError::MissingField("bot.token".to_string()))
    }

    /// Core settings with the resolved token
    pub fn bot_settings(&self, token: String) -> BotSettings {
        BotSettings {
            name: self.bot.name.clone(),
            default_prefix: self.bot.prefix.clone(),
            token,
            operators: self.bot.owners.iter().cloned().collect::<HashSet<_>>(),
            emoji_guilds: self.bot.emoji_guilds.clone(),
        }
    }

    pub fn eval_settings(&self) -> EvalSettings {
        EvalSettings {
            interpreter: self.eval.interpreter.clone(),
            check_args: self.eval.check_args.clone(),
            script_flag: self.eval.script_flag.clone(),
            language: self.eval.language.clone(),
            helper_path: self.eval.path.clone(),
            timeout: self.eval.timeout_seconds.map(Duration::from_secs),
            max_output_bytes: self.eval.max_output_bytes,
        }
    }

    /// Directory scanned for extension manifests, if auto-loading is on
    pub fn extension_directory(&self) -> Option<PathBuf> {
        match self.extensions.auto_load {
            true => self.extensions.directory.clone(),
            false => None,
        }
    }
}

/// Read `{"token": "..."}`; surrounding quotes inside the value are stripped
fn read_legacy_token(path: &Path) -> Result<Option<String>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(path)
        .map_err(|e| ConfigError::Parse(format!("Failed to read {}: {}", path.display(), e)))?;
    let value: serde_json::Value = serde_json::from_str(&content)
        .map_err(|e| ConfigError::Parse(format!("Failed to parse {}: {}", path.display(), e)))?;
    Ok(value
        .get("token")
        .and_then(|t| t.as_str())
        .map(|t| t.trim().trim_matches('"').to_string())
        .filter(|t| !t.is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.bot.prefix, "#");
        assert_eq!(config.eval.interpreter, "sh");
        assert_eq!(config.extensions.builtin, vec!["admin", "tags"]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_yaml_fills_defaults() {
        let yaml = "bot:\n  prefix: \"!\"\n  owners: [\"42\"]\neval:\n  timeout-seconds: 5\n";
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.bot.prefix, "!");
        assert_eq!(config.bot.name, "statsbot");
        assert_eq!(config.eval_settings().timeout, Some(Duration::from_secs(5)));

        let settings = config.bot_settings("tok".to_string());
        assert!(settings.operators.contains("42"));
        assert_eq!(settings.token, "tok");
    }

    #[test]
    fn test_zero_output_cap_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "eval:\n  max-output-bytes: 0\n").unwrap();
        assert!(matches!(Config::load(&path), Err(ConfigError::InvalidValue(_))));

        std::fs::write(&path, "eval:\n  max-output-bytes: 4096\n").unwrap();
        assert_eq!(Config::load(&path).unwrap().eval_settings().max_output_bytes, 4096);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "extensions:\n  auto-load: false\n  builtin: [tags]\n").unwrap();
        let config = Config::load(&path).unwrap();
        assert_eq!(config.extension_directory(), None);
        assert_eq!(config.extensions.builtin, vec!["tags"]);
    }

    #[test]
    fn test_empty_prefix_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "bot:\n  prefix: \"\"\n").unwrap();
        assert!(matches!(Config::load(&path), Err(ConfigError::InvalidValue(_))));
    }

    #[test]
    fn test_legacy_token_quotes_stripped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"token": "\"abc.def\""}"#).unwrap();
        assert_eq!(read_legacy_token(&path).unwrap().as_deref(), Some("abc.def"));
    }

    #[test]
    fn test_explicit_token_wins() {
        let config = Config::default();
        assert_eq!(config.resolve_token(Some("cli-token")).unwrap(), "cli-token");
    }
}
