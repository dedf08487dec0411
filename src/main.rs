use clap::{Parser, Subcommand};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::mpsc;

use statsbot::application::errors::BotError;
use statsbot::application::messaging::Dispatcher;
use statsbot::application::services::EvalSandbox;
use statsbot::application::BotState;
use statsbot::extensions::{builtin_catalog, ExtensionRegistry};
use statsbot::infrastructure::adapters::ConsoleGateway;
use statsbot::infrastructure::config::Config;
use statsbot::infrastructure::storage::JsonStore;

#[derive(Parser)]
#[command(name = "statsbot")]
#[command(about = "A command bot for chat servers", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, default_value = "config.yaml")]
    config: String,

    /// Bot token (overrides config)
    #[arg(short, long)]
    token: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the bot on the console gateway
    Run,
    /// Show version
    Version,
    /// Load every configured extension and report the result
    Extensions,
}

fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run => run_bot(&cli.config, cli.token.as_deref()),
        Commands::Version => {
            println!("statsbot v{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        Commands::Extensions => list_extensions(&cli.config),
    };

    if let Err(e) = result {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}

fn load_config(config_path: &str) -> Config {
    if Path::new(config_path).exists() {
        Config::load(config_path).unwrap_or_else(|e| {
            tracing::warn!("Failed to load config: {}, using defaults", e);
            Config::load_env()
        })
    } else {
        Config::load_env()
    }
}

fn extension_registry(config: &Config) -> ExtensionRegistry {
    config.extensions.builtin.iter().fold(
        ExtensionRegistry::new(config.extension_directory()).with_builtins(builtin_catalog()),
        |registry, name| registry.enable(name.clone()),
    )
}

fn run_bot(config_path: &str, token_override: Option<&str>) -> Result<(), BotError> {
    let config = load_config(config_path);
    tracing::info!("Starting statsbot: {}", config.bot.name);

    let token = match config.resolve_token(token_override) {
        Ok(token) => token,
        // the console gateway does not authenticate
        Err(e) => {
            tracing::warn!("{}; continuing without a token", e);
            String::new()
        }
    };

    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| BotError::Internal(format!("Failed to start runtime: {}", e)))?;

    rt.block_on(async {
        let store = JsonStore::new(&config.bot.data_dir);
        store.init().await?;

        let extensions = extension_registry(&config);
        extensions.load_all();

        let gateway = Arc::new(ConsoleGateway::new(&config.bot.name, config.adapters.console.clone()));
        let state = Arc::new(BotState::new(
            config.bot_settings(token),
            gateway.clone(),
            Arc::new(store),
            EvalSandbox::new(config.eval_settings()),
            extensions,
        ));
        let dispatcher = Arc::new(Dispatcher::new(state));

        let (tx, rx) = mpsc::channel(100);
        let reader = tokio::spawn(async move {
            if let Err(e) = gateway.run(tx).await {
                tracing::error!("Console gateway stopped: {}", e);
            }
        });

        dispatcher.run(rx).await?;
        let _ = reader.await;
        Ok(())
    })
}

fn list_extensions(config_path: &str) -> Result<(), BotError> {
    let config = load_config(config_path);
    let extensions = extension_registry(&config);
    match extensions.directory() {
        Some(dir) => println!("Extension directory: {}", dir.display()),
        None => println!("Extension directory: (auto-load off)"),
    }
    let results = extensions.load_all();
    if results.is_empty() {
        println!("No extensions configured.");
    }
    for result in &results {
        println!("{}", result);
    }
    Ok(())
}
