//! toolloop CLI - tool-augmented assistant on the command line
//!
//! Interactive chat plus one-shot requests and session housekeeping, all on
//! top of toolloop-core.

mod chat;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use console::style;
use tokio_util::sync::CancellationToken;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

use toolloop_core::config::GeneralConfig;
use toolloop_core::session::{ConversationManager, ExportFormat, FileSessionStore, DEFAULT_SEARCH_LIMIT};
use toolloop_core::{Agent, Config, ConfigManager, ToolRegistryBuilder};

#[derive(Parser)]
#[command(name = "toolloop")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Conversational assistant that can use local tools", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Workspace directory tools operate in
    #[arg(short, long)]
    workspace: Option<PathBuf>,

    /// Model to use (defaults to the configured model)
    #[arg(short, long)]
    model: Option<String>,

    /// Config file (defaults to <config_dir>/toolloop/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Keep sessions in memory only
    #[arg(long)]
    no_history: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive chat mode
    Chat,

    /// Send a single prompt and print the response
    Ask {
        /// The prompt
        #[arg(required = true, num_args = 1..)]
        prompt: Vec<String>,
    },

    /// Search saved sessions
    History {
        /// Text to look for
        query: String,
    },

    /// Export a saved session
    Export {
        /// Session ID
        session_id: String,

        /// json or markdown
        #[arg(short, long, default_value = "json")]
        format: String,
    },

    /// Show statistics over saved sessions
    Stats,

    /// Delete sessions not updated in the given number of days
    Prune {
        #[arg(long, default_value_t = 30)]
        days: u32,
    },

    /// Show available tools
    Tools,

    /// Show configuration
    Config {
        /// Print the effective configuration as TOML
        #[arg(long)]
        show: bool,

        /// Write the effective configuration to the config file
        #[arg(long)]
        init: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env values become visible to the API key lookup
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config_manager = match &cli.config {
        Some(path) => ConfigManager::with_path(path.clone())?,
        None => ConfigManager::new()?,
    };
    let config_path = config_manager.config_path().to_path_buf();
    let config = apply_overrides(config_manager.into_config(), &cli);
    config.validate()?;

    let _log_guard = init_logging(cli.verbose, &config.general)?;

    match cli.command {
        Some(Commands::Chat) | None => chat::run(Agent::from_config(config)?).await?,
        Some(Commands::Ask { prompt }) => ask(config, &prompt.join(" ")).await?,
        Some(Commands::History { query }) => history(&config, &query)?,
        Some(Commands::Export { session_id, format }) => export(&config, &session_id, &format)?,
        Some(Commands::Stats) => stats(&config)?,
        Some(Commands::Prune { days }) => prune(&config, days)?,
        Some(Commands::Tools) => show_tools(&config),
        Some(Commands::Config { show, init }) => show_config(config, config_path, show, init)?,
    }

    Ok(())
}

/// Command-line flags take precedence over the config file
fn apply_overrides(mut config: Config, cli: &Cli) -> Config {
    if let Some(model) = &cli.model {
        config.model.model = model.clone();
    }
    if let Some(workspace) = &cli.workspace {
        // dunce avoids the \\?\ prefix on Windows
        let resolved = dunce::canonicalize(workspace).unwrap_or_else(|_| {
            std::env::current_dir()
                .map(|cwd| cwd.join(workspace))
                .unwrap_or_else(|_| workspace.clone())
        });
        config.agent.working_dir = Some(resolved);
    }
    if cli.no_history {
        config.history.enabled = false;
    }
    config
}

/// RUST_LOG wins, then --verbose, then the configured level. With a log file
/// configured, records also go there through a non-blocking writer; the
/// returned guard must live until exit.
fn init_logging(verbose: bool, general: &GeneralConfig) -> anyhow::Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("info,toolloop_core=debug")
        } else {
            EnvFilter::new(&general.log_level)
        }
    });
    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);

    let Some(log_file) = &general.log_file else {
        tracing_subscriber::registry().with(filter).with(console_layer).init();
        return Ok(None);
    };

    let dir = log_file
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let file_name = log_file
        .file_name()
        .with_context(|| format!("Invalid log file path: {}", log_file.display()))?;
    std::fs::create_dir_all(dir)?;

    let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::never(dir, file_name));
    let file_layer = tracing_subscriber::fmt::layer().with_ansi(false).with_writer(writer);

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .init();
    Ok(Some(guard))
}

/// Run a single prompt non-interactively (for scripting)
async fn ask(config: Config, prompt: &str) -> anyhow::Result<()> {
    let mut agent = Agent::from_config(config)?;
    let cancel = CancellationToken::new();
    let ctrl_c = chat::cancel_on_ctrl_c(&cancel);

    let result = agent.submit_with_cancel(prompt, None, &cancel).await;
    ctrl_c.abort();

    match result {
        Ok(reply) => println!("{}", reply),
        Err(e) => eprintln!("{}", style(format!("Error: {}", e)).red()),
    }
    agent.shutdown()?;
    Ok(())
}

fn conversations(config: &Config) -> ConversationManager {
    ConversationManager::new(Arc::new(FileSessionStore::new(config.sessions_dir())))
}

fn history(config: &Config, query: &str) -> anyhow::Result<()> {
    let hits = conversations(config).search(query, DEFAULT_SEARCH_LIMIT)?;
    if hits.is_empty() {
        println!("{}", style("No matching sessions").dim());
        return Ok(());
    }
    for hit in hits {
        println!(
            "  {} {}",
            style(&hit.session_id).cyan(),
            style(format!("({} messages, {})", hit.message_count, hit.updated_at.format("%Y-%m-%d %H:%M"))).dim()
        );
        println!("    {}", hit.summary);
    }
    Ok(())
}

fn export(config: &Config, session_id: &str, format: &str) -> anyhow::Result<()> {
    let format: ExportFormat = format.parse()?;
    let output = conversations(config).export(Some(session_id), format)?;
    println!("{}", output);
    Ok(())
}

fn stats(config: &Config) -> anyhow::Result<()> {
    let stats = conversations(config).statistics()?;
    println!("{}", serde_json::to_string_pretty(&stats)?);
    Ok(())
}

fn prune(config: &Config, days: u32) -> anyhow::Result<()> {
    let removed = conversations(config).clear_old_sessions(days)?;
    println!(
        "{}",
        style(format!("Removed {} session(s) older than {} days", removed, days)).green()
    );
    Ok(())
}

fn show_tools(config: &Config) {
    println!("{}", style("Available Tools:").bold());
    println!();

    let registry = ToolRegistryBuilder::new(config.working_dir())
        .with_config(&config.tools)
        .build();
    for def in registry.list() {
        println!("  {:<20} {}", style(&def.name).cyan(), def.description);
    }
}

fn show_config(config: Config, config_path: PathBuf, show: bool, init: bool) -> anyhow::Result<()> {
    println!("{}", style("Configuration:").bold());
    println!();
    println!("  Config file: {}", style(config_path.display()).dim());
    println!("  Workspace: {}", style(config.working_dir().display()).green());
    println!("  Data dir: {}", style(config.data_dir().display()).dim());
    println!("  Model: {}", style(&config.model.model).cyan());
    println!(
        "  API key: {}",
        if config.resolve_api_key().is_some() {
            style("configured".to_string()).green()
        } else {
            style(format!("missing (set {})", config.model.api_key_env)).red()
        }
    );

    if show {
        println!();
        println!("{}", toml::to_string_pretty(&config)?);
    }

    if init {
        let mut manager = ConfigManager::with_path(config_path)?;
        *manager.config_mut() = config;
        manager.save()?;
        println!("{}", style(format!("Wrote {}", manager.config_path().display())).green());
    }
    Ok(())
}
