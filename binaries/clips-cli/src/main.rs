//! Clips CLI
//!
//! Validate engine configs and replay scripted feed sessions.

mod script;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use clips_core::{ClipsConfig, UserContext};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "clips")]
#[command(about = "Clips - headless short-form video feed engine")]
#[command(version)]
struct Cli {
    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a config file and print the effective settings
    CheckConfig {
        /// YAML or JSON config
        path: PathBuf,
    },

    /// Replay a scripted session against an in-memory backend
    Simulate {
        /// JSON array of feed items
        #[arg(long)]
        feed: PathBuf,

        /// JSON array of steps
        #[arg(long)]
        script: PathBuf,

        /// Engine config (defaults when omitted)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Signed-in user; anonymous when omitted
        #[arg(short, long)]
        user: Option<String>,
    },
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.json_logs);

    match cli.command {
        Commands::CheckConfig { path } => cmd_check_config(path),
        Commands::Simulate {
            feed,
            script,
            config,
            user,
        } => cmd_simulate(feed, script, config, user).await,
    }
}

fn cmd_check_config(path: PathBuf) -> Result<()> {
    let config = ClipsConfig::load(&path)
        .with_context(|| format!("Failed to load {}", path.display()))?;
    config.validate()?;

    tracing::info!(path = %path.display(), "Config is valid");
    print!("{}", serde_yaml::to_string(&config)?);
    Ok(())
}

async fn cmd_simulate(
    feed: PathBuf,
    script: PathBuf,
    config: Option<PathBuf>,
    user: Option<String>,
) -> Result<()> {
    let config = match config {
        Some(path) => ClipsConfig::load(&path)
            .with_context(|| format!("Failed to load {}", path.display()))?,
        None => ClipsConfig::default(),
    };
    let user = match user {
        Some(id) => UserContext::signed_in(id),
        None => UserContext::anonymous(),
    };

    let feed_text = std::fs::read_to_string(&feed)
        .with_context(|| format!("Failed to read {}", feed.display()))?;
    let script_text = std::fs::read_to_string(&script)
        .with_context(|| format!("Failed to read {}", script.display()))?;

    let items = script::parse_feed(&feed_text)?;
    let steps = script::parse_script(&script_text)?;
    tracing::info!(items = items.len(), steps = steps.len(), "Starting simulation");

    let report = script::run(config, user, items, &steps).await?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
