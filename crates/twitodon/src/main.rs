//! twitodon - link Twitter accounts to Mastodon accounts.
//!
//! Main entry point for the twitodon CLI.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;

use commands::{config, start};

/// twitodon - find the people you follow on Twitter over on Mastodon
#[derive(Parser)]
#[command(name = "twitodon")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file (overrides default discovery)
    #[arg(long, global = true, env = "TWITODON_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the twitodon server
    Start(start::StartArgs),

    /// Inspect or create configuration
    Config(config::ConfigArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let loaded = twitodon_config::load_config(cli.config.as_deref())?;

    // Console (human-readable) + daily rotating JSON file
    let filter = if cli.verbose {
        "twitodon=debug,twitodon_server=debug,twitodon_oauth=debug,twitodon_store=debug,twitodon_config=debug,tower_http=debug,info"
    } else {
        "twitodon=info,twitodon_server=info,twitodon_oauth=info,twitodon_store=info,warn"
    };

    let log_dir = loaded
        .config
        .logging
        .directory
        .clone()
        .or_else(|| twitodon_config::xdg_config_dir().map(|d| d.join("logs")))
        .unwrap_or_else(|| PathBuf::from("logs"));
    let file_appender = tracing_appender::rolling::daily(&log_dir, "twitodon.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    use tracing_subscriber::prelude::*;
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_filter(tracing_subscriber::EnvFilter::new(filter)),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(non_blocking)
                .with_filter(tracing_subscriber::EnvFilter::new(
                    "twitodon=trace,twitodon_server=trace,twitodon_oauth=trace,twitodon_store=debug,twitodon_config=debug,info",
                )),
        )
        .init();

    for warning in &loaded.warnings {
        tracing::warn!("{}", warning);
    }

    let ctx = commands::Context {
        verbose: cli.verbose,
        loaded,
    };

    match cli.command {
        Commands::Start(args) => start::run(args, ctx).await,
        Commands::Config(args) => config::run(args, &ctx),
    }
}
