//! Start command - runs the twitodon server.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context as _, Result};
use clap::Args;
use twitodon_config::TwitodonConfig;
use twitodon_oauth::TwitterConfig;
use twitodon_server::{AppState, Server, ServerConfig};
use twitodon_store::{MemoryStore, SharedStore, SqliteStore};

use super::Context;

/// Arguments for the start command.
#[derive(Args, Debug, Default)]
pub struct StartArgs {
    /// Address to bind to (overrides config)
    #[arg(short, long)]
    pub bind: Option<String>,

    /// Port to listen on (overrides config)
    #[arg(short, long, env = "PORT")]
    pub port: Option<u16>,

    /// SQLite database path (overrides config)
    #[arg(long)]
    pub database: Option<PathBuf>,

    /// Public origin used in OAuth callback URLs (overrides config)
    #[arg(long)]
    pub public_url: Option<String>,

    /// Directory of browser client assets (overrides config)
    #[arg(long)]
    pub static_dir: Option<PathBuf>,
}

/// Run the start command.
pub async fn run(args: StartArgs, ctx: Context) -> Result<()> {
    let mut config = ctx.loaded.config;
    if let Some(path) = &ctx.loaded.source {
        tracing::info!(path = %path.display(), "Loaded config");
    }
    apply_overrides(&mut config, &args);

    let secrets = twitodon_config::resolve_secrets(&config, |k| std::env::var(k).ok())?;
    if ctx.verbose {
        tracing::debug!(
            client_id = %secrets.twitter_client_id.source,
            cookie_secret = %secrets.cookie_secret.source,
            "Resolved secrets"
        );
    }

    let server_config = server_config(&config)?;
    let store = open_store(config.storage.database.as_deref())?;
    let twitter = TwitterConfig::new(secrets.twitter_client_id.value).with_endpoints(
        config.twitter.authorize_url.clone(),
        config.twitter.api_base.clone(),
    );

    let state = AppState::new(
        server_config,
        store,
        twitter,
        secrets.cookie_secret.value.as_bytes(),
    )?;

    Server::from_state(state).run().await?;
    Ok(())
}

/// Fold command-line overrides into the loaded config.
fn apply_overrides(config: &mut TwitodonConfig, args: &StartArgs) {
    if let Some(bind) = &args.bind {
        config.server.bind = bind.clone();
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(database) = &args.database {
        config.storage.database = Some(database.clone());
    }
    if let Some(public_url) = &args.public_url {
        config.server.public_url = Some(public_url.clone());
    }
    if let Some(static_dir) = &args.static_dir {
        config.server.static_dir = Some(static_dir.clone());
    }
}

fn server_config(config: &TwitodonConfig) -> Result<ServerConfig> {
    let server = &config.server;
    Ok(ServerConfig::new()
        .with_bind_address(server.socket_addr()?)
        .with_public_url(server.public_url.clone())
        .with_secure_cookies(server.secure_cookies)
        .with_trust_proxy_headers(server.trust_proxy_headers)
        .with_static_dir(server.static_dir.clone())
        .with_request_logging(server.request_logging)
        .with_purge_interval(Duration::from_secs(server.purge_interval_secs)))
}

fn open_store(database: Option<&Path>) -> Result<SharedStore> {
    match database {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create database directory {}", parent.display())
                })?;
            }
            let store: SharedStore = Arc::new(
                SqliteStore::open(path)
                    .with_context(|| format!("Failed to open database {}", path.display()))?,
            );
            tracing::info!(path = %path.display(), "Using SQLite store");
            Ok(store)
        }
        None => {
            tracing::warn!("No database configured; links and app registrations are lost on restart");
            let store: SharedStore = Arc::new(MemoryStore::new());
            Ok(store)
        }
    }
}
