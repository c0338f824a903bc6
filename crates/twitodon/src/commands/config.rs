//! Config command - inspect and create configuration files.

use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result, bail};
use clap::{Args, Subcommand};
use twitodon_config::{
    CONFIG_FILE_NAME, COOKIE_SECRET_ENV, ResolvedSecret, TWITTER_CLIENT_ID_ENV, TwitodonConfig,
    resolve_secret, xdg_config_dir,
};

use super::Context;

/// Arguments for the config command.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: Option<ConfigCommand>,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Show the resolved configuration with secrets redacted (default)
    Show,

    /// Show which config file is loaded
    Path,

    /// Write a config file with default values
    Init {
        /// Create project-local config (./twitodon.toml) instead of user config
        #[arg(long)]
        local: bool,
    },
}

/// Run the config command.
pub fn run(args: ConfigArgs, ctx: &Context) -> Result<()> {
    match args.command.unwrap_or(ConfigCommand::Show) {
        ConfigCommand::Show => {
            print!("{}", render_show(ctx, |k| std::env::var(k).ok())?);
            Ok(())
        }
        ConfigCommand::Path => {
            match &ctx.loaded.source {
                Some(path) => println!("{}", path.display()),
                None => println!("(no config file, using defaults)"),
            }
            Ok(())
        }
        ConfigCommand::Init { local } => {
            let path = if local {
                PathBuf::from(CONFIG_FILE_NAME)
            } else {
                xdg_config_dir()
                    .context("No user config directory on this platform; use --local")?
                    .join(CONFIG_FILE_NAME)
            };
            write_default_config(&path)?;
            println!("Wrote {}", path.display());
            Ok(())
        }
    }
}

fn render_show(ctx: &Context, env: impl Fn(&str) -> Option<String>) -> Result<String> {
    let config = &ctx.loaded.config;
    let mut out = String::new();

    match &ctx.loaded.source {
        Some(path) => out.push_str(&format!("# Source: {}\n", path.display())),
        None => out.push_str("# Source: defaults (no config file found)\n"),
    }

    let client_id = resolve_secret(&env, TWITTER_CLIENT_ID_ENV, config.twitter.client_id.as_deref());
    let cookie_secret = resolve_secret(&env, COOKIE_SECRET_ENV, config.cookies.secret.as_deref());
    out.push_str(&format!("# twitter.client_id: {}\n", describe(client_id.as_ref())));
    out.push_str(&format!("# cookies.secret: {}\n", describe(cookie_secret.as_ref())));
    out.push('\n');

    out.push_str(&config.redacted().to_toml()?);
    Ok(out)
}

fn describe(secret: Option<&ResolvedSecret>) -> String {
    match secret {
        Some(secret) => format!("set ({})", secret.source),
        None => "NOT SET".to_string(),
    }
}

fn write_default_config(path: &Path) -> Result<()> {
    if path.exists() {
        bail!("{} already exists", path.display());
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    std::fs::write(path, TwitodonConfig::default().to_toml()?)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}
