//! CLI command handlers.

pub mod config;
pub mod start;

use twitodon_config::LoadedConfig;

/// Shared context for all commands.
#[derive(Debug, Clone)]
pub struct Context {
    /// Verbose output enabled.
    pub verbose: bool,
    /// Configuration discovered at startup.
    pub loaded: LoadedConfig,
}
