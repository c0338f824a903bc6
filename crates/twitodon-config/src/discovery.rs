//! Config file discovery.
//!
//! The first file found wins:
//! 1. An explicit `--config` path (must exist)
//! 2. `./twitodon.toml` (project-local)
//! 3. `~/.config/twitodon/twitodon.toml` (XDG user config)
//!
//! With no file at all the defaults are used.

use std::path::{Path, PathBuf};

use crate::{ConfigError, Result, TwitodonConfig};

/// Config filename, both project-local and inside the XDG directory.
pub const CONFIG_FILE_NAME: &str = "twitodon.toml";

/// Application name for XDG directory resolution.
const APP_NAME: &str = "twitodon";

/// Environment variable to override the config directory.
const CONFIG_DIR_ENV: &str = "TWITODON_CONFIG_DIR";

/// Result of config discovery and loading.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: TwitodonConfig,
    /// File the config came from; `None` when running on defaults.
    pub source: Option<PathBuf>,
    /// Warnings generated during loading (e.g., plaintext secrets).
    pub warnings: Vec<String>,
}

/// Load configuration, honouring an explicit path if one is given.
pub fn load_config(explicit: Option<&Path>) -> Result<LoadedConfig> {
    load_config_with_options(explicit, None, None)
}

/// Load configuration with explicit control over the search directories.
///
/// `project_dir` replaces the current directory and `config_dir` replaces
/// the XDG resolution.
pub fn load_config_with_options(
    explicit: Option<&Path>,
    project_dir: Option<&Path>,
    config_dir: Option<&Path>,
) -> Result<LoadedConfig> {
    let candidates: Vec<PathBuf> = match explicit {
        Some(path) => vec![path.to_path_buf()],
        None => {
            let project = project_dir
                .map(|d| d.join(CONFIG_FILE_NAME))
                .unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAME));
            let user = config_dir
                .map(Path::to_path_buf)
                .or_else(xdg_config_dir)
                .map(|d| d.join(CONFIG_FILE_NAME));
            std::iter::once(project).chain(user).collect()
        }
    };

    let found = if explicit.is_some() {
        candidates.into_iter().next()
    } else {
        candidates.into_iter().find(|p| p.is_file())
    };

    let (config, source) = match found {
        Some(path) => {
            let config = load_config_file(&path)?;
            tracing::debug!(path = %path.display(), "Loaded config file");
            (config, Some(path))
        }
        None => (TwitodonConfig::default(), None),
    };

    let mut warnings = Vec::new();
    check_plaintext_secrets(&config, &mut warnings);

    Ok(LoadedConfig {
        config,
        source,
        warnings,
    })
}

/// Load config from a specific file path (no discovery).
pub fn load_config_file(path: &Path) -> Result<TwitodonConfig> {
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.display().to_string(),
        source: e,
    })?;
    TwitodonConfig::from_toml(&contents)
}

/// Get the XDG config directory for twitodon.
///
/// Checks `TWITODON_CONFIG_DIR` first, then falls back to the platform default.
pub fn xdg_config_dir() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var(CONFIG_DIR_ENV)
        && !dir.is_empty()
    {
        return Some(PathBuf::from(dir));
    }
    dirs::config_dir().map(|d| d.join(APP_NAME))
}

fn check_plaintext_secrets(config: &TwitodonConfig, warnings: &mut Vec<String>) {
    if config.cookies.secret.is_some() {
        warnings.push(
            "Cookie secret is stored in plaintext in the config file. \
             Consider setting the COOKIE_SECRET env var instead."
                .to_string(),
        );
    }
    if config.twitter.client_id.is_some() {
        warnings.push(
            "Twitter client id is stored in the config file. \
             Consider setting the TWITTER_CLIENT_ID env var instead."
                .to_string(),
        );
    }
}
