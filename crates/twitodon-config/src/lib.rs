//! Configuration for the twitodon server.
//!
//! Provides TOML-based configuration with:
//! - File discovery (explicit path → `./twitodon.toml` → XDG config dir)
//! - Typed sections for the server, Twitter endpoints, storage, cookies and logging
//! - Secret resolution (env var → config file, with a warning for plaintext)

pub mod discovery;
pub mod error;
pub mod secrets;
pub mod types;

pub use discovery::{
    CONFIG_FILE_NAME, LoadedConfig, load_config, load_config_file, load_config_with_options,
    xdg_config_dir,
};
pub use error::{ConfigError, Result};
pub use secrets::{
    COOKIE_SECRET_ENV, MIN_COOKIE_SECRET_LEN, ResolvedSecret, ResolvedSecrets, SecretSource,
    TWITTER_CLIENT_ID_ENV, resolve_secret, resolve_secrets,
};
pub use types::*;
