//! Configuration types.

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

/// Root configuration, one field per TOML section.
///
/// ```toml
/// [server]
/// bind = "::"
/// port = 3000
/// public_url = "https://twitodon.example"
///
/// [twitter]
/// client_id = "..."
///
/// [storage]
/// database = "/var/lib/twitodon/twitodon.db"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TwitodonConfig {
    pub server: ServerSection,
    pub twitter: TwitterSection,
    pub storage: StorageSection,
    pub cookies: CookieSection,
    pub logging: LoggingSection,
}

/// `[server]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    /// Address to bind to.
    pub bind: String,
    /// Port to listen on.
    pub port: u16,
    /// Externally visible origin used for OAuth callback URLs. When unset
    /// the origin is derived from each request.
    pub public_url: Option<String>,
    /// Mark session cookies `Secure`.
    pub secure_cookies: bool,
    /// Honour `X-Forwarded-Proto` / `X-Forwarded-Host` when deriving the origin.
    pub trust_proxy_headers: bool,
    /// Directory of browser client assets served for unmatched paths.
    pub static_dir: Option<PathBuf>,
    /// Log every request with its status and duration.
    pub request_logging: bool,
    /// Seconds between sweeps of expired store entries.
    pub purge_interval_secs: u64,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            bind: "::".to_string(),
            port: 3000,
            public_url: None,
            secure_cookies: false,
            trust_proxy_headers: true,
            static_dir: None,
            request_logging: true,
            purge_interval_secs: 600,
        }
    }
}

impl ServerSection {
    /// The socket address formed by `bind` and `port`.
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        let ip: IpAddr = self.bind.parse().map_err(|e| ConfigError::InvalidValue {
            field: "server.bind".to_string(),
            message: format!("{}", e),
        })?;
        Ok(SocketAddr::new(ip, self.port))
    }
}

/// `[twitter]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TwitterSection {
    /// OAuth 2.0 client id (prefer the `TWITTER_CLIENT_ID` env var).
    pub client_id: Option<String>,
    pub authorize_url: String,
    pub api_base: String,
}

impl Default for TwitterSection {
    fn default() -> Self {
        Self {
            client_id: None,
            authorize_url: "https://twitter.com/i/oauth2/authorize".to_string(),
            api_base: "https://api.twitter.com".to_string(),
        }
    }
}

/// `[storage]` section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSection {
    /// SQLite database path. Without one, data lives in memory only.
    pub database: Option<PathBuf>,
}

/// `[cookies]` section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CookieSection {
    /// Signing secret (prefer the `COOKIE_SECRET` env var).
    pub secret: Option<String>,
}

/// `[logging]` section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Directory for rolling JSON log files. Defaults to `<config dir>/logs`.
    pub directory: Option<PathBuf>,
}

impl TwitodonConfig {
    /// Parse a TOML document.
    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Serialize back to TOML.
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Copy with every secret replaced by a placeholder, for display.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if copy.twitter.client_id.is_some() {
            copy.twitter.client_id = Some("<redacted>".to_string());
        }
        if copy.cookies.secret.is_some() {
            copy.cookies.secret = Some("<redacted>".to_string());
        }
        copy
    }
}
