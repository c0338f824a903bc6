//! Server configuration.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Default interval between sweeps of expired store entries (10 minutes).
pub const DEFAULT_PURGE_INTERVAL: Duration = Duration::from_secs(10 * 60);

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind the server to.
    pub bind_address: SocketAddr,

    /// Externally visible origin (`https://twitodon.example`). When `None`
    /// the origin of each request is used for OAuth callback URLs.
    pub public_url: Option<String>,

    /// Mark session cookies `Secure`.
    pub secure_cookies: bool,

    /// Trust `X-Forwarded-Proto` and `X-Forwarded-Host`.
    pub trust_proxy_headers: bool,

    /// Directory served for paths no endpoint matches.
    pub static_dir: Option<PathBuf>,

    /// Enable request logging.
    pub request_logging: bool,

    /// How often expired challenge records are purged.
    pub purge_interval: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from(([0u16; 8], 3000)),
            public_url: None,
            secure_cookies: false,
            trust_proxy_headers: true,
            static_dir: None,
            request_logging: true,
            purge_interval: DEFAULT_PURGE_INTERVAL,
        }
    }
}

impl ServerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the bind address.
    pub fn with_bind_address(mut self, addr: SocketAddr) -> Self {
        self.bind_address = addr;
        self
    }

    /// Set the public origin; a trailing slash is dropped.
    pub fn with_public_url(mut self, url: Option<String>) -> Self {
        self.public_url = url.map(|u| u.trim_end_matches('/').to_string());
        self
    }

    pub fn with_secure_cookies(mut self, secure: bool) -> Self {
        self.secure_cookies = secure;
        self
    }

    pub fn with_trust_proxy_headers(mut self, trust: bool) -> Self {
        self.trust_proxy_headers = trust;
        self
    }

    pub fn with_static_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.static_dir = dir;
        self
    }

    /// Enable or disable request logging.
    pub fn with_request_logging(mut self, enabled: bool) -> Self {
        self.request_logging = enabled;
        self
    }

    pub fn with_purge_interval(mut self, interval: Duration) -> Self {
        self.purge_interval = interval;
        self
    }
}
