//! Application state shared across handlers.

use std::sync::Arc;

use axum::extract::FromRef;
use axum_extra::extract::cookie::Key;
use twitodon_config::MIN_COOKIE_SECRET_LEN;
use twitodon_oauth::{MastodonClient, TwitterClient, TwitterConfig};
use twitodon_store::{Challenges, IdentityMap, ProviderApps, SharedStore};

use crate::config::ServerConfig;
use crate::error::{Result, ServerError};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Server configuration.
    pub config: Arc<ServerConfig>,

    /// Backing key-value store.
    pub store: SharedStore,

    /// Twitter OAuth and users API.
    pub twitter: Arc<TwitterClient>,

    /// Mastodon OAuth and accounts API, with its app registry.
    pub mastodon: Arc<MastodonClient>,

    /// Twitter id to Mastodon address links.
    pub identities: IdentityMap,

    /// Signing key for session cookies.
    cookie_key: Key,
}

impl AppState {
    /// Wire the provider clients and repositories onto one store.
    ///
    /// Fails when `cookie_secret` is shorter than [`MIN_COOKIE_SECRET_LEN`].
    pub fn new(
        config: ServerConfig,
        store: SharedStore,
        twitter: TwitterConfig,
        cookie_secret: &[u8],
    ) -> Result<Self> {
        if cookie_secret.len() < MIN_COOKIE_SECRET_LEN {
            return Err(ServerError::Config(format!(
                "cookie secret must be at least {} bytes",
                MIN_COOKIE_SECRET_LEN
            )));
        }

        let http = reqwest::Client::builder()
            .user_agent(concat!("twitodon/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ServerError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        let twitter = TwitterClient::new(http.clone(), twitter, Challenges::new(store.clone()));
        let mastodon = MastodonClient::new(http, ProviderApps::new(store.clone()));

        Ok(Self {
            config: Arc::new(config),
            identities: IdentityMap::new(store.clone()),
            store,
            twitter: Arc::new(twitter),
            mastodon: Arc::new(mastodon),
            cookie_key: Key::derive_from(cookie_secret),
        })
    }

    /// The session cookie signing key.
    pub fn cookie_key(&self) -> &Key {
        &self.cookie_key
    }
}

impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.cookie_key.clone()
    }
}
