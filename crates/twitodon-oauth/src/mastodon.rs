//! Mastodon OAuth 2.0 client.
//!
//! Every Mastodon server is its own OAuth provider, so the client id and
//! secret are obtained by registering an app the first time a user picks a
//! server. [`AppRegistry`] owns that lookup-or-register step.

use std::collections::HashMap;
use std::sync::Arc;

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use twitodon_store::{ProviderAppRecord, ProviderApps};

use crate::error::{OAuthError, Result};
use crate::host::MastodonHost;
use crate::pkce::encode_query;
use crate::twitter::{MAX_TOKEN_LIFETIME_SECS, TokenGrant};

/// Application name shown to users on the Mastodon consent screen.
pub const APP_NAME: &str = "twitodon";

/// Scopes requested at registration and login.
pub const MASTODON_SCOPES: &str = "read:accounts";

// ─────────────────────────────────────────────────────────────────────────────
// App registry
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct RegisteredApp {
    client_id: String,
    client_secret: String,
}

/// Per-domain Mastodon app credentials, registered on first use.
///
/// First logins to the same domain queue behind one registration; other
/// domains are never held up by it.
#[derive(Debug)]
pub struct AppRegistry {
    http: reqwest::Client,
    apps: ProviderApps,
    registrations: parking_lot::Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl AppRegistry {
    pub fn new(http: reqwest::Client, apps: ProviderApps) -> Self {
        Self {
            http,
            apps,
            registrations: parking_lot::Mutex::new(HashMap::new()),
        }
    }

    fn registration_lock(&self, domain: &str) -> Arc<Mutex<()>> {
        self.registrations
            .lock()
            .entry(domain.to_string())
            .or_default()
            .clone()
    }

    /// Client id for `host`, registering an app with the server if this
    /// domain has never been seen.
    ///
    /// Registration is attempted once; any status other than 200 aborts with
    /// [`OAuthError::ProviderRegistration`] and stores nothing.
    pub async fn resolve_or_register(
        &self,
        host: &MastodonHost,
        redirect_uri: &str,
    ) -> Result<String> {
        if let Some(app) = self.apps.get(host.domain()).await? {
            return Ok(app.client_id);
        }

        let lock = self.registration_lock(host.domain());
        let _guard = lock.lock().await;
        if let Some(app) = self.apps.get(host.domain()).await? {
            return Ok(app.client_id);
        }

        let record = self.register(host, redirect_uri).await?;
        if self.apps.insert(host.domain(), &record).await? {
            tracing::info!(domain = host.domain(), "Registered Mastodon app");
            return Ok(record.client_id);
        }

        // Another process registered this domain in the meantime; keep theirs.
        self.apps
            .get(host.domain())
            .await?
            .map(|app| app.client_id)
            .ok_or_else(|| OAuthError::MissingCredentials(host.domain().to_string()))
    }

    /// Stored credentials for `domain`.
    pub async fn credentials(&self, domain: &str) -> Result<ProviderAppRecord> {
        self.apps
            .get(domain)
            .await?
            .filter(ProviderAppRecord::is_complete)
            .ok_or_else(|| OAuthError::MissingCredentials(domain.to_string()))
    }

    async fn register(&self, host: &MastodonHost, redirect_uri: &str) -> Result<ProviderAppRecord> {
        let response = self
            .http
            .post(host.endpoint("/api/v1/apps"))
            .form(&[
                ("client_name", APP_NAME),
                ("redirect_uris", redirect_uri),
                ("scopes", MASTODON_SCOPES),
            ])
            .send()
            .await
            .map_err(|e| OAuthError::Network(format!("App registration request failed: {}", e)))?;

        let status = response.status();
        if status != StatusCode::OK {
            tracing::warn!(
                domain = host.domain(),
                status = status.as_u16(),
                "Mastodon app registration rejected"
            );
            return Err(OAuthError::ProviderRegistration {
                status: status.as_u16(),
            });
        }

        let app: RegisteredApp = response.json().await.map_err(|e| {
            OAuthError::InvalidResponse(format!("Failed to parse app registration: {}", e))
        })?;

        Ok(ProviderAppRecord {
            client_id: app.client_id,
            client_secret: app.client_secret,
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Client
// ─────────────────────────────────────────────────────────────────────────────

/// The authenticated Mastodon account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MastodonAccount {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub acct: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Client for any Mastodon server's OAuth and accounts API.
#[derive(Debug, Clone)]
pub struct MastodonClient {
    http: reqwest::Client,
    registry: Arc<AppRegistry>,
}

impl MastodonClient {
    pub fn new(http: reqwest::Client, apps: ProviderApps) -> Self {
        Self {
            registry: Arc::new(AppRegistry::new(http.clone(), apps)),
            http,
        }
    }

    pub fn registry(&self) -> &AppRegistry {
        &self.registry
    }

    /// Authorization URL for `host`, provisioning the app if needed.
    pub async fn build_login_url(&self, host: &MastodonHost, redirect_uri: &str) -> Result<String> {
        let client_id = self
            .registry
            .resolve_or_register(host, redirect_uri)
            .await?;

        let query = encode_query(&[
            ("response_type", "code"),
            ("client_id", &client_id),
            ("redirect_uri", redirect_uri),
            ("scope", MASTODON_SCOPES),
        ]);
        Ok(format!("{}?{}", host.endpoint("/oauth/authorize"), query))
    }

    /// Exchange an authorization code for a bearer token.
    ///
    /// Mastodon tokens are kept for a fixed hour regardless of what the
    /// server reports.
    pub async fn exchange_code(
        &self,
        host: &MastodonHost,
        code: &str,
        redirect_uri: &str,
    ) -> Result<TokenGrant> {
        let app = self.registry.credentials(host.domain()).await?;

        let response = self
            .http
            .post(host.endpoint("/oauth/token"))
            .form(&[
                ("code", code),
                ("grant_type", "authorization_code"),
                ("client_id", app.client_id.as_str()),
                ("client_secret", app.client_secret.as_str()),
                ("redirect_uri", redirect_uri),
                ("scope", MASTODON_SCOPES),
            ])
            .send()
            .await
            .map_err(|e| OAuthError::Network(format!("Token exchange request failed: {}", e)))?;

        let status = response.status();
        let body = response.text().await?;
        if status != StatusCode::OK {
            tracing::warn!(
                domain = host.domain(),
                status = status.as_u16(),
                "Mastodon token exchange rejected"
            );
            return Err(OAuthError::TokenExchange {
                status: status.as_u16(),
                body,
            });
        }

        let tokens: TokenResponse = serde_json::from_str(&body).map_err(|e| {
            OAuthError::InvalidResponse(format!("Failed to parse token response: {}", e))
        })?;

        Ok(TokenGrant {
            access_token: tokens.access_token,
            expires_in: MAX_TOKEN_LIFETIME_SECS,
        })
    }

    /// Look up the account the bearer token belongs to on `host`.
    pub async fn who_am_i(&self, host: &MastodonHost, token: &str) -> Result<MastodonAccount> {
        let response = self
            .http
            .get(host.endpoint("/api/v1/accounts/verify_credentials"))
            .bearer_auth(token)
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(OAuthError::UpstreamAuth {
                status: status.as_u16(),
            });
        }

        response
            .json()
            .await
            .map_err(|e| OAuthError::InvalidResponse(format!("Failed to parse account: {}", e)))
    }

    /// Revoke a bearer token with the app credentials of `host`.
    pub async fn revoke(&self, host: &MastodonHost, token: &str) -> Result<()> {
        let app = self.registry.credentials(host.domain()).await?;

        let response = self
            .http
            .post(host.endpoint("/oauth/revoke"))
            .form(&[
                ("client_id", app.client_id.as_str()),
                ("client_secret", app.client_secret.as_str()),
                ("token", token),
            ])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if status != StatusCode::OK {
            return Err(OAuthError::Revoke {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}
