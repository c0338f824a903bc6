//! Twitter OAuth 2.0 (PKCE) client.
//!
//! The login flow is the authorization-code grant with a `plain` PKCE
//! challenge. The verifier never leaves the server: it is stored as a
//! challenge record under a random session id, and that id travels through
//! the provider as the `state` parameter.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use twitodon_store::{ChallengeRecord, Challenges};

use crate::error::{OAuthError, Result};
use crate::following::{FollowEntry, PAGE_SIZE, PageOutcome, PageSource, collect_all};
use crate::pkce::{CODE_CHALLENGE_METHOD, PkceChallenge, encode_query, generate_session_id};

/// Read-only scopes requested at login.
pub const TWITTER_SCOPES: &str = "tweet.read users.read follows.read";

/// Upper bound for token lifetimes; also the default when the provider
/// sends none.
pub const MAX_TOKEN_LIFETIME_SECS: u64 = 3600;

/// Twitter endpoints and the registered client id.
#[derive(Debug, Clone)]
pub struct TwitterConfig {
    pub client_id: String,
    pub authorize_url: String,
    pub api_base: String,
}

impl TwitterConfig {
    pub const DEFAULT_AUTHORIZE_URL: &'static str = "https://twitter.com/i/oauth2/authorize";
    pub const DEFAULT_API_BASE: &'static str = "https://api.twitter.com";

    /// Config pointing at the public Twitter endpoints.
    pub fn new(client_id: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            authorize_url: Self::DEFAULT_AUTHORIZE_URL.to_string(),
            api_base: Self::DEFAULT_API_BASE.to_string(),
        }
    }

    /// Override the authorize URL and API base (mock servers, proxies).
    pub fn with_endpoints(
        mut self,
        authorize_url: impl Into<String>,
        api_base: impl Into<String>,
    ) -> Self {
        self.authorize_url = authorize_url.into();
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    fn api(&self, path: &str) -> String {
        format!("{}{}", self.api_base, path)
    }
}

/// Authorization URL plus the session id that keys its challenge record.
#[derive(Debug, Clone)]
pub struct TwitterLogin {
    pub authorization_url: String,
    pub session_id: String,
}

/// Bearer token and its clamped lifetime in seconds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenGrant {
    pub access_token: String,
    pub expires_in: u64,
}

/// The authenticated Twitter user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TwitterUser {
    pub id: String,
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct MeResponse {
    data: TwitterUser,
}

#[derive(Debug, Deserialize)]
struct FollowingResponse {
    #[serde(default)]
    data: Option<Vec<FollowEntry>>,
    #[serde(default)]
    meta: Option<FollowingMeta>,
}

#[derive(Debug, Deserialize)]
struct FollowingMeta {
    #[serde(default)]
    result_count: Option<u64>,
    #[serde(default)]
    next_token: Option<String>,
}

/// Clamp a provider-reported `expires_in` to `1..=3600` seconds.
///
/// Absent, zero, or negative values become the maximum.
pub fn clamp_expires_in(expires_in: Option<i64>) -> u64 {
    match expires_in {
        Some(secs) if secs > 0 => (secs as u64).min(MAX_TOKEN_LIFETIME_SECS),
        _ => MAX_TOKEN_LIFETIME_SECS,
    }
}

/// Client for the Twitter OAuth and users API.
#[derive(Debug, Clone)]
pub struct TwitterClient {
    http: reqwest::Client,
    config: TwitterConfig,
    challenges: Challenges,
}

impl TwitterClient {
    pub fn new(http: reqwest::Client, config: TwitterConfig, challenges: Challenges) -> Self {
        Self {
            http,
            config,
            challenges,
        }
    }

    pub fn config(&self) -> &TwitterConfig {
        &self.config
    }

    /// Start a login: persist a fresh challenge record and build the
    /// authorization URL for it.
    pub async fn build_login_url(&self, redirect_uri: &str) -> Result<TwitterLogin> {
        let pkce = PkceChallenge::generate();
        let session_id = generate_session_id();

        self.challenges
            .insert(&session_id, &ChallengeRecord::new(pkce.verifier.as_str()))
            .await?;

        let query = encode_query(&[
            ("response_type", "code"),
            ("client_id", &self.config.client_id),
            ("redirect_uri", redirect_uri),
            ("state", &session_id),
            ("scope", TWITTER_SCOPES),
            ("code_challenge", &pkce.challenge),
            ("code_challenge_method", CODE_CHALLENGE_METHOD),
        ]);

        tracing::debug!(session_id = %session_id, "Issued Twitter login URL");

        Ok(TwitterLogin {
            authorization_url: format!("{}?{}", self.config.authorize_url, query),
            session_id,
        })
    }

    /// Exchange an authorization code for a bearer token.
    ///
    /// The verifier is loaded from the challenge record of `session_id`. A
    /// rejection from the token endpoint is returned as
    /// [`OAuthError::TokenExchange`] carrying the provider's body unchanged.
    pub async fn exchange_code(
        &self,
        code: &str,
        session_id: &str,
        redirect_uri: &str,
    ) -> Result<TokenGrant> {
        let challenge = self
            .challenges
            .get(session_id)
            .await?
            .ok_or(OAuthError::MissingChallenge)?;

        let response = self
            .http
            .post(self.config.api("/2/oauth2/token"))
            .form(&[
                ("code", code),
                ("grant_type", "authorization_code"),
                ("client_id", self.config.client_id.as_str()),
                ("redirect_uri", redirect_uri),
                ("code_verifier", challenge.verifier.as_str()),
            ])
            .send()
            .await
            .map_err(|e| OAuthError::Network(format!("Token exchange request failed: {}", e)))?;

        let status = response.status();
        let body = response.text().await?;

        if status != StatusCode::OK {
            tracing::warn!(status = status.as_u16(), "Twitter token exchange rejected");
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
            expires_in: clamp_expires_in(tokens.expires_in),
        })
    }

    /// Look up the user the bearer token belongs to.
    pub async fn who_am_i(&self, token: &str) -> Result<TwitterUser> {
        let response = self
            .http
            .get(self.config.api("/2/users/me"))
            .bearer_auth(token)
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(OAuthError::UpstreamAuth {
                status: status.as_u16(),
            });
        }

        let me: MeResponse = response
            .json()
            .await
            .map_err(|e| OAuthError::InvalidResponse(format!("Failed to parse user: {}", e)))?;
        Ok(me.data)
    }

    /// Revoke a bearer token.
    pub async fn revoke(&self, token: &str) -> Result<()> {
        let response = self
            .http
            .post(self.config.api("/2/oauth2/revoke"))
            .form(&[
                ("token", token),
                ("token_type_hint", "access_token"),
                ("client_id", self.config.client_id.as_str()),
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

    /// Page source over the accounts `user_id` follows.
    pub fn following<'a>(&'a self, token: &'a str, user_id: &'a str) -> TwitterFollowing<'a> {
        TwitterFollowing {
            client: self,
            token,
            user_id,
        }
    }

    /// Every account `user_id` follows, in provider order.
    ///
    /// Stops early, keeping what was fetched, when a page request fails.
    pub async fn list_all_following(&self, token: &str, user_id: &str) -> Vec<FollowEntry> {
        let all = collect_all(self.following(token, user_id)).await;
        tracing::info!(user_id, count = all.len(), "Fetched Twitter following list");
        all
    }
}

/// [`PageSource`] for `GET /2/users/{id}/following`.
#[derive(Debug, Clone, Copy)]
pub struct TwitterFollowing<'a> {
    client: &'a TwitterClient,
    token: &'a str,
    user_id: &'a str,
}

#[async_trait]
impl PageSource for TwitterFollowing<'_> {
    async fn fetch_page(&self, cursor: Option<&str>) -> PageOutcome {
        let page_size = PAGE_SIZE.to_string();
        let mut params = vec![("max_results", page_size.as_str())];
        if let Some(cursor) = cursor {
            params.push(("pagination_token", cursor));
        }

        let url = format!(
            "{}?{}",
            self.client.config.api(&format!(
                "/2/users/{}/following",
                urlencoding::encode(self.user_id)
            )),
            encode_query(&params)
        );

        let response = match self.client.http.get(url).bearer_auth(self.token).send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(error = %e, "Following page request failed");
                return PageOutcome::Failed { status: None };
            }
        };

        let status = response.status();
        if !status.is_success() {
            return PageOutcome::Failed {
                status: Some(status.as_u16()),
            };
        }

        let Ok(page) = response.json::<FollowingResponse>().await else {
            return PageOutcome::Exhausted;
        };

        match page.meta {
            Some(FollowingMeta {
                result_count: Some(count),
                next_token,
            }) if count > 0 => PageOutcome::Page {
                entries: page.data.unwrap_or_default(),
                next_cursor: next_token,
            },
            _ => PageOutcome::Exhausted,
        }
    }
}
