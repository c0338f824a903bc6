//! Signed session cookies and request origin.
//!
//! Every piece of in-flight OAuth state travels in a signed cookie. A cookie
//! whose signature does not verify is indistinguishable from a missing one.

use std::convert::Infallible;

use axum::extract::{FromRef, FromRequestParts};
use axum::http::HeaderMap;
use axum::http::request::Parts;
use axum_extra::extract::cookie::{Cookie, Key, SameSite, SignedCookieJar};

use crate::error::{Result, ServerError};
use crate::state::AppState;

/// Login session id, matched against the OAuth `state` parameter.
pub const TWITTER_SESSION_COOKIE: &str = "twitterSession";
/// Twitter bearer token.
pub const TWITTER_TOKEN_COOKIE: &str = "twitterToken";
/// Base URL of the chosen Mastodon server.
pub const MASTODON_HOST_COOKIE: &str = "mastodonHost";
/// Mastodon bearer token.
pub const MASTODON_TOKEN_COOKIE: &str = "mastodonToken";

/// Max age of every session cookie unless a token says otherwise.
pub const SESSION_MAX_AGE_SECS: u64 = 3600;

/// Verified session cookie values; `None` for absent or tampered cookies.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionCookies {
    pub twitter_session: Option<String>,
    pub twitter_token: Option<String>,
    pub mastodon_host: Option<String>,
    pub mastodon_token: Option<String>,
}

impl SessionCookies {
    pub fn from_jar(jar: &SignedCookieJar) -> Self {
        let read = |name: &str| {
            jar.get(name)
                .map(|c| c.value().to_string())
                .filter(|v| !v.is_empty())
        };
        Self {
            twitter_session: read(TWITTER_SESSION_COOKIE),
            twitter_token: read(TWITTER_TOKEN_COOKIE),
            mastodon_host: read(MASTODON_HOST_COOKIE),
            mastodon_token: read(MASTODON_TOKEN_COOKIE),
        }
    }

    pub fn require_twitter_session(&self) -> Result<&str> {
        require(&self.twitter_session, TWITTER_SESSION_COOKIE)
    }

    pub fn require_twitter_token(&self) -> Result<&str> {
        require(&self.twitter_token, TWITTER_TOKEN_COOKIE)
    }

    pub fn require_mastodon_host(&self) -> Result<&str> {
        require(&self.mastodon_host, MASTODON_HOST_COOKIE)
    }

    pub fn require_mastodon_token(&self) -> Result<&str> {
        require(&self.mastodon_token, MASTODON_TOKEN_COOKIE)
    }
}

fn require<'a>(value: &'a Option<String>, name: &'static str) -> Result<&'a str> {
    value
        .as_deref()
        .ok_or(ServerError::MissingSessionCookie(name))
}

impl<S> FromRequestParts<S> for SessionCookies
where
    S: Send + Sync,
    Key: FromRef<S>,
{
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &S,
    ) -> std::result::Result<Self, Self::Rejection> {
        let jar = SignedCookieJar::<Key>::from_request_parts(parts, state).await?;
        Ok(Self::from_jar(&jar))
    }
}

fn session_cookie(
    name: &'static str,
    value: String,
    max_age_secs: u64,
    same_site: SameSite,
    secure: bool,
) -> Cookie<'static> {
    Cookie::build((name, value))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(same_site)
        .max_age(time::Duration::seconds(
            i64::try_from(max_age_secs).unwrap_or(i64::MAX),
        ))
        .build()
}

/// A cookie carrying login-stage state; sent on the provider's redirect back.
pub fn login_cookie(name: &'static str, value: impl Into<String>, secure: bool) -> Cookie<'static> {
    session_cookie(name, value.into(), SESSION_MAX_AGE_SECS, SameSite::Lax, secure)
}

/// A cookie carrying a bearer token.
pub fn token_cookie(
    name: &'static str,
    value: impl Into<String>,
    max_age_secs: u64,
    secure: bool,
) -> Cookie<'static> {
    session_cookie(name, value.into(), max_age_secs, SameSite::Strict, secure)
}

/// A cookie that, once added to a jar, clears `name` in the browser.
pub fn removal_cookie(name: &'static str) -> Cookie<'static> {
    Cookie::build(name).path("/").build()
}

/// The origin (`scheme://host[:port]`) this server is reached at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestOrigin(pub String);

impl RequestOrigin {
    /// Absolute URL of `path` on this origin.
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.0, path)
    }

    /// Work out the origin from configuration and request headers.
    pub fn resolve(
        public_url: Option<&str>,
        trust_proxy_headers: bool,
        headers: &HeaderMap,
    ) -> Option<Self> {
        if let Some(url) = public_url {
            return Some(Self(url.trim_end_matches('/').to_string()));
        }

        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.split(',').next())
                .map(str::trim)
                .filter(|v| !v.is_empty())
        };

        let (scheme, host) = if trust_proxy_headers {
            (
                header("x-forwarded-proto").unwrap_or("http"),
                header("x-forwarded-host").or_else(|| header("host"))?,
            )
        } else {
            ("http", header("host")?)
        };

        Some(Self(format!("{}://{}", scheme, host)))
    }
}

impl FromRequestParts<AppState> for RequestOrigin {
    type Rejection = ServerError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> std::result::Result<Self, Self::Rejection> {
        Self::resolve(
            state.config.public_url.as_deref(),
            state.config.trust_proxy_headers,
            &parts.headers,
        )
        .ok_or_else(|| ServerError::BadRequest("Cannot determine request host".to_string()))
    }
}
