//! Secret resolution.
//!
//! Resolution order:
//! 1. Environment variable
//! 2. Config file (with warning)

use crate::{ConfigError, Result, TwitodonConfig};

/// Env var holding the Twitter OAuth client id.
pub const TWITTER_CLIENT_ID_ENV: &str = "TWITTER_CLIENT_ID";

/// Env var holding the cookie signing secret.
pub const COOKIE_SECRET_ENV: &str = "COOKIE_SECRET";

/// Shortest cookie secret accepted, in bytes.
pub const MIN_COOKIE_SECRET_LEN: usize = 32;

/// A secret value with provenance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSecret {
    pub value: String,
    pub source: SecretSource,
}

/// Where a secret was resolved from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecretSource {
    /// Environment variable.
    EnvVar(String),
    /// Config file (plaintext).
    ConfigFile,
}

impl std::fmt::Display for SecretSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SecretSource::EnvVar(var) => write!(f, "env var {}", var),
            SecretSource::ConfigFile => write!(f, "config file (plaintext)"),
        }
    }
}

/// Secrets the server cannot start without.
#[derive(Debug, Clone)]
pub struct ResolvedSecrets {
    pub twitter_client_id: ResolvedSecret,
    pub cookie_secret: ResolvedSecret,
}

/// Resolve one secret from `env_var`, falling back to the config value.
///
/// `env` looks up a variable; pass `|k| std::env::var(k).ok()` for the
/// process environment.
pub fn resolve_secret(
    env: impl Fn(&str) -> Option<String>,
    env_var: &str,
    config_value: Option<&str>,
) -> Option<ResolvedSecret> {
    if let Some(value) = env(env_var).filter(|v| !v.is_empty()) {
        return Some(ResolvedSecret {
            value,
            source: SecretSource::EnvVar(env_var.to_string()),
        });
    }

    config_value
        .filter(|v| !v.is_empty())
        .map(|v| ResolvedSecret {
            value: v.to_string(),
            source: SecretSource::ConfigFile,
        })
}

/// Resolve and validate every required secret.
pub fn resolve_secrets(
    config: &TwitodonConfig,
    env: impl Fn(&str) -> Option<String>,
) -> Result<ResolvedSecrets> {
    let twitter_client_id = resolve_secret(
        &env,
        TWITTER_CLIENT_ID_ENV,
        config.twitter.client_id.as_deref(),
    )
    .ok_or_else(|| ConfigError::MissingSecret {
        name: "Twitter client id".to_string(),
        env_var: TWITTER_CLIENT_ID_ENV.to_string(),
    })?;

    let cookie_secret = resolve_secret(&env, COOKIE_SECRET_ENV, config.cookies.secret.as_deref())
        .ok_or_else(|| ConfigError::MissingSecret {
            name: "Cookie secret".to_string(),
            env_var: COOKIE_SECRET_ENV.to_string(),
        })?;

    let len = cookie_secret.value.len();
    if len < MIN_COOKIE_SECRET_LEN {
        return Err(ConfigError::WeakCookieSecret {
            len,
            min: MIN_COOKIE_SECRET_LEN,
        });
    }

    for (name, secret) in [
        ("twitter client id", &twitter_client_id),
        ("cookie secret", &cookie_secret),
    ] {
        tracing::debug!(secret = name, source = %secret.source, "Resolved secret");
    }

    Ok(ResolvedSecrets {
        twitter_client_id,
        cookie_secret,
    })
}
