//! Error types for the provider clients.

use twitodon_store::StoreError;

/// Result type alias for this crate.
pub type Result<T> = std::result::Result<T, OAuthError>;

/// Errors raised while talking to Twitter or Mastodon.
#[derive(Debug, thiserror::Error)]
pub enum OAuthError {
    /// The Mastodon server address could not be parsed.
    #[error("Invalid Mastodon host: {0}")]
    InvalidHost(String),

    /// App registration on a Mastodon server did not return 200.
    #[error("Mastodon app registration failed with status {status}")]
    ProviderRegistration { status: u16 },

    /// No usable app credentials are stored for the domain.
    #[error("No app credentials stored for {0}")]
    MissingCredentials(String),

    /// The login session has no live PKCE challenge record.
    #[error("No PKCE challenge for this login session")]
    MissingChallenge,

    /// The token endpoint rejected the authorization code.
    ///
    /// `body` is the provider's response, passed through verbatim.
    #[error("Token exchange failed with status {status}")]
    TokenExchange { status: u16, body: String },

    /// The identity endpoint rejected the bearer token.
    #[error("Upstream identity check failed with status {status}")]
    UpstreamAuth { status: u16 },

    /// The revoke endpoint refused the request.
    #[error("Token revocation failed with status {status}")]
    Revoke { status: u16, body: String },

    /// Network/HTTP error.
    #[error("Network error: {0}")]
    Network(String),

    /// The provider answered 200 with a body we could not interpret.
    #[error("Invalid provider response: {0}")]
    InvalidResponse(String),

    /// Storage error.
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),
}

impl OAuthError {
    /// Upstream HTTP status carried by this error, if any.
    pub fn upstream_status(&self) -> Option<u16> {
        match self {
            OAuthError::ProviderRegistration { status }
            | OAuthError::TokenExchange { status, .. }
            | OAuthError::UpstreamAuth { status }
            | OAuthError::Revoke { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for OAuthError {
    fn from(e: reqwest::Error) -> Self {
        OAuthError::Network(e.to_string())
    }
}
