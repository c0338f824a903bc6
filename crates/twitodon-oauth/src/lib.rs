//! OAuth 2.0 clients for the two networks twitodon links.
//!
//! # Components
//!
//! - [`host`] - Mastodon server URL normalization
//! - [`pkce`] - verifier/session id generation and query encoding
//! - [`twitter`] - PKCE authorization-code flow, identity, revocation
//! - [`mastodon`] - dynamic app registration, authorization-code flow, identity
//! - [`following`] - cursor-based follow-list pagination

pub mod error;
pub mod following;
pub mod host;
pub mod mastodon;
pub mod pkce;
pub mod twitter;

pub use error::{OAuthError, Result};
pub use following::{FollowEntry, PAGE_SIZE, PageOutcome, PageSource, collect_all, pages};
pub use host::MastodonHost;
pub use mastodon::{AppRegistry, MastodonAccount, MastodonClient};
pub use pkce::PkceChallenge;
pub use twitter::{
    MAX_TOKEN_LIFETIME_SECS, TokenGrant, TwitterClient, TwitterConfig, TwitterLogin, TwitterUser,
    clamp_expires_in,
};
