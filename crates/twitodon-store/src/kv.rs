//! The key-value capability every persistent component is built on.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;

/// Namespaces used by the record repositories.
pub mod namespaces {
    /// Mastodon app registrations, keyed by server domain.
    pub const MASTODON_APPS: &str = "mastodon_apps";
    /// PKCE challenge records, keyed by login session id.
    pub const TWITTER_CHALLENGES: &str = "twitter_challenges";
    /// Twitter user id to Mastodon address mappings.
    pub const TWITTER_TO_MASTODON_USERMAP: &str = "twitter_to_mastodon_usermap";
}

/// Shared handle to a store backend.
pub type SharedStore = Arc<dyn KeyValueStore>;

/// Namespaced key-value storage with optional per-entry expiry.
///
/// Single-key writes are atomic. Expired entries behave exactly like absent
/// ones for every read and conditional write, whether or not they have been
/// purged yet.
#[async_trait]
pub trait KeyValueStore: Send + Sync + std::fmt::Debug {
    /// Read a live entry.
    async fn get(&self, namespace: &str, key: &str) -> Result<Option<String>>;

    /// Insert or overwrite an entry.
    async fn put(
        &self,
        namespace: &str,
        key: &str,
        value: &str,
        ttl: Option<Duration>,
    ) -> Result<()>;

    /// Insert an entry only if no live entry exists for the key.
    ///
    /// Returns `true` when the value was written.
    async fn insert_if_absent(
        &self,
        namespace: &str,
        key: &str,
        value: &str,
        ttl: Option<Duration>,
    ) -> Result<bool>;

    /// Delete an entry. Returns `true` if a live entry was removed.
    async fn delete(&self, namespace: &str, key: &str) -> Result<bool>;

    /// Drop every expired entry, returning how many were removed.
    async fn purge_expired(&self) -> Result<usize>;
}
