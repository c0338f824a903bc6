//! Typed repositories over the raw key-value store.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Result, StoreError};
use crate::kv::{SharedStore, namespaces};

/// Lifetime of a PKCE challenge record, consumed or not.
pub const CHALLENGE_TTL: Duration = Duration::from_secs(60 * 60);

// ─────────────────────────────────────────────────────────────────────────────
// Provider apps
// ─────────────────────────────────────────────────────────────────────────────

/// OAuth client credentials issued by a Mastodon server's app registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderAppRecord {
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
}

impl ProviderAppRecord {
    /// Both credentials are present.
    pub fn is_complete(&self) -> bool {
        !self.client_id.is_empty() && !self.client_secret.is_empty()
    }
}

/// Provider app records keyed by server domain. Records are never updated
/// or deleted.
#[derive(Debug, Clone)]
pub struct ProviderApps {
    store: SharedStore,
}

impl ProviderApps {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    pub async fn get(&self, domain: &str) -> Result<Option<ProviderAppRecord>> {
        match self.store.get(namespaces::MASTODON_APPS, domain).await? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    /// Create the record for `domain` unless one already exists.
    ///
    /// Returns `false` when another writer got there first.
    pub async fn insert(&self, domain: &str, record: &ProviderAppRecord) -> Result<bool> {
        let raw = serde_json::to_string(record)?;
        self.store
            .insert_if_absent(namespaces::MASTODON_APPS, domain, &raw, None)
            .await
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// PKCE challenges
// ─────────────────────────────────────────────────────────────────────────────

/// Server-held PKCE verifier for one in-flight Twitter login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChallengeRecord {
    pub verifier: String,
    pub created_at: DateTime<Utc>,
}

impl ChallengeRecord {
    pub fn new(verifier: impl Into<String>) -> Self {
        Self {
            verifier: verifier.into(),
            created_at: Utc::now(),
        }
    }
}

/// Challenge records keyed by login session id, expiring after
/// [`CHALLENGE_TTL`].
#[derive(Debug, Clone)]
pub struct Challenges {
    store: SharedStore,
}

impl Challenges {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    pub async fn insert(&self, session_id: &str, record: &ChallengeRecord) -> Result<()> {
        let raw = serde_json::to_string(record)?;
        self.store
            .put(
                namespaces::TWITTER_CHALLENGES,
                session_id,
                &raw,
                Some(CHALLENGE_TTL),
            )
            .await
    }

    pub async fn get(&self, session_id: &str) -> Result<Option<ChallengeRecord>> {
        match self
            .store
            .get(namespaces::TWITTER_CHALLENGES, session_id)
            .await?
        {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Identity mapping
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
struct MappingRecord {
    mastodon_id: String,
}

/// Reduce a server URL or bare hostname to its lowercase hostname.
///
/// `https://Mastodon.Social/about` and `mastodon.social` both yield
/// `mastodon.social`.
pub fn normalize_hostname(host: &str) -> Result<String> {
    let trimmed = host.trim();
    let candidate = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    };

    Url::parse(&candidate)
        .ok()
        .and_then(|url| url.host_str().map(str::to_string))
        .filter(|h| !h.is_empty())
        .ok_or_else(|| StoreError::InvalidHost(host.to_string()))
}

/// Twitter user id → Mastodon address (`handle@hostname`). Last write wins.
#[derive(Debug, Clone)]
pub struct IdentityMap {
    store: SharedStore,
}

impl IdentityMap {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    /// Link `source_id` to `handle` on `host`, replacing any previous link.
    ///
    /// Returns the stored address.
    pub async fn upsert(&self, source_id: &str, handle: &str, host: &str) -> Result<String> {
        let address = format!("{}@{}", handle, normalize_hostname(host)?);
        let raw = serde_json::to_string(&MappingRecord {
            mastodon_id: address.clone(),
        })?;
        self.store
            .put(
                namespaces::TWITTER_TO_MASTODON_USERMAP,
                source_id,
                &raw,
                None,
            )
            .await?;
        tracing::debug!(source_id, address = %address, "Identity mapping stored");
        Ok(address)
    }

    /// Address linked to `source_id`, or `None` when not yet linked.
    pub async fn lookup(&self, source_id: &str) -> Result<Option<String>> {
        match self
            .store
            .get(namespaces::TWITTER_TO_MASTODON_USERMAP, source_id)
            .await?
        {
            Some(raw) => {
                let record: MappingRecord = serde_json::from_str(&raw)?;
                Ok(Some(record.mastodon_id))
            }
            None => Ok(None),
        }
    }

    /// Remove the link for `source_id`. Removing an absent link is not an
    /// error.
    pub async fn remove(&self, source_id: &str) -> Result<()> {
        let existed = self
            .store
            .delete(namespaces::TWITTER_TO_MASTODON_USERMAP, source_id)
            .await?;
        tracing::debug!(source_id, existed, "Identity mapping removed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{MemoryStore, SqliteStore};

    fn memory() -> SharedStore {
        Arc::new(MemoryStore::new())
    }

    #[test]
    fn test_normalize_hostname() {
        assert_eq!(
            normalize_hostname("https://mastodon.social").unwrap(),
            "mastodon.social"
        );
        assert_eq!(
            normalize_hostname("https://Mastodon.Social/about?x=1").unwrap(),
            "mastodon.social"
        );
        assert_eq!(normalize_hostname("fosstodon.org").unwrap(), "fosstodon.org");
        assert_eq!(
            normalize_hostname("http://127.0.0.1:3000").unwrap(),
            "127.0.0.1"
        );
        assert!(normalize_hostname("").is_err());
        assert!(normalize_hostname("https://").is_err());
    }

    #[tokio::test]
    async fn test_upsert_then_lookup() {
        let map = IdentityMap::new(memory());
        map.upsert("123", "alice", "https://mastodon.social")
            .await
            .unwrap();
        assert_eq!(
            map.lookup("123").await.unwrap().as_deref(),
            Some("alice@mastodon.social")
        );
    }

    #[tokio::test]
    async fn test_upsert_last_write_wins() {
        let map = IdentityMap::new(memory());
        map.upsert("123", "alice", "https://mastodon.social")
            .await
            .unwrap();
        map.upsert("123", "alice", "https://hachyderm.io/").await.unwrap();
        assert_eq!(
            map.lookup("123").await.unwrap().as_deref(),
            Some("alice@hachyderm.io")
        );
    }

    #[tokio::test]
    async fn test_lookup_unknown_is_none() {
        let map = IdentityMap::new(memory());
        assert!(map.lookup("never-written").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_remove_is_idempotent() {
        let map = IdentityMap::new(memory());
        map.upsert("123", "alice", "mastodon.social").await.unwrap();
        map.remove("123").await.unwrap();
        map.remove("123").await.unwrap();
        assert!(map.lookup("123").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_upsert_rejects_bad_host() {
        let map = IdentityMap::new(memory());
        let err = map.upsert("123", "alice", "https://").await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidHost(_)));
        assert!(map.lookup("123").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_provider_app_created_once() {
        let apps = ProviderApps::new(Arc::new(SqliteStore::open_in_memory().unwrap()));
        let first = ProviderAppRecord {
            client_id: "id-1".to_string(),
            client_secret: "secret-1".to_string(),
        };
        let second = ProviderAppRecord {
            client_id: "id-2".to_string(),
            client_secret: "secret-2".to_string(),
        };

        assert!(apps.insert("mastodon.social", &first).await.unwrap());
        assert!(!apps.insert("mastodon.social", &second).await.unwrap());
        assert_eq!(apps.get("mastodon.social").await.unwrap(), Some(first));
        assert!(apps.get("fosstodon.org").await.unwrap().is_none());
    }

    #[test]
    fn test_provider_app_completeness() {
        let partial: ProviderAppRecord = serde_json::from_str(r#"{"client_id":"abc"}"#).unwrap();
        assert!(!partial.is_complete());
    }

    #[tokio::test]
    async fn test_challenge_roundtrip() {
        let challenges = Challenges::new(memory());
        let record = ChallengeRecord::new("verifier-value");
        challenges.insert("session-1", &record).await.unwrap();

        let loaded = challenges.get("session-1").await.unwrap().unwrap();
        assert_eq!(loaded.verifier, "verifier-value");
        assert!(challenges.get("session-2").await.unwrap().is_none());
    }
}
