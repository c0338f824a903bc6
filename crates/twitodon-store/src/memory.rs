//! In-process store backend.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::error::Result;
use crate::kv::KeyValueStore;

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn new(value: &str, ttl: Option<Duration>) -> Self {
        Self {
            value: value.to_string(),
            expires_at: ttl.map(|ttl| Instant::now() + ttl),
        }
    }

    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|at| now < at)
    }
}

/// Store backed by a `HashMap`. Contents are lost when the process exits.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<(String, String), Entry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries, including expired ones not yet purged.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

fn entry_key(namespace: &str, key: &str) -> (String, String) {
    (namespace.to_string(), key.to_string())
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, namespace: &str, key: &str) -> Result<Option<String>> {
        let entries = self.entries.read();
        let now = Instant::now();
        Ok(entries
            .get(&entry_key(namespace, key))
            .filter(|e| e.is_live(now))
            .map(|e| e.value.clone()))
    }

    async fn put(
        &self,
        namespace: &str,
        key: &str,
        value: &str,
        ttl: Option<Duration>,
    ) -> Result<()> {
        self.entries
            .write()
            .insert(entry_key(namespace, key), Entry::new(value, ttl));
        Ok(())
    }

    async fn insert_if_absent(
        &self,
        namespace: &str,
        key: &str,
        value: &str,
        ttl: Option<Duration>,
    ) -> Result<bool> {
        let mut entries = self.entries.write();
        let k = entry_key(namespace, key);
        if entries.get(&k).is_some_and(|e| e.is_live(Instant::now())) {
            return Ok(false);
        }
        entries.insert(k, Entry::new(value, ttl));
        Ok(true)
    }

    async fn delete(&self, namespace: &str, key: &str) -> Result<bool> {
        let removed = self.entries.write().remove(&entry_key(namespace, key));
        Ok(removed.is_some_and(|e| e.is_live(Instant::now())))
    }

    async fn purge_expired(&self) -> Result<usize> {
        let mut entries = self.entries.write();
        let before = entries.len();
        let now = Instant::now();
        entries.retain(|_, e| e.is_live(now));
        Ok(before - entries.len())
    }
}
