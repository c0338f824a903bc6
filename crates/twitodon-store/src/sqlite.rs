use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension, params};

use crate::error::{Result, StoreError};
use crate::kv::KeyValueStore;

mod embedded {
    use refinery::embed_migrations;
    embed_migrations!("migrations");
}

/// Key-value store persisted in a single SQLite table.
///
/// Thread-safe via internal `Mutex<Connection>`. Expiry times are stored as
/// unix milliseconds; `NULL` means the entry never expires.
#[derive(Debug)]
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) the database at `path` and run pending migrations.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;

        let mut store = Self {
            conn: Mutex::new(conn),
        };
        store.run_migrations()?;
        tracing::debug!(path = %path.display(), "Opened SQLite store");
        Ok(store)
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let mut store = Self {
            conn: Mutex::new(conn),
        };
        store.run_migrations()?;
        Ok(store)
    }

    fn run_migrations(&mut self) -> Result<()> {
        let conn = self.conn.get_mut();
        embedded::migrations::runner()
            .run(conn)
            .map_err(|e| StoreError::Migration(e.to_string()))?;
        Ok(())
    }
}

fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

fn expiry_ms(ttl: Option<Duration>) -> Option<i64> {
    ttl.map(|ttl| now_ms().saturating_add(i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX)))
}

#[async_trait]
impl KeyValueStore for SqliteStore {
    async fn get(&self, namespace: &str, key: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .lock()
            .query_row(
                "SELECT value FROM kv
                 WHERE namespace = ?1 AND key = ?2
                   AND (expires_at IS NULL OR expires_at > ?3)",
                params![namespace, key, now_ms()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    async fn put(
        &self,
        namespace: &str,
        key: &str,
        value: &str,
        ttl: Option<Duration>,
    ) -> Result<()> {
        self.conn.lock().execute(
            "INSERT INTO kv (namespace, key, value, expires_at) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT (namespace, key)
             DO UPDATE SET value = excluded.value, expires_at = excluded.expires_at",
            params![namespace, key, value, expiry_ms(ttl)],
        )?;
        Ok(())
    }

    async fn insert_if_absent(
        &self,
        namespace: &str,
        key: &str,
        value: &str,
        ttl: Option<Duration>,
    ) -> Result<bool> {
        // An expired row counts as absent, so the upsert only fires for it.
        let changed = self.conn.lock().execute(
            "INSERT INTO kv (namespace, key, value, expires_at) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT (namespace, key)
             DO UPDATE SET value = excluded.value, expires_at = excluded.expires_at
             WHERE kv.expires_at IS NOT NULL AND kv.expires_at <= ?5",
            params![namespace, key, value, expiry_ms(ttl), now_ms()],
        )?;
        Ok(changed > 0)
    }

    async fn delete(&self, namespace: &str, key: &str) -> Result<bool> {
        let conn = self.conn.lock();
        let live = conn.execute(
            "DELETE FROM kv WHERE namespace = ?1 AND key = ?2
               AND (expires_at IS NULL OR expires_at > ?3)",
            params![namespace, key, now_ms()],
        )?;
        conn.execute(
            "DELETE FROM kv WHERE namespace = ?1 AND key = ?2",
            params![namespace, key],
        )?;
        Ok(live > 0)
    }

    async fn purge_expired(&self) -> Result<usize> {
        let removed = self.conn.lock().execute(
            "DELETE FROM kv WHERE expires_at IS NOT NULL AND expires_at <= ?1",
            params![now_ms()],
        )?;
        Ok(removed)
    }
}
