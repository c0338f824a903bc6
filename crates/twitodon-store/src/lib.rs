//! Storage for twitodon.
//!
//! Everything persistent goes through the [`KeyValueStore`] capability,
//! which is handed to each component at construction. Two backends are
//! provided:
//!
//! - [`MemoryStore`] - process-local map, used by tests and when no
//!   database is configured
//! - [`SqliteStore`] - single-table SQLite database with embedded migrations
//!
//! The typed repositories in [`records`] sit on top of the raw store and own
//! the JSON encoding of each record kind.

pub mod error;
pub mod kv;
pub mod memory;
pub mod records;
pub mod sqlite;

pub use error::{Result, StoreError};
pub use kv::{KeyValueStore, SharedStore, namespaces};
pub use memory::MemoryStore;
pub use records::{
    CHALLENGE_TTL, ChallengeRecord, Challenges, IdentityMap, ProviderAppRecord, ProviderApps,
    normalize_hostname,
};
pub use sqlite::SqliteStore;
