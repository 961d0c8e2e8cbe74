//! Durable mirror of the query cache
//!
//! A CLI process lives for one command, so entries are written through to
//! the session database and read back by the next command.

use chrono::{DateTime, Utc};

use super::CacheTtl;
use super::key::QueryKey;
use crate::error::StoreError;

/// One cache entry as kept on disk, timestamps in wall-clock time
#[derive(Debug, Clone, PartialEq)]
pub struct StoredEntry {
    pub key: QueryKey,
    pub value: serde_json::Value,
    pub fetched_at: DateTime<Utc>,
    pub unused_since: DateTime<Utc>,
    pub ttl: CacheTtl,
    pub invalidated: bool,
}

/// Persistence used by [`QueryCache`](super::QueryCache).
///
/// Failures are logged by the cache and never reach callers; the in-memory
/// map stays authoritative for the running process.
pub trait CacheBackend: Send + Sync {
    /// Every stored entry. Rows that cannot be decoded are dropped.
    fn load_entries(&self) -> Result<Vec<StoredEntry>, StoreError>;

    /// Insert or replace the row for `entry.key`
    fn put_entry(&self, entry: &StoredEntry) -> Result<(), StoreError>;

    /// Delete rows by key fingerprint
    fn delete_entries(&self, fingerprints: &[String]) -> Result<(), StoreError>;
}
