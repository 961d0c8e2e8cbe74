//! SQLite session database
//!
//! Holds the session as one row per key in a `storage` table (multi-key
//! writes run in a single transaction) and the persisted query cache in a
//! `query_cache` table.

use chrono::{DateTime, Utc};
use log::warn;
use rusqlite::{Connection, OptionalExtension, params};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use super::StorageBackend;
use crate::cache::CacheTtl;
use crate::cache::key::{QueryKey, QueryKind};
use crate::cache::persist::{CacheBackend, StoredEntry};
use crate::error::StoreError;

/// Schema version - increment to rebuild the cache table.
/// The session table is never dropped: losing it signs the user out.
const SCHEMA_VERSION: i32 = 2;

type Result<T> = std::result::Result<T, StoreError>;

/// Session database backend
pub struct SqliteBackend {
    conn: Mutex<Connection>,
    path: PathBuf,
}

impl SqliteBackend {
    /// Open or create the database at `path`
    pub fn open_at(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| StoreError::Io(format!("Failed to create session dir: {}", e)))?;
        }

        let conn = Connection::open(path)?;

        let version: i32 = conn
            .pragma_query_value(None, "user_version", |r| r.get(0))
            .unwrap_or(0);

        if version != 0 && version != SCHEMA_VERSION {
            log::info!(
                "Session schema version mismatch ({} != {}), rebuilding cache table",
                version,
                SCHEMA_VERSION
            );
            conn.execute_batch("DROP TABLE IF EXISTS query_cache;")?;
        }

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS storage (
                key TEXT PRIMARY KEY NOT NULL,
                value TEXT NOT NULL,
                updated_at INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS query_cache (
                fingerprint TEXT PRIMARY KEY NOT NULL,
                kind TEXT NOT NULL,
                params TEXT NOT NULL,
                value TEXT NOT NULL,
                fetched_at INTEGER NOT NULL,
                unused_since INTEGER NOT NULL,
                stale_ms INTEGER NOT NULL,
                gc_ms INTEGER NOT NULL,
                invalidated INTEGER NOT NULL
            );
            "#,
        )?;
        conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;

        // Tokens are credentials: owner-only
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Ok(meta) = std::fs::metadata(path) {
                let mut perms = meta.permissions();
                perms.set_mode(0o600);
                let _ = std::fs::set_permissions(path, perms);
            }
        }

        Ok(Self {
            conn: Mutex::new(conn),
            path: path.to_path_buf(),
        })
    }

    /// Location of the database file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Io("session database lock poisoned".to_string()))
    }
}

impl StorageBackend for SqliteBackend {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        let conn = self.conn()?;
        let value = conn
            .query_row("SELECT value FROM storage WHERE key = ?1", [key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(value)
    }

    fn set_items(&self, items: &[(&str, &str)]) -> Result<()> {
        let mut conn = self.conn()?;
        let now = chrono::Utc::now().timestamp();
        let tx = conn.transaction()?;
        for (key, value) in items {
            tx.execute(
                "INSERT OR REPLACE INTO storage (key, value, updated_at) VALUES (?1, ?2, ?3)",
                params![key, value, now],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    fn remove_items(&self, keys: &[&str]) -> Result<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        for key in keys {
            tx.execute("DELETE FROM storage WHERE key = ?1", [key])?;
        }
        tx.commit()?;
        Ok(())
    }
}

/// Raw `query_cache` row
struct CacheRow {
    fingerprint: String,
    kind: String,
    params: String,
    value: String,
    fetched_at: i64,
    unused_since: i64,
    stale_ms: i64,
    gc_ms: i64,
    invalidated: bool,
}

impl CacheRow {
    fn decode(self) -> Option<StoredEntry> {
        let kind = QueryKind::parse(&self.kind)?;
        let params: Vec<(String, String)> = serde_json::from_str(&self.params).ok()?;
        let key = QueryKey::from_parts(kind, params);
        // Written under an older key scheme
        if key.fingerprint() != self.fingerprint {
            return None;
        }
        Some(StoredEntry {
            key,
            value: serde_json::from_str(&self.value).ok()?,
            fetched_at: DateTime::<Utc>::from_timestamp_millis(self.fetched_at)?,
            unused_since: DateTime::<Utc>::from_timestamp_millis(self.unused_since)?,
            ttl: CacheTtl::new(millis(self.stale_ms), millis(self.gc_ms)),
            invalidated: self.invalidated,
        })
    }
}

fn millis(value: i64) -> Duration {
    Duration::from_millis(u64::try_from(value).unwrap_or(0))
}

fn to_millis(duration: Duration) -> i64 {
    i64::try_from(duration.as_millis()).unwrap_or(i64::MAX)
}

impl CacheBackend for SqliteBackend {
    fn load_entries(&self) -> Result<Vec<StoredEntry>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT fingerprint, kind, params, value, fetched_at, unused_since, \
             stale_ms, gc_ms, invalidated FROM query_cache",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok(CacheRow {
                    fingerprint: row.get(0)?,
                    kind: row.get(1)?,
                    params: row.get(2)?,
                    value: row.get(3)?,
                    fetched_at: row.get(4)?,
                    unused_since: row.get(5)?,
                    stale_ms: row.get(6)?,
                    gc_ms: row.get(7)?,
                    invalidated: row.get(8)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        drop(stmt);

        let mut entries = Vec::with_capacity(rows.len());
        let mut unreadable = Vec::new();
        for row in rows {
            let fingerprint = row.fingerprint.clone();
            match row.decode() {
                Some(entry) => entries.push(entry),
                None => unreadable.push(fingerprint),
            }
        }
        drop(conn);

        if !unreadable.is_empty() {
            warn!("Dropping {} unreadable cache rows", unreadable.len());
            self.delete_entries(&unreadable)?;
        }
        Ok(entries)
    }

    fn put_entry(&self, entry: &StoredEntry) -> Result<()> {
        let params_json = serde_json::to_string(entry.key.params())
            .map_err(|e| StoreError::Serialize(e.to_string()))?;
        let value = serde_json::to_string(&entry.value)
            .map_err(|e| StoreError::Serialize(e.to_string()))?;

        let conn = self.conn()?;
        conn.execute(
            "INSERT OR REPLACE INTO query_cache \
             (fingerprint, kind, params, value, fetched_at, unused_since, stale_ms, gc_ms, invalidated) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                entry.key.fingerprint(),
                entry.key.kind().as_str(),
                params_json,
                value,
                entry.fetched_at.timestamp_millis(),
                entry.unused_since.timestamp_millis(),
                to_millis(entry.ttl.stale),
                to_millis(entry.ttl.gc),
                entry.invalidated,
            ],
        )?;
        Ok(())
    }

    fn delete_entries(&self, fingerprints: &[String]) -> Result<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        for fingerprint in fingerprints {
            tx.execute("DELETE FROM query_cache WHERE fingerprint = ?1", [fingerprint])?;
        }
        tx.commit()?;
        Ok(())
    }
}
