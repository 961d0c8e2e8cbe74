//! Query cache
//!
//! Values are kept as JSON so one map can hold every response type. Each key
//! carries a generation stamp: starting a fetch, writing, invalidating or
//! removing a key restamps it, and a fetch may only write back if the key
//! still carries the stamp it started with. Stamps come from one counter, so
//! a key that is forgotten and seen again never reuses an old stamp.
//!
//! With a [`CacheBackend`] attached, every change is mirrored to durable
//! storage and the map is seeded from it when the cache is opened.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use log::{debug, warn};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use super::CacheTtl;
use super::key::{Namespace, QueryKey};
use super::persist::{CacheBackend, StoredEntry};

/// Result of a cache read
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup<T> {
    /// Inside the freshness window and not invalidated
    Fresh(T),
    /// Present but past its freshness window or invalidated
    Stale(T),
    Miss,
}

impl<T> Lookup<T> {
    pub fn into_value(self) -> Option<T> {
        match self {
            Lookup::Fresh(v) | Lookup::Stale(v) => Some(v),
            Lookup::Miss => None,
        }
    }

    #[cfg(test)]
    pub fn is_fresh(&self) -> bool {
        matches!(self, Lookup::Fresh(_))
    }
}

/// Permission for one fetch to write its result back.
///
/// Keeps the key's generation alive until the fetch settles.
pub struct FetchTicket {
    cache: Arc<QueryCache>,
    key: QueryKey,
    generation: u64,
}

impl Drop for FetchTicket {
    fn drop(&mut self) {
        self.cache.end_fetch(&self.key);
    }
}

/// Saved state of one key, for rolling back an optimistic write
#[derive(Debug)]
pub struct Snapshot {
    key: QueryKey,
    entry: Option<Entry>,
}

/// Cache statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub total: usize,
    pub fresh: usize,
    pub stale: usize,
    pub subscribed: usize,
}

#[derive(Debug, Clone)]
struct Entry {
    key: QueryKey,
    value: serde_json::Value,
    fetched_at: Instant,
    ttl: CacheTtl,
    invalidated: bool,
    unused_since: Instant,
}

impl Entry {
    fn is_fresh(&self, now: Instant) -> bool {
        !self.invalidated && now.duration_since(self.fetched_at) < self.ttl.stale
    }

    fn to_stored(&self, now: Instant, wall: DateTime<Utc>) -> StoredEntry {
        StoredEntry {
            key: self.key.clone(),
            value: self.value.clone(),
            fetched_at: wall_clock(self.fetched_at, now, wall),
            unused_since: wall_clock(self.unused_since, now, wall),
            ttl: self.ttl,
            invalidated: self.invalidated,
        }
    }

    fn from_stored(stored: StoredEntry, now: Instant, wall: DateTime<Utc>) -> Option<Self> {
        Some(Self {
            fetched_at: monotonic(stored.fetched_at, now, wall)?,
            unused_since: monotonic(stored.unused_since, now, wall)?,
            key: stored.key,
            value: stored.value,
            ttl: stored.ttl,
            invalidated: stored.invalidated,
        })
    }
}

fn wall_clock(at: Instant, now: Instant, wall: DateTime<Utc>) -> DateTime<Utc> {
    chrono::Duration::from_std(now.saturating_duration_since(at))
        .ok()
        .and_then(|age| wall.checked_sub_signed(age))
        .unwrap_or(wall)
}

/// `None` when the timestamp predates what the monotonic clock can express
fn monotonic(at: DateTime<Utc>, now: Instant, wall: DateTime<Utc>) -> Option<Instant> {
    // Timestamps ahead of the wall clock count as just written
    let age = (wall - at).to_std().unwrap_or(Duration::ZERO);
    now.checked_sub(age)
}

#[derive(Debug)]
struct Generation {
    key: QueryKey,
    value: u64,
    in_flight: usize,
}

#[derive(Debug, Default)]
struct CacheState {
    entries: HashMap<String, Entry>,
    // A row lives while its key has an entry or a fetch in flight
    generations: HashMap<String, Generation>,
    subscribers: HashMap<String, usize>,
    last_generation: u64,
}

impl CacheState {
    fn bump(&mut self, key: &QueryKey) -> u64 {
        self.last_generation += 1;
        let stamp = self.last_generation;
        self.generations
            .entry(key.fingerprint().to_string())
            .and_modify(|g| g.value = stamp)
            .or_insert_with(|| Generation {
                key: key.clone(),
                value: stamp,
                in_flight: 0,
            });
        stamp
    }

    fn generation(&self, key: &QueryKey) -> u64 {
        self.generations
            .get(key.fingerprint())
            .map(|g| g.value)
            .unwrap_or(0)
    }

    fn write(&mut self, key: &QueryKey, value: serde_json::Value, ttl: CacheTtl, now: Instant) {
        self.entries.insert(
            key.fingerprint().to_string(),
            Entry {
                key: key.clone(),
                value,
                fetched_at: now,
                ttl,
                invalidated: false,
                unused_since: now,
            },
        );
    }

    fn is_subscribed(&self, fingerprint: &str) -> bool {
        self.subscribers.get(fingerprint).copied().unwrap_or(0) > 0
    }

    fn matching(&self, predicate: &dyn Fn(&QueryKey) -> bool) -> Vec<QueryKey> {
        // Every entry has a generation row, so this covers entries too
        self.generations
            .values()
            .map(|g| &g.key)
            .filter(|k| predicate(k))
            .cloned()
            .collect()
    }

    /// Forget generations of keys with no entry and no fetch in flight
    fn prune(&mut self) {
        let entries = &self.entries;
        self.generations
            .retain(|fingerprint, g| g.in_flight > 0 || entries.contains_key(fingerprint));
    }

    /// Drop expired entries, returning their fingerprints
    fn sweep(&mut self, now: Instant) -> Vec<String> {
        let subscribers = &self.subscribers;
        let mut removed = Vec::new();
        self.entries.retain(|fingerprint, entry| {
            let keep = subscribers.get(fingerprint).copied().unwrap_or(0) > 0
                || now.duration_since(entry.unused_since) < entry.ttl.gc;
            if !keep {
                removed.push(fingerprint.clone());
            }
            keep
        });
        if !removed.is_empty() {
            self.prune();
        }
        removed
    }
}

/// Query cache shared as `Arc<QueryCache>`.
#[derive(Default)]
pub struct QueryCache {
    state: Mutex<CacheState>,
    backend: Option<Arc<dyn CacheBackend>>,
}

impl QueryCache {
    /// Cache that lives only as long as the process
    pub fn new() -> Self {
        Self::default()
    }

    /// Cache mirrored to `backend`, seeded with the entries it holds.
    ///
    /// Entries already past their retention window are dropped on open.
    pub fn with_backend(backend: Arc<dyn CacheBackend>) -> Self {
        let now = Instant::now();
        let wall = Utc::now();
        let mut state = CacheState::default();
        let mut dropped = Vec::new();

        match backend.load_entries() {
            Ok(stored) => {
                for stored in stored {
                    let fingerprint = stored.key.fingerprint().to_string();
                    match Entry::from_stored(stored, now, wall) {
                        Some(entry) => {
                            state.bump(&entry.key);
                            state.entries.insert(fingerprint, entry);
                        }
                        None => dropped.push(fingerprint),
                    }
                }
            }
            Err(e) => warn!("Cached responses unavailable: {}", e),
        }
        dropped.extend(state.sweep(now));
        debug!("Opened query cache with {} entries", state.entries.len());

        let cache = Self {
            state: Mutex::new(state),
            backend: Some(backend),
        };
        {
            let state = cache.state();
            cache.persist(&state, &dropped);
        }
        cache
    }

    fn state(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Mirror the current state of `fingerprints` to the backend
    fn persist(&self, state: &CacheState, fingerprints: &[String]) {
        let Some(backend) = self.backend.as_ref() else {
            return;
        };
        let now = Instant::now();
        let wall = Utc::now();
        let mut gone = Vec::new();
        for fingerprint in fingerprints {
            match state.entries.get(fingerprint) {
                Some(entry) => {
                    if let Err(e) = backend.put_entry(&entry.to_stored(now, wall)) {
                        warn!("Failed to persist cache entry {}: {}", entry.key, e);
                    }
                }
                None => gone.push(fingerprint.clone()),
            }
        }
        if !gone.is_empty()
            && let Err(e) = backend.delete_entries(&gone)
        {
            warn!("Failed to delete {} persisted cache entries: {}", gone.len(), e);
        }
    }

    /// Read a key. Expired entries are swept first.
    pub fn get<T: DeserializeOwned>(&self, key: &QueryKey) -> Lookup<T> {
        let now = Instant::now();
        let mut state = self.state();
        let mut removed = state.sweep(now);

        let decoded = state.entries.get(key.fingerprint()).map(|entry| {
            (
                entry.is_fresh(now),
                serde_json::from_value::<T>(entry.value.clone()),
            )
        });
        let lookup = match decoded {
            None => Lookup::Miss,
            Some((true, Ok(value))) => Lookup::Fresh(value),
            Some((false, Ok(value))) => Lookup::Stale(value),
            Some((_, Err(e))) => {
                warn!("Dropping undecodable cache entry {}: {}", key, e);
                state.entries.remove(key.fingerprint());
                state.prune();
                removed.push(key.fingerprint().to_string());
                Lookup::Miss
            }
        };

        self.persist(&state, &removed);
        lookup
    }

    /// Register a fetch for `key`, superseding any fetch already running.
    pub fn begin_fetch(self: &Arc<Self>, key: &QueryKey) -> FetchTicket {
        let generation = {
            let mut state = self.state();
            let generation = state.bump(key);
            if let Some(g) = state.generations.get_mut(key.fingerprint()) {
                g.in_flight += 1;
            }
            generation
        };
        FetchTicket {
            cache: Arc::clone(self),
            key: key.clone(),
            generation,
        }
    }

    fn end_fetch(&self, key: &QueryKey) {
        let mut state = self.state();
        let fingerprint = key.fingerprint();
        let idle = match state.generations.get_mut(fingerprint) {
            Some(g) => {
                g.in_flight = g.in_flight.saturating_sub(1);
                g.in_flight == 0
            }
            None => false,
        };
        if idle && !state.entries.contains_key(fingerprint) {
            state.generations.remove(fingerprint);
        }
    }

    /// Write a fetch result unless the key moved on since the fetch began.
    ///
    /// Returns whether the value was stored.
    pub fn complete_fetch<T: Serialize>(&self, ticket: FetchTicket, value: &T, ttl: CacheTtl) -> bool {
        let json = match serde_json::to_value(value) {
            Ok(json) => json,
            Err(e) => {
                warn!("Not caching {}: {}", ticket.key, e);
                return false;
            }
        };

        // The ticket is released after the lock
        let stored = {
            let mut state = self.state();
            if state.generation(&ticket.key) != ticket.generation {
                debug!("Discarding outdated response for {}", ticket.key);
                false
            } else {
                state.write(&ticket.key, json, ttl, Instant::now());
                self.persist(&state, &[ticket.key.fingerprint().to_string()]);
                true
            }
        };
        drop(ticket);
        stored
    }

    /// Write a value directly. Returns the key's new generation.
    pub fn set_data<T: Serialize>(&self, key: &QueryKey, value: &T, ttl: CacheTtl) -> u64 {
        let mut state = self.state();
        let generation = state.bump(key);
        match serde_json::to_value(value) {
            Ok(json) => state.write(key, json, ttl, Instant::now()),
            Err(e) => {
                warn!("Not caching {}: {}", key, e);
                state.entries.remove(key.fingerprint());
                state.prune();
            }
        }
        self.persist(&state, &[key.fingerprint().to_string()]);
        generation
    }

    /// Mark matching keys stale. Returns the number of entries marked.
    pub fn invalidate_where(&self, predicate: impl Fn(&QueryKey) -> bool) -> usize {
        let mut state = self.state();
        let keys = state.matching(&predicate);
        let mut marked = Vec::new();
        for key in keys {
            state.bump(&key);
            if let Some(entry) = state.entries.get_mut(key.fingerprint())
                && !entry.invalidated
            {
                entry.invalidated = true;
                marked.push(key.fingerprint().to_string());
            }
        }
        if !marked.is_empty() {
            debug!("Invalidated {} cache entries", marked.len());
        }
        self.persist(&state, &marked);
        marked.len()
    }

    /// Delete matching keys. Returns the number of entries removed.
    pub fn remove_where(&self, predicate: impl Fn(&QueryKey) -> bool) -> usize {
        let mut state = self.state();
        let keys = state.matching(&predicate);
        let mut removed = Vec::new();
        for key in keys {
            state.bump(&key);
            if state.entries.remove(key.fingerprint()).is_some() {
                removed.push(key.fingerprint().to_string());
            }
        }
        state.prune();
        if !removed.is_empty() {
            debug!("Removed {} cache entries", removed.len());
        }
        self.persist(&state, &removed);
        removed.len()
    }

    pub fn remove(&self, key: &QueryKey) -> bool {
        self.remove_where(|k| k == key) > 0
    }

    pub fn remove_namespace(&self, namespace: Namespace) -> usize {
        self.remove_where(|k| k.namespace() == namespace)
    }

    /// Capture the current entry for `key` (or its absence).
    pub fn snapshot(&self, key: &QueryKey) -> Snapshot {
        Snapshot {
            key: key.clone(),
            entry: self.state().entries.get(key.fingerprint()).cloned(),
        }
    }

    /// Put a snapshot back if nothing touched the key since `generation`.
    pub fn restore(&self, snapshot: Snapshot, generation: u64) -> bool {
        let mut state = self.state();
        if state.generation(&snapshot.key) != generation {
            debug!("Skipping rollback of {}: newer data present", snapshot.key);
            return false;
        }
        state.bump(&snapshot.key);
        let fingerprint = snapshot.key.fingerprint().to_string();
        match snapshot.entry {
            Some(entry) => {
                state.entries.insert(fingerprint.clone(), entry);
            }
            None => {
                state.entries.remove(&fingerprint);
                state.prune();
            }
        }
        self.persist(&state, &[fingerprint]);
        true
    }

    /// Pin `key` against garbage collection for the life of the guard.
    pub fn subscribe(self: &Arc<Self>, key: &QueryKey) -> Subscription {
        let fingerprint = key.fingerprint().to_string();
        *self.state().subscribers.entry(fingerprint.clone()).or_insert(0) += 1;
        Subscription {
            cache: Arc::clone(self),
            fingerprint,
        }
    }

    fn unsubscribe(&self, fingerprint: &str) {
        let mut state = self.state();
        let remaining = match state.subscribers.get_mut(fingerprint) {
            Some(count) => {
                *count = count.saturating_sub(1);
                *count
            }
            None => return,
        };
        if remaining == 0 {
            state.subscribers.remove(fingerprint);
            // Retention window restarts once nothing observes the entry
            if let Some(entry) = state.entries.get_mut(fingerprint) {
                entry.unused_since = Instant::now();
                self.persist(&state, &[fingerprint.to_string()]);
            }
        }
    }

    /// Drop unsubscribed entries past their retention window.
    pub fn sweep(&self) -> usize {
        let mut state = self.state();
        let removed = state.sweep(Instant::now());
        self.persist(&state, &removed);
        removed.len()
    }

    /// Sweep every `every` until the cache is dropped.
    pub fn spawn_gc(self: &Arc<Self>, every: Duration) -> JoinHandle<()> {
        let cache = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            // First tick completes immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(cache) = cache.upgrade() else {
                    break;
                };
                let swept = cache.sweep();
                if swept > 0 {
                    debug!("Cache GC swept {} entries", swept);
                }
            }
        })
    }

    pub fn stats(&self) -> CacheStats {
        let now = Instant::now();
        let state = self.state();
        let mut stats = CacheStats {
            total: state.entries.len(),
            ..CacheStats::default()
        };
        for (fingerprint, entry) in &state.entries {
            if entry.is_fresh(now) {
                stats.fresh += 1;
            } else {
                stats.stale += 1;
            }
            if state.is_subscribed(fingerprint) {
                stats.subscribed += 1;
            }
        }
        stats
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.state().entries.is_empty()
    }

    /// Keys with a live generation row
    #[cfg(test)]
    fn tracked_keys(&self) -> usize {
        self.state().generations.len()
    }
}

/// Keeps a cache entry alive while held
pub struct Subscription {
    cache: Arc<QueryCache>,
    fingerprint: String,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cache.unsubscribe(&self.fingerprint);
    }
}
