//! Server-state cache for catalog responses
//!
//! A map from query key to the last fetched value, with a freshness window
//! (reads inside it never touch the network) and a retention window (unused
//! entries older than it are swept). The map is mirrored to the session
//! database so one command's responses serve the next.

pub mod client;
pub mod key;
pub mod persist;
pub mod store;

use std::time::Duration;

use crate::config::CacheSettings;

/// Freshness and retention windows for one kind of query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheTtl {
    /// Age after which a read triggers a refetch
    pub stale: Duration,
    /// Unused age after which the entry is dropped
    pub gc: Duration,
}

impl CacheTtl {
    pub const MOVIE_LIST: CacheTtl = CacheTtl {
        stale: Duration::from_secs(5 * 60),
        gc: Duration::from_secs(10 * 60),
    };
    pub const MOVIE_DETAIL: CacheTtl = CacheTtl {
        stale: Duration::from_secs(5 * 60),
        gc: Duration::from_secs(30 * 60),
    };
    pub const AUTH_USER: CacheTtl = CacheTtl {
        stale: Duration::from_secs(5 * 60),
        gc: Duration::from_secs(10 * 60),
    };
    // Profile changes rarely
    pub const AUTH_PROFILE: CacheTtl = CacheTtl {
        stale: Duration::from_secs(10 * 60),
        gc: Duration::from_secs(30 * 60),
    };

    /// Retention is never shorter than freshness.
    pub fn new(stale: Duration, gc: Duration) -> Self {
        Self {
            stale,
            gc: gc.max(stale),
        }
    }
}

/// Windows per query kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TtlPolicy {
    pub movie_list: CacheTtl,
    pub movie_detail: CacheTtl,
    pub auth_user: CacheTtl,
    pub auth_profile: CacheTtl,
}

impl Default for TtlPolicy {
    fn default() -> Self {
        Self {
            movie_list: CacheTtl::MOVIE_LIST,
            movie_detail: CacheTtl::MOVIE_DETAIL,
            auth_user: CacheTtl::AUTH_USER,
            auth_profile: CacheTtl::AUTH_PROFILE,
        }
    }
}

impl TtlPolicy {
    /// Movie windows from config; auth windows keep their defaults
    pub fn from_settings(settings: &CacheSettings) -> Self {
        Self {
            movie_list: CacheTtl::new(
                Duration::from_secs(settings.list_stale_secs),
                Duration::from_secs(settings.list_gc_secs),
            ),
            movie_detail: CacheTtl::new(
                Duration::from_secs(settings.detail_stale_secs),
                Duration::from_secs(settings.detail_gc_secs),
            ),
            ..Self::default()
        }
    }

    pub fn for_kind(&self, kind: key::QueryKind) -> CacheTtl {
        match kind {
            key::QueryKind::AuthUser => self.auth_user,
            key::QueryKind::AuthProfile => self.auth_profile,
            key::QueryKind::MovieList => self.movie_list,
            key::QueryKind::MovieDetail => self.movie_detail,
        }
    }
}

// Re-export main types
pub use client::{CachedMovieClient, FetchPolicy};
pub use key::QueryKey;
pub use store::{CacheStats, QueryCache};
