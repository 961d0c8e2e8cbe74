//! Durable session (token) storage
//!
//! The session is kept as three independent keys, `accessToken`,
//! `refreshToken` and `user`, in a small key-value backend. All three are
//! written together and cleared together.
//!
//! Read accessors never fail: a backend error is logged and treated as
//! "no session".

#[cfg(test)]
mod memory;
mod sqlite;

#[cfg(test)]
pub use memory::MemoryBackend;
pub use sqlite::SqliteBackend;

use std::sync::Arc;

use log::warn;

use crate::client::models::{Session, SessionUser};
use crate::error::StoreError;

/// Storage key for the bearer token
pub const ACCESS_TOKEN_KEY: &str = "accessToken";
/// Storage key for the refresh token
pub const REFRESH_TOKEN_KEY: &str = "refreshToken";
/// Storage key for the JSON-encoded user record
pub const USER_KEY: &str = "user";

const SESSION_KEYS: [&str; 3] = [ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, USER_KEY];

/// Minimal key-value persistence used by [`TokenStore`].
///
/// `set_items` and `remove_items` must apply all keys as one unit so that
/// readers never see a token without its paired user record.
pub trait StorageBackend: Send + Sync {
    fn get_item(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set_items(&self, items: &[(&str, &str)]) -> Result<(), StoreError>;
    fn remove_items(&self, keys: &[&str]) -> Result<(), StoreError>;
}

/// One database shared by the token store and the query cache
impl<T: StorageBackend + ?Sized> StorageBackend for Arc<T> {
    fn get_item(&self, key: &str) -> Result<Option<String>, StoreError> {
        (**self).get_item(key)
    }

    fn set_items(&self, items: &[(&str, &str)]) -> Result<(), StoreError> {
        (**self).set_items(items)
    }

    fn remove_items(&self, keys: &[&str]) -> Result<(), StoreError> {
        (**self).remove_items(keys)
    }
}

/// Session token store.
///
/// Shared as `Arc<TokenStore>` between the HTTP wrapper (which reads the
/// token before every request and writes it after a refresh) and the
/// resource client (which writes and clears whole sessions).
pub struct TokenStore {
    backend: Option<Box<dyn StorageBackend>>,
}

impl TokenStore {
    /// Store backed by the given persistence layer
    pub fn new(backend: impl StorageBackend + 'static) -> Self {
        Self {
            backend: Some(Box::new(backend)),
        }
    }

    /// Store with no durable storage available.
    ///
    /// Every accessor reports "no session" and writes are ignored.
    pub fn detached() -> Self {
        Self { backend: None }
    }

    /// In-memory store, nothing survives the process
    #[cfg(test)]
    pub fn in_memory() -> Self {
        Self::new(MemoryBackend::default())
    }

    fn read(&self, key: &str) -> Option<String> {
        let backend = self.backend.as_ref()?;
        match backend.get_item(key) {
            Ok(value) => value.filter(|v| !v.is_empty()),
            Err(e) => {
                warn!("Failed to read '{}' from session store: {}", key, e);
                None
            }
        }
    }

    pub fn access_token(&self) -> Option<String> {
        self.read(ACCESS_TOKEN_KEY)
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.read(REFRESH_TOKEN_KEY)
    }

    /// Stored user record; a corrupt record reads as absent
    pub fn user(&self) -> Option<SessionUser> {
        let raw = self.read(USER_KEY)?;
        match serde_json::from_str(&raw) {
            Ok(user) => Some(user),
            Err(e) => {
                warn!("Ignoring unreadable user record in session store: {}", e);
                None
            }
        }
    }

    /// Persist a complete session (tokens and user together)
    pub fn set_session(&self, session: &Session) -> Result<(), StoreError> {
        let Some(backend) = self.backend.as_ref() else {
            return Ok(());
        };
        let user = serde_json::to_string(&session.user)
            .map_err(|e| StoreError::Serialize(e.to_string()))?;
        backend.set_items(&[
            (ACCESS_TOKEN_KEY, session.access_token.as_str()),
            (REFRESH_TOKEN_KEY, session.refresh_token.as_str()),
            (USER_KEY, user.as_str()),
        ])?;
        log::info!("Session stored for {}", session.user.email);
        Ok(())
    }

    /// Replace only the access token after a successful refresh
    pub fn set_access_token(&self, token: &str) -> Result<(), StoreError> {
        match self.backend.as_ref() {
            Some(backend) => backend.set_items(&[(ACCESS_TOKEN_KEY, token)]),
            None => Ok(()),
        }
    }

    /// Remove the whole session. Idempotent.
    pub fn clear(&self) {
        if let Some(backend) = self.backend.as_ref() {
            if let Err(e) = backend.remove_items(&SESSION_KEYS) {
                warn!("Failed to clear session store: {}", e);
            } else {
                log::info!("Session cleared");
            }
        }
    }

    /// True iff an access token is present. Expiry is not inspected.
    pub fn is_authenticated(&self) -> bool {
        self.access_token().is_some()
    }
}
