//! In-memory storage backend

use std::collections::HashMap;
use std::sync::Mutex;

use super::StorageBackend;
use crate::error::StoreError;

/// Process-local backend; nothing survives the process
#[derive(Default)]
pub struct MemoryBackend {
    items: Mutex<HashMap<String, String>>,
}

impl MemoryBackend {
    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>, StoreError> {
        self.items
            .lock()
            .map_err(|_| StoreError::Io("session store lock poisoned".to_string()))
    }
}

impl StorageBackend for MemoryBackend {
    fn get_item(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set_items(&self, items: &[(&str, &str)]) -> Result<(), StoreError> {
        let mut guard = self.lock()?;
        for (key, value) in items {
            guard.insert((*key).to_string(), (*value).to_string());
        }
        Ok(())
    }

    fn remove_items(&self, keys: &[&str]) -> Result<(), StoreError> {
        let mut guard = self.lock()?;
        for key in keys {
            guard.remove(*key);
        }
        Ok(())
    }
}
