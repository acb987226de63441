//! Key/value storage seam and its in-memory implementation.

use std::collections::HashMap;

use crate::chat::core::errors::{StorageError, StorageResult};

/// String key/value storage, shaped after browser local storage.
pub trait LocalStorage: Send {
    /// Read the value stored under `key`.
    ///
    /// # Errors
    /// Returns an error if storage access fails.
    fn get_item(&self, key: &str) -> StorageResult<Option<String>>;
    /// Store `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    /// Returns an error if storage access fails or the quota is exhausted.
    fn set_item(&mut self, key: &str, value: &str) -> StorageResult<()>;
    /// Remove `key`. Missing keys are not an error.
    ///
    /// # Errors
    /// Returns an error if storage access fails.
    fn remove_item(&mut self, key: &str) -> StorageResult<()>;
}

impl<T: LocalStorage + ?Sized> LocalStorage for Box<T> {
    fn get_item(&self, key: &str) -> StorageResult<Option<String>> {
        (**self).get_item(key)
    }

    fn set_item(&mut self, key: &str, value: &str) -> StorageResult<()> {
        (**self).set_item(key, value)
    }

    fn remove_item(&mut self, key: &str) -> StorageResult<()> {
        (**self).remove_item(key)
    }
}

/// In-process storage with an optional byte quota.
#[derive(Clone, Debug, Default)]
pub struct MemoryStorage {
    items: HashMap<String, String>,
    quota_bytes: Option<usize>,
}

impl MemoryStorage {
    /// Create an unbounded storage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a storage that refuses writes once keys and values exceed `quota_bytes`.
    #[must_use]
    pub fn with_quota(quota_bytes: usize) -> Self {
        Self {
            items: HashMap::new(),
            quota_bytes: Some(quota_bytes),
        }
    }

    /// Total bytes held across keys and values.
    #[must_use]
    pub fn used_bytes(&self) -> usize {
        self.items.iter().map(|(k, v)| k.len() + v.len()).sum()
    }

    /// Number of stored keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl LocalStorage for MemoryStorage {
    fn get_item(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.items.get(key).cloned())
    }

    fn set_item(&mut self, key: &str, value: &str) -> StorageResult<()> {
        if let Some(quota) = self.quota_bytes {
            let replaced = self.items.get(key).map_or(0, |old| key.len() + old.len());
            let needed = self.used_bytes() - replaced + key.len() + value.len();
            if needed > quota {
                return Err(StorageError::QuotaExceeded {
                    key: key.to_string(),
                    needed,
                    quota,
                });
            }
        }
        self.items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&mut self, key: &str) -> StorageResult<()> {
        self.items.remove(key);
        Ok(())
    }
}
