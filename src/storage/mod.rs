//! Durable key-value capability backing the session mirror.
//!
//! SYSTEM CONTEXT
//! ==============
//! In the browser this role is played by `localStorage`. Native callers get a
//! JSON file (`file::FileStore`) and tests get `MemoryStore`. Values are
//! opaque strings; callers decide the encoding.

pub mod file;

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

// =============================================================================
// ERROR TYPE
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("storage io failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("storage encoding failed: {0}")]
    Encoding(#[from] serde_json::Error),
}

// =============================================================================
// CAPABILITY
// =============================================================================

/// Synchronous, last-write-wins key-value store.
pub trait KeyValueStore: Send + Sync {
    /// Read the value stored under `key`, if any.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] when the backing medium cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Overwrite the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] when the backing medium cannot be written.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove `key`. Removing a missing key succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] when the backing medium cannot be written.
    fn delete(&self, key: &str) -> Result<(), StorageError>;
}

// =============================================================================
// MEMORY STORE
// =============================================================================

/// Process-local store. Clones share the same map, which is how tests
/// simulate a reload: a fresh `SessionStore` over a clone of the old mirror.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently stored.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.remove(key);
        Ok(())
    }
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for Arc<T> {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        (**self).set(key, value)
    }

    fn delete(&self, key: &str) -> Result<(), StorageError> {
        (**self).delete(key)
    }
}
