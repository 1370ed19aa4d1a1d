//! In-memory local storage for testing.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use crate::traits::{LocalStorage, StorageError};

/// In-memory [`LocalStorage`].
///
/// Clones share the same entries, so a test can keep a handle while the
/// synchronizer owns another. Keys are returned in sorted order.
///
/// # Example
///
/// ```ignore
/// use rota_session::adapters::mock::InMemoryStorage;
/// use rota_session::traits::LocalStorage;
///
/// let storage = InMemoryStorage::new();
/// storage.insert("sb-proj-auth-token", r#"{"access_token":"t1"}"#);
/// assert_eq!(storage.keys()?, vec!["sb-proj-auth-token".to_string()]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct InMemoryStorage {
    entries: Arc<Mutex<BTreeMap<String, String>>>,
    read_should_fail: Arc<Mutex<bool>>,
    write_should_fail: Arc<Mutex<bool>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an entry directly.
    pub fn insert(&self, key: &str, value: &str) {
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
    }

    pub fn clear_all(&self) {
        self.entries.lock().unwrap().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Make `keys` and `get_item` fail.
    pub fn set_read_should_fail(&self, should_fail: bool) {
        *self.read_should_fail.lock().unwrap() = should_fail;
    }

    /// Make `set_item` and `remove_item` fail.
    pub fn set_write_should_fail(&self, should_fail: bool) {
        *self.write_should_fail.lock().unwrap() = should_fail;
    }

    fn check_read(&self) -> Result<(), StorageError> {
        if *self.read_should_fail.lock().unwrap() {
            return Err(StorageError::Unavailable("mock read failure".to_string()));
        }
        Ok(())
    }

    fn check_write(&self) -> Result<(), StorageError> {
        if *self.write_should_fail.lock().unwrap() {
            return Err(StorageError::Io("mock write failure".to_string()));
        }
        Ok(())
    }
}

impl LocalStorage for InMemoryStorage {
    fn keys(&self) -> Result<Vec<String>, StorageError> {
        self.check_read()?;
        Ok(self.entries.lock().unwrap().keys().cloned().collect())
    }

    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.check_read()?;
        Ok(self.entries.lock().unwrap().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.check_write()?;
        self.insert(key, value);
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        self.check_write()?;
        self.entries.lock().unwrap().remove(key);
        Ok(())
    }
}
