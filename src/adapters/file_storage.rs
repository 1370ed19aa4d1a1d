//! File-backed local storage adapter.
//!
//! Keeps every entry in a single JSON object file, by default
//! `~/.rota/local_storage.json`. The file is re-read on every access so that
//! several processes (e.g. `rota-session watch` and `rota-session sign-in`)
//! see each other's writes.

use serde_json::{Map, Value};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use crate::traits::{LocalStorage, StorageError};

/// The storage directory name.
const STORAGE_DIR: &str = ".rota";

/// The storage file name.
const STORAGE_FILE: &str = "local_storage.json";

/// File-based [`LocalStorage`].
///
/// Values are stored as JSON strings inside one top-level object. A missing
/// file reads as empty storage.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStorage {
    /// Storage under the home directory.
    pub fn new() -> Result<Self, StorageError> {
        let home = dirs::home_dir().ok_or_else(|| {
            StorageError::Unavailable("Failed to determine home directory".to_string())
        })?;
        Ok(Self::with_path(home.join(STORAGE_DIR).join(STORAGE_FILE)))
    }

    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<Map<String, Value>, StorageError> {
        if !self.path.exists() {
            return Ok(Map::new());
        }

        let file = File::open(&self.path).map_err(|e| StorageError::Io(e.to_string()))?;
        match serde_json::from_reader(BufReader::new(file)) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(_) => Err(StorageError::Serialization(format!(
                "{} is not a JSON object",
                self.path.display()
            ))),
            Err(e) => Err(StorageError::Serialization(e.to_string())),
        }
    }

    fn save(&self, entries: &Map<String, Value>) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent).map_err(|e| StorageError::Io(e.to_string()))?;
            }
        }

        let file = File::create(&self.path).map_err(|e| StorageError::Io(e.to_string()))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, entries)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        writer.flush().map_err(|e| StorageError::Io(e.to_string()))
    }
}

impl LocalStorage for FileStorage {
    fn keys(&self) -> Result<Vec<String>, StorageError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut keys: Vec<String> = self.load()?.keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }

    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(self.load()?.get(key).map(|value| match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }))
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut entries = self.load()?;
        entries.insert(key.to_string(), Value::String(value.to_string()));
        self.save(&entries)
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut entries = self.load()?;
        if entries.remove(key).is_some() {
            self.save(&entries)?;
        }
        Ok(())
    }
}
