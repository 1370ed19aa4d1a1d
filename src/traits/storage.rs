//! Persisted key-value storage abstraction.
//!
//! Models the browser-style local storage the identity provider persists its
//! session into. Reads are synchronous and never touch the network, which is
//! what lets the token cache scan it without suspending.

/// Local storage errors.
#[derive(Debug, Clone, PartialEq)]
pub enum StorageError {
    /// Reading or writing the backing file failed
    Io(String),
    /// The backing file exists but is not a JSON object
    Serialization(String),
    /// Storage cannot be used at all (no home directory, read-only, ...)
    Unavailable(String),
}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageError::Io(msg) => write!(f, "Storage IO error: {}", msg),
            StorageError::Serialization(msg) => write!(f, "Storage format error: {}", msg),
            StorageError::Unavailable(msg) => write!(f, "Storage unavailable: {}", msg),
        }
    }
}

impl std::error::Error for StorageError {}

/// Synchronous string key-value store.
///
/// Values are opaque strings; the session provider writes JSON documents but
/// readers must tolerate anything.
pub trait LocalStorage: Send + Sync {
    /// All keys currently present, in a stable order.
    fn keys(&self) -> Result<Vec<String>, StorageError>;

    /// Value stored under `key`, if any.
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Store `value` under `key`, replacing any previous value.
    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove `key`. Removing a missing key is not an error.
    fn remove_item(&self, key: &str) -> Result<(), StorageError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_error_display() {
        assert_eq!(
            StorageError::Io("permission denied".to_string()).to_string(),
            "Storage IO error: permission denied"
        );
        assert_eq!(
            StorageError::Serialization("expected object".to_string()).to_string(),
            "Storage format error: expected object"
        );
        assert_eq!(
            StorageError::Unavailable("no home".to_string()).to_string(),
            "Storage unavailable: no home"
        );
    }
}
