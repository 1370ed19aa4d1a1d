//! Best-effort cache of the current bearer token.
//!
//! Lookups never block and never touch the network. When nothing has been
//! handed to the cache yet, it falls back to a synchronous scan of persisted
//! storage for provider-shaped entries.

use std::sync::{Arc, Mutex, PoisonError};

use super::extraction::{extract_token, ProviderKeyMatcher};
use crate::traits::LocalStorage;

/// Where the cached token came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenSource {
    /// Handed over by the startup probe or a live event.
    HandOff,
    /// Found by scanning persisted storage.
    Storage,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedToken {
    pub token: String,
    pub source: TokenSource,
}

pub struct TokenCache {
    entry: Mutex<Option<CachedToken>>,
    storage: Arc<dyn LocalStorage>,
    matcher: ProviderKeyMatcher,
}

impl TokenCache {
    pub fn new(storage: Arc<dyn LocalStorage>, matcher: ProviderKeyMatcher) -> Self {
        Self {
            entry: Mutex::new(None),
            storage,
            matcher,
        }
    }

    /// Current token, scanning storage if nothing is held.
    pub fn get(&self) -> Option<String> {
        let mut entry = self.entry.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(cached) = entry.as_ref() {
            return Some(cached.token.clone());
        }

        let token = self.scan_storage()?;
        *entry = Some(CachedToken {
            token: token.clone(),
            source: TokenSource::Storage,
        });
        Some(token)
    }

    /// The held entry, without falling back to storage.
    pub fn entry(&self) -> Option<CachedToken> {
        self.entry
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn set(&self, token: impl Into<String>, source: TokenSource) {
        *self.entry.lock().unwrap_or_else(PoisonError::into_inner) = Some(CachedToken {
            token: token.into(),
            source,
        });
    }

    /// Forget the held token. Persisted entries are left to their owner.
    pub fn clear(&self) {
        *self.entry.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }

    fn scan_storage(&self) -> Option<String> {
        let keys = match self.storage.keys() {
            Ok(keys) => keys,
            Err(err) => {
                tracing::debug!("Token scan skipped, storage unreadable: {}", err);
                return None;
            }
        };

        for key in keys.iter().filter(|key| self.matcher.matches(key)) {
            let raw = match self.storage.get_item(key) {
                Ok(Some(raw)) => raw,
                Ok(None) => continue,
                Err(err) => {
                    tracing::trace!("Token scan: cannot read {}: {}", key, err);
                    continue;
                }
            };

            match extract_token(&raw) {
                Some((token, strategy)) => {
                    tracing::debug!("Token found in storage key {} ({} layout)", key, strategy);
                    return Some(token);
                }
                None => tracing::trace!("Token scan: unrecognized layout under {}", key),
            }
        }

        None
    }
}

impl std::fmt::Debug for TokenCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCache")
            .field("source", &self.entry().map(|e| e.source))
            .finish()
    }
}
