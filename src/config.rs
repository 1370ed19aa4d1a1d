//! Synchronizer configuration.
//!
//! Defaults cover everything except the backend location, which only the
//! REST adapters need.
//!
//! # Example
//!
//! ```ignore
//! use rota_session::config::SessionConfig;
//!
//! let config = SessionConfig::default()
//!     .with_backend("https://abcdefgh.example.co", "anon-key")
//!     .with_profile_table("staff");
//! ```

use std::path::PathBuf;
use std::time::Duration;

use crate::error::{SessionError, SessionResult};
use crate::session::extraction::{ProviderKeyMatcher, DEFAULT_KEY_PATTERN};
use crate::session::retry::RetryPolicy;

pub const ENV_BACKEND_URL: &str = "ROTA_BACKEND_URL";
pub const ENV_ANON_KEY: &str = "ROTA_ANON_KEY";
pub const ENV_PROFILE_TABLE: &str = "ROTA_PROFILE_TABLE";
pub const ENV_STORAGE_PATH: &str = "ROTA_STORAGE_PATH";
pub const ENV_PROBE_TIMEOUT_MS: &str = "ROTA_PROBE_TIMEOUT_MS";

pub const DEFAULT_PROFILE_TABLE: &str = "users";
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Backend base URL, e.g. `https://<ref>.example.co`
    pub backend_url: Option<String>,
    /// Public anon key sent as `apikey` on every request
    pub anon_key: Option<String>,
    /// Table holding profile rows, keyed by identity id
    pub profile_table: String,
    /// Override for the file-backed local storage location
    pub storage_path: Option<PathBuf>,
    /// Upper bound on the startup session check
    pub probe_timeout: Duration,
    pub retry: RetryPolicy,
    /// Regex for provider session keys in local storage
    pub key_pattern: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            backend_url: None,
            anon_key: None,
            profile_table: DEFAULT_PROFILE_TABLE.to_string(),
            storage_path: None,
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
            retry: RetryPolicy::new(),
            key_pattern: DEFAULT_KEY_PATTERN.to_string(),
        }
    }
}

impl SessionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_backend(mut self, url: impl Into<String>, anon_key: impl Into<String>) -> Self {
        self.backend_url = Some(url.into().trim_end_matches('/').to_string());
        self.anon_key = Some(anon_key.into());
        self
    }

    pub fn with_profile_table(mut self, table: impl Into<String>) -> Self {
        self.profile_table = table.into();
        self
    }

    pub fn with_storage_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.storage_path = Some(path.into());
        self
    }

    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_key_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.key_pattern = pattern.into();
        self
    }

    /// Build from `ROTA_*` environment variables on top of the defaults.
    ///
    /// Unset or empty variables keep the default. A malformed
    /// `ROTA_PROBE_TIMEOUT_MS` is an error.
    pub fn from_env() -> SessionResult<Self> {
        let mut config = Self::default();

        if let Some(url) = env_var(ENV_BACKEND_URL) {
            config.backend_url = Some(url.trim_end_matches('/').to_string());
        }
        config.anon_key = env_var(ENV_ANON_KEY);
        if let Some(table) = env_var(ENV_PROFILE_TABLE) {
            config.profile_table = table;
        }
        config.storage_path = env_var(ENV_STORAGE_PATH).map(PathBuf::from);
        if let Some(raw) = env_var(ENV_PROBE_TIMEOUT_MS) {
            let millis: u64 = raw.parse().map_err(|_| {
                SessionError::Config(format!(
                    "{} must be a number of milliseconds, got {:?}",
                    ENV_PROBE_TIMEOUT_MS, raw
                ))
            })?;
            config.probe_timeout = Duration::from_millis(millis);
        }

        Ok(config)
    }

    /// Backend URL and anon key, or a configuration error naming what is missing.
    pub fn backend(&self) -> SessionResult<(&str, &str)> {
        let url = self.backend_url.as_deref().ok_or_else(|| {
            SessionError::Config(format!("{} is not set", ENV_BACKEND_URL))
        })?;
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(SessionError::Config(format!(
                "{} must be an http(s) URL, got {:?}",
                ENV_BACKEND_URL, url
            )));
        }
        let anon_key = self
            .anon_key
            .as_deref()
            .ok_or_else(|| SessionError::Config(format!("{} is not set", ENV_ANON_KEY)))?;
        Ok((url, anon_key))
    }

    pub fn key_matcher(&self) -> SessionResult<ProviderKeyMatcher> {
        ProviderKeyMatcher::new(&self.key_pattern).map_err(|err| {
            SessionError::Config(format!("invalid key pattern {:?}: {}", self.key_pattern, err))
        })
    }

    /// Storage key the REST provider persists its session under:
    /// `sb-<project ref>-auth-token`, where the ref is the first host label.
    pub fn storage_key(&self) -> SessionResult<String> {
        let (url, _) = self.backend()?;
        let host = url
            .split("://")
            .nth(1)
            .unwrap_or(url)
            .split(['/', ':'])
            .next()
            .unwrap_or_default();
        let project_ref = host.split('.').next().unwrap_or_default();
        if project_ref.is_empty() {
            return Err(SessionError::Config(format!(
                "cannot derive a project ref from {:?}",
                url
            )));
        }
        Ok(format!("sb-{}-auth-token", project_ref))
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
