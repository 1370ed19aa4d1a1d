//! Common test utilities for integration tests.
//!
//! Provides a harness that starts [`SessionSync`] against the mock adapters,
//! plus fixture builders for sessions and profiles.
//!
//! # Example
//!
//! ```ignore
//! let harness = SyncHarness::builder()
//!     .with_session(session("U1", "T1"))
//!     .with_profile("U1", manager_profile())
//!     .start();
//! let state = harness.sync.wait_until_loaded().await;
//! ```
#![allow(dead_code)]

pub mod fixtures;

pub use fixtures::*;

use std::sync::Arc;

use rota_session::adapters::mock::{InMemoryStorage, MockIdentityProvider, MockProfileStore};
use rota_session::config::SessionConfig;
use rota_session::domain::{Profile, Session};
use rota_session::session::{SessionDeps, SessionState, SessionSync};

/// A running synchronizer plus handles on its mock collaborators.
pub struct SyncHarness {
    pub provider: MockIdentityProvider,
    pub profiles: MockProfileStore,
    pub storage: InMemoryStorage,
    pub sync: SessionSync,
}

impl SyncHarness {
    pub fn builder() -> SyncHarnessBuilder {
        SyncHarnessBuilder::default()
    }

    /// Let spawned tasks run until they block.
    pub async fn settle(&self) {
        for _ in 0..32 {
            tokio::task::yield_now().await;
        }
    }

    /// Wait for the first state matching `predicate`.
    pub async fn wait_for(&self, predicate: impl FnMut(&SessionState) -> bool) -> SessionState {
        let mut changes = self.sync.changes();
        let state = changes
            .wait_for(predicate)
            .await
            .expect("session store dropped")
            .clone();
        state
    }
}

/// Builder for [`SyncHarness`]. The mocks exist from the start so they can
/// be scripted before the synchronizer is started.
#[derive(Default)]
pub struct SyncHarnessBuilder {
    pub provider: MockIdentityProvider,
    pub profiles: MockProfileStore,
    pub storage: InMemoryStorage,
    config: SessionConfig,
}

impl SyncHarnessBuilder {
    /// Session the provider reports at startup.
    pub fn with_session(self, session: Session) -> Self {
        self.provider.set_session(Some(session));
        self
    }

    pub fn with_profile(self, identity_id: &str, profile: Profile) -> Self {
        self.profiles.insert_profile(identity_id, profile);
        self
    }

    /// Whether subscribing replays the startup session (default true).
    pub fn with_replay_initial(self, replay: bool) -> Self {
        self.provider.set_replay_initial(replay);
        self
    }

    pub fn with_config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    /// Start the synchronizer. Must be called inside a tokio runtime.
    pub fn start(self) -> SyncHarness {
        let deps = SessionDeps {
            provider: Arc::new(self.provider.clone()),
            profiles: Arc::new(self.profiles.clone()),
            storage: Arc::new(self.storage.clone()),
        };
        let sync = SessionSync::start(deps, &self.config).expect("valid test configuration");

        SyncHarness {
            provider: self.provider,
            profiles: self.profiles,
            storage: self.storage,
            sync,
        }
    }
}
