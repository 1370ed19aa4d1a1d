//! Public entry point of the synchronizer.

use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::probe::{IdentityProbe, ProbeReport};
use super::reconciler::EventReconciler;
use super::resolver::ProfileResolver;
use super::store::{SessionState, SessionStatus, SessionStore};
use super::token_cache::TokenCache;
use crate::config::SessionConfig;
use crate::domain::{Identity, Profile};
use crate::error::SessionResult;
use crate::traits::{IdentityProvider, LocalStorage, ProfileStore};

/// Collaborators the synchronizer is wired to.
#[derive(Clone)]
pub struct SessionDeps {
    pub provider: Arc<dyn IdentityProvider>,
    pub profiles: Arc<dyn ProfileStore>,
    pub storage: Arc<dyn LocalStorage>,
}

/// Running session synchronizer.
///
/// Owns the startup probe task and the event reconciler task. Consumers read
/// `{identity, profile, loading}` from it and call [`SessionSync::sign_out`];
/// nothing else about the synchronizer is visible.
///
/// # Example
///
/// ```ignore
/// let sync = SessionSync::start(deps, &SessionConfig::from_env()?)?;
/// let state = sync.wait_until_loaded().await;
/// match state.status() {
///     SessionStatus::Ready => render_dashboard(state.profile),
///     SessionStatus::ProfileIncomplete => render_onboarding(),
///     _ => render_sign_in(),
/// }
/// ```
pub struct SessionSync {
    store: Arc<SessionStore>,
    cache: Arc<TokenCache>,
    provider: Arc<dyn IdentityProvider>,
    reconciler_task: Option<JoinHandle<()>>,
    probe_task: Option<JoinHandle<ProbeReport>>,
    probe_report: Option<ProbeReport>,
}

impl SessionSync {
    /// Subscribe to the provider and start the probe and reconciler tasks on
    /// the current tokio runtime.
    pub fn start(deps: SessionDeps, config: &SessionConfig) -> SessionResult<Self> {
        Self::start_with_store(deps, config, Arc::new(SessionStore::new()))
    }

    /// Like [`SessionSync::start`], writing into a caller-provided store.
    pub fn start_with_store(
        deps: SessionDeps,
        config: &SessionConfig,
        store: Arc<SessionStore>,
    ) -> SessionResult<Self> {
        let cache = Arc::new(TokenCache::new(deps.storage.clone(), config.key_matcher()?));
        let resolver = Arc::new(ProfileResolver::new(
            deps.profiles.clone(),
            store.clone(),
            cache.clone(),
            config.retry,
        ));

        // Subscribe before probing so no event between the two is missed
        let subscription = deps.provider.subscribe();
        let reconciler = EventReconciler::new(store.clone(), cache.clone(), resolver.clone());
        let reconciler_task = tokio::spawn(async move { reconciler.run(subscription).await });

        let probe = IdentityProbe::new(
            deps.provider.clone(),
            store.clone(),
            cache.clone(),
            resolver,
            config.probe_timeout,
        );
        let probe_task = tokio::spawn(async move { probe.probe().await });

        tracing::debug!("Session synchronizer started");

        Ok(Self {
            store,
            cache,
            provider: deps.provider,
            reconciler_task: Some(reconciler_task),
            probe_task: Some(probe_task),
            probe_report: None,
        })
    }

    pub fn state(&self) -> SessionState {
        self.store.snapshot()
    }

    pub fn identity(&self) -> Option<Identity> {
        self.store.snapshot().identity
    }

    pub fn profile(&self) -> Option<Profile> {
        self.store.snapshot().profile
    }

    pub fn loading(&self) -> bool {
        self.store.snapshot().loading
    }

    pub fn status(&self) -> SessionStatus {
        self.store.snapshot().status()
    }

    /// Best-effort bearer token; never blocks on the network.
    pub fn access_token(&self) -> Option<String> {
        self.cache.get()
    }

    /// Receiver notified on every committed state change.
    pub fn changes(&self) -> watch::Receiver<SessionState> {
        self.store.subscribe()
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    /// Wait until `loading` is false and return that state.
    pub async fn wait_until_loaded(&self) -> SessionState {
        let mut rx = self.store.subscribe();
        let state = match rx.wait_for(|state| !state.loading).await {
            Ok(state) => state.clone(),
            // The store owns the sender, so this cannot happen while self lives
            Err(_) => self.store.snapshot(),
        };
        state
    }

    /// Wait for the startup probe and return what it found.
    pub async fn probe_report(&mut self) -> Option<ProbeReport> {
        if let Some(task) = self.probe_task.take() {
            match task.await {
                Ok(report) => self.probe_report = Some(report),
                Err(err) => tracing::warn!("Startup probe task failed: {}", err),
            }
        }
        self.probe_report.clone()
    }

    /// Sign out through the provider and drop the profile right away.
    ///
    /// The identity is cleared when the provider's sign-out event reaches the
    /// reconciler. Provider errors are logged, never returned.
    pub async fn sign_out(&self) {
        if let Err(err) = self.provider.sign_out().await {
            tracing::warn!(
                code = err.error_code(),
                category = %err.category(),
                "Sign-out failed: {}",
                err
            );
        }
        self.store.clear_profile();
    }

    /// Stop both tasks and unsubscribe from the provider.
    pub async fn shutdown(mut self) {
        if let Some(task) = self.reconciler_task.take() {
            task.abort();
            let _ = task.await;
        }
        if let Some(task) = self.probe_task.take() {
            task.abort();
            let _ = task.await;
        }
        tracing::debug!("Session synchronizer stopped");
    }
}

impl Drop for SessionSync {
    fn drop(&mut self) {
        if let Some(task) = self.reconciler_task.take() {
            task.abort();
        }
        if let Some(task) = self.probe_task.take() {
            task.abort();
        }
    }
}

impl std::fmt::Debug for SessionSync {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionSync")
            .field("state", &self.store.snapshot())
            .field("probe_report", &self.probe_report)
            .finish()
    }
}
