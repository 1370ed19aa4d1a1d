//! Injectable owner of the session state.
//!
//! Every transition goes through [`SessionStore`], which commits it to a
//! `tokio::sync::watch` channel. The channel serializes writers, so state
//! transitions are totally ordered, and every committed state is visible to
//! subscribers.

use serde::Serialize;
use std::sync::{Mutex, PoisonError};
use tokio::sync::watch;

use crate::domain::{Identity, Profile};

/// The externally visible session tuple.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionState {
    pub identity: Option<Identity>,
    pub profile: Option<Profile>,
    pub loading: bool,
}

impl SessionState {
    /// State at process start: nothing known yet.
    pub fn initial() -> Self {
        Self {
            identity: None,
            profile: None,
            loading: true,
        }
    }

    pub fn status(&self) -> SessionStatus {
        match (self.loading, &self.identity, &self.profile) {
            (true, _, _) => SessionStatus::Loading,
            (false, None, _) => SessionStatus::Unauthenticated,
            (false, Some(_), None) => SessionStatus::ProfileIncomplete,
            (false, Some(_), Some(_)) => SessionStatus::Ready,
        }
    }

    pub fn identity_id(&self) -> Option<&str> {
        self.identity.as_ref().map(|identity| identity.id.as_str())
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::initial()
    }
}

/// What consumers should render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Identity-dependent UI must wait.
    Loading,
    /// No one is signed in.
    Unauthenticated,
    /// Signed in, but no profile record yet (onboarding).
    ProfileIncomplete,
    /// Signed in with a profile.
    Ready,
}

/// Progress of the one-time startup probe, consulted by the race arbiter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeStatus {
    Pending,
    /// The probe finished. `resolved_identity` is the identity whose profile
    /// it resolved, if any.
    Completed { resolved_identity: Option<String> },
}

#[derive(Debug)]
pub struct SessionStore {
    state: watch::Sender<SessionState>,
    probe: Mutex<ProbeStatus>,
}

impl SessionStore {
    pub fn new() -> Self {
        let (state, _) = watch::channel(SessionState::initial());
        Self {
            state,
            probe: Mutex::new(ProbeStatus::Pending),
        }
    }

    pub fn snapshot(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// Receiver that observes every committed state.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub fn current_identity_id(&self) -> Option<String> {
        self.state.borrow().identity_id().map(str::to_string)
    }

    /// Whether `identity_id` is still the current identity.
    pub fn is_current(&self, identity_id: &str) -> bool {
        self.state.borrow().identity_id() == Some(identity_id)
    }

    pub fn probe_status(&self) -> ProbeStatus {
        self.probe
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub(crate) fn mark_probe_completed(&self, resolved_identity: Option<String>) {
        *self.probe.lock().unwrap_or_else(PoisonError::into_inner) =
            ProbeStatus::Completed { resolved_identity };
    }

    /// Install the probe's identity unless a live event already installed a
    /// different principal. Loading is left untouched.
    pub(crate) fn adopt_probe_identity(&self, identity: Identity) -> bool {
        let mut adopted = false;
        self.state.send_if_modified(|state| match &state.identity {
            Some(current) if !current.same_principal(&identity) => false,
            Some(current) if *current == identity => {
                adopted = true;
                false
            }
            _ => {
                state.identity = Some(identity);
                adopted = true;
                true
            }
        });
        adopted
    }

    /// Install an identity reported by a live event.
    ///
    /// A new principal drops the old profile and raises `loading` until its
    /// resolution lands. The same principal only has its token refreshed.
    /// Returns true if the principal changed.
    pub(crate) fn install_identity(&self, identity: Identity) -> bool {
        let mut switched = false;
        self.state.send_if_modified(|state| {
            match &state.identity {
                Some(current) if current.same_principal(&identity) => {
                    if *current == identity {
                        return false;
                    }
                }
                _ => {
                    switched = true;
                    state.profile = None;
                    state.loading = true;
                }
            }
            state.identity = Some(identity);
            true
        });
        switched
    }

    /// Apply a finished profile resolution and clear `loading`.
    ///
    /// Refused (returns false) if `identity_id` is no longer current; the
    /// result is stale and must not be written.
    pub(crate) fn finish_resolution(&self, identity_id: &str, profile: Option<Profile>) -> bool {
        let mut applied = false;
        self.state.send_if_modified(|state| {
            if state.identity_id() != Some(identity_id) {
                return false;
            }
            applied = true;
            let changed = state.profile != profile || state.loading;
            state.profile = profile;
            state.loading = false;
            changed
        });
        applied
    }

    /// Clear `loading` if no identity has been installed.
    pub(crate) fn settle_unauthenticated(&self) -> bool {
        let mut settled = false;
        self.state.send_if_modified(|state| {
            if state.identity.is_some() {
                return false;
            }
            settled = true;
            let changed = state.loading || state.profile.is_some();
            state.profile = None;
            state.loading = false;
            changed
        });
        settled
    }

    /// Signed out: no identity, no profile, not loading.
    pub(crate) fn clear(&self) {
        self.state.send_if_modified(|state| {
            let changed = state.identity.is_some() || state.profile.is_some() || state.loading;
            state.identity = None;
            state.profile = None;
            state.loading = false;
            changed
        });
    }

    pub(crate) fn clear_profile(&self) {
        self.state.send_if_modified(|state| state.profile.take().is_some());
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}
