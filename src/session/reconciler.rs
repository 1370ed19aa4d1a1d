//! Applies identity-change events to the session state.
//!
//! Events are handled strictly one at a time: a handler, including any
//! profile retries it triggers, finishes before the next event is taken off
//! the subscription. The startup replay races the [`IdentityProbe`]; the race
//! arbiter in [`EventReconciler::handle`] makes sure only one of them fetches
//! the startup profile.
//!
//! [`IdentityProbe`]: super::probe::IdentityProbe

use std::sync::Arc;

use super::resolver::{ProfileResolver, Resolution};
use super::store::{ProbeStatus, SessionStore};
use super::token_cache::{TokenCache, TokenSource};
use crate::domain::{AuthEvent, Identity, IdentityOrigin, Session};
use crate::traits::Subscription;

/// How an event was handled.
#[derive(Debug, Clone, PartialEq)]
pub enum Reconciliation {
    /// Startup replay while the probe is still running; the probe owns it.
    DeferredToProbe,
    /// Startup replay for the identity the probe already resolved.
    AlreadyResolved,
    /// An identity was installed and its profile resolved.
    Resolved(Resolution),
    /// No session: state and token cache cleared.
    Cleared,
}

pub struct EventReconciler {
    store: Arc<SessionStore>,
    cache: Arc<TokenCache>,
    resolver: Arc<ProfileResolver>,
}

impl EventReconciler {
    pub fn new(
        store: Arc<SessionStore>,
        cache: Arc<TokenCache>,
        resolver: Arc<ProfileResolver>,
    ) -> Self {
        Self {
            store,
            cache,
            resolver,
        }
    }

    /// Drain the subscription until the provider closes it.
    pub async fn run(&self, mut subscription: Subscription) {
        while let Some(event) = subscription.recv().await {
            let kind = event.kind;
            let outcome = self.handle(event).await;
            tracing::debug!("{} reconciled: {:?}", kind, outcome);
        }
        tracing::debug!("Identity event stream closed");
    }

    pub async fn handle(&self, event: AuthEvent) -> Reconciliation {
        if event.kind.is_startup() {
            if let Some(outcome) = self.arbitrate_startup(&event) {
                return outcome;
            }
        }

        match event.effective_session() {
            Some(session) => self.apply_session(session).await,
            None => {
                tracing::info!("{}: no session, clearing identity", event.kind);
                self.store.clear();
                self.cache.clear();
                Reconciliation::Cleared
            }
        }
    }

    /// Decide whether a startup replay needs any work. `None` means handle it
    /// like a live event.
    fn arbitrate_startup(&self, event: &AuthEvent) -> Option<Reconciliation> {
        match self.store.probe_status() {
            ProbeStatus::Pending => {
                if event.session.is_none() && self.store.settle_unauthenticated() {
                    tracing::debug!("Startup replay without session while probe pending");
                }
                Some(Reconciliation::DeferredToProbe)
            }
            ProbeStatus::Completed {
                resolved_identity: Some(resolved),
            } => {
                let session = event.session.as_ref()?;
                if session.user_id == resolved && self.store.is_current(&resolved) {
                    self.cache
                        .set(session.access_token.clone(), TokenSource::HandOff);
                    Some(Reconciliation::AlreadyResolved)
                } else {
                    None
                }
            }
            ProbeStatus::Completed {
                resolved_identity: None,
            } => None,
        }
    }

    async fn apply_session(&self, session: &Session) -> Reconciliation {
        self.cache
            .set(session.access_token.clone(), TokenSource::HandOff);

        let identity = Identity::from_session(session, IdentityOrigin::LiveEvent);
        if self.store.install_identity(identity) {
            tracing::info!("Signed in as {}", session.user_id);
        }

        let report = self
            .resolver
            .resolve_and_apply(&session.user_id, Some(session.access_token.clone()))
            .await;
        Reconciliation::Resolved(report.resolution)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::mock::{InMemoryStorage, MockProfileStore};
    use crate::domain::{AuthEventKind, Profile};
    use crate::session::extraction::ProviderKeyMatcher;
    use crate::session::retry::RetryPolicy;
    use crate::session::store::SessionStatus;

    struct Fixture {
        profiles: MockProfileStore,
        store: Arc<SessionStore>,
        cache: Arc<TokenCache>,
        reconciler: EventReconciler,
    }

    fn fixture() -> Fixture {
        let profiles = MockProfileStore::new();
        let store = Arc::new(SessionStore::new());
        let cache = Arc::new(TokenCache::new(
            Arc::new(InMemoryStorage::new()),
            ProviderKeyMatcher::default(),
        ));
        let resolver = Arc::new(ProfileResolver::new(
            Arc::new(profiles.clone()),
            store.clone(),
            cache.clone(),
            RetryPolicy::new(),
        ));
        let reconciler = EventReconciler::new(store.clone(), cache.clone(), resolver);
        Fixture {
            profiles,
            store,
            cache,
            reconciler,
        }
    }

    fn manager() -> Profile {
        Profile {
            role: Some("manager".to_string()),
            organization_id: Some("O1".to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_startup_replay_deferred_while_probe_pending() {
        let f = fixture();
        f.profiles.insert_profile("U1", manager());

        let outcome = f
            .reconciler
            .handle(AuthEvent::initial(Some(Session::new("U1", "T1"))))
            .await;

        assert_eq!(outcome, Reconciliation::DeferredToProbe);
        assert_eq!(f.profiles.call_count(), 0);
        assert!(f.store.snapshot().loading);
    }

    #[tokio::test]
    async fn test_empty_startup_replay_clears_loading_while_probe_pending() {
        let f = fixture();

        let outcome = f.reconciler.handle(AuthEvent::initial(None)).await;

        assert_eq!(outcome, Reconciliation::DeferredToProbe);
        assert_eq!(f.store.snapshot().status(), SessionStatus::Unauthenticated);
    }

    #[tokio::test]
    async fn test_startup_replay_after_probe_for_same_identity_is_skipped() {
        let f = fixture();
        f.store
            .adopt_probe_identity(Identity::new("U1", "T1", IdentityOrigin::StartupProbe));
        f.store.finish_resolution("U1", Some(manager()));
        f.store.mark_probe_completed(Some("U1".to_string()));

        let outcome = f
            .reconciler
            .handle(AuthEvent::initial(Some(Session::new("U1", "T1b"))))
            .await;

        assert_eq!(outcome, Reconciliation::AlreadyResolved);
        assert_eq!(f.profiles.call_count(), 0);
        assert_eq!(f.cache.get(), Some("T1b".to_string()));
    }

    #[tokio::test]
    async fn test_startup_replay_after_empty_probe_is_live() {
        let f = fixture();
        f.store.settle_unauthenticated();
        f.store.mark_probe_completed(None);
        f.profiles.insert_profile("U1", manager());

        let outcome = f
            .reconciler
            .handle(AuthEvent::initial(Some(Session::new("U1", "T1"))))
            .await;

        assert_eq!(outcome, Reconciliation::Resolved(Resolution::Found(manager())));
        assert_eq!(f.store.snapshot().status(), SessionStatus::Ready);
    }

    #[tokio::test]
    async fn test_signed_in_resolves_profile() {
        let f = fixture();
        f.profiles.insert_profile("U1", manager());

        f.reconciler
            .handle(AuthEvent::signed_in(Session::new("U1", "T1")))
            .await;

        let state = f.store.snapshot();
        assert_eq!(state.identity_id(), Some("U1"));
        assert_eq!(state.profile, Some(manager()));
        assert!(!state.loading);
        assert_eq!(f.profiles.calls()[0].token.as_deref(), Some("T1"));
    }

    #[tokio::test]
    async fn test_token_refresh_keeps_profile_visible() {
        let f = fixture();
        f.profiles.insert_profile("U1", manager());
        f.reconciler
            .handle(AuthEvent::signed_in(Session::new("U1", "T1")))
            .await;

        let mut rx = f.store.subscribe();
        rx.borrow_and_update();
        f.reconciler
            .handle(AuthEvent::token_refreshed(Session::new("U1", "T2")))
            .await;

        // Loading never went back up for the same principal
        assert!(!rx.borrow().loading);
        assert_eq!(f.cache.get(), Some("T2".to_string()));
        assert_eq!(f.store.snapshot().identity.unwrap().token, "T2");
    }

    #[tokio::test]
    async fn test_signed_out_clears_everything() {
        let f = fixture();
        f.profiles.insert_profile("U1", manager());
        f.reconciler
            .handle(AuthEvent::signed_in(Session::new("U1", "T1")))
            .await;

        let outcome = f.reconciler.handle(AuthEvent::signed_out()).await;

        assert_eq!(outcome, Reconciliation::Cleared);
        assert_eq!(f.store.snapshot().status(), SessionStatus::Unauthenticated);
        assert_eq!(f.cache.entry(), None);
    }

    #[tokio::test]
    async fn test_live_event_without_session_clears() {
        let f = fixture();
        let outcome = f
            .reconciler
            .handle(AuthEvent::new(AuthEventKind::UserUpdated, None))
            .await;
        assert_eq!(outcome, Reconciliation::Cleared);
        assert!(!f.store.snapshot().loading);
    }

    #[tokio::test]
    async fn test_run_processes_events_in_order() {
        let f = fixture();
        f.profiles.insert_profile("U1", manager());
        f.store.mark_probe_completed(None);

        let (tx, subscription) = Subscription::channel();
        tx.send(AuthEvent::signed_in(Session::new("U1", "T1"))).unwrap();
        tx.send(AuthEvent::signed_out()).unwrap();
        drop(tx);

        f.reconciler.run(subscription).await;

        assert_eq!(f.store.snapshot().status(), SessionStatus::Unauthenticated);
        assert_eq!(f.profiles.call_count(), 1);
    }
}
