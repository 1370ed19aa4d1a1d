//! Mock identity provider for testing.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

use crate::domain::{AuthEvent, Session};
use crate::error::ProviderError;
use crate::traits::{IdentityProvider, Subscription};

/// Mock [`IdentityProvider`] with event injection.
///
/// Behaves like the real provider where the synchronizer cares: `subscribe`
/// replays the current session as an initial-session event, `emit` fans an
/// event out to every live subscription and updates the current session, and
/// `sign_out` emits a sign-out event.
///
/// # Example
///
/// ```ignore
/// let provider = MockIdentityProvider::with_session(Session::new("u1", "t1"));
/// let mut sub = provider.subscribe();
/// assert_eq!(sub.recv().await.unwrap().kind, AuthEventKind::InitialSession);
///
/// provider.emit(AuthEvent::signed_out());
/// assert_eq!(sub.recv().await.unwrap().kind, AuthEventKind::SignedOut);
/// ```
#[derive(Debug, Clone)]
pub struct MockIdentityProvider {
    session: Arc<Mutex<Option<Session>>>,
    session_error: Arc<Mutex<Option<ProviderError>>>,
    sign_out_error: Arc<Mutex<Option<ProviderError>>>,
    probe_delay: Arc<Mutex<Option<Duration>>>,
    replay_initial: Arc<Mutex<bool>>,
    subscribers: Arc<Mutex<Vec<mpsc::UnboundedSender<AuthEvent>>>>,
    probe_calls: Arc<AtomicUsize>,
    sign_out_calls: Arc<AtomicUsize>,
    unsubscribes: Arc<AtomicUsize>,
}

impl MockIdentityProvider {
    /// Provider with no session.
    pub fn new() -> Self {
        Self {
            session: Arc::new(Mutex::new(None)),
            session_error: Arc::new(Mutex::new(None)),
            sign_out_error: Arc::new(Mutex::new(None)),
            probe_delay: Arc::new(Mutex::new(None)),
            replay_initial: Arc::new(Mutex::new(true)),
            subscribers: Arc::new(Mutex::new(Vec::new())),
            probe_calls: Arc::new(AtomicUsize::new(0)),
            sign_out_calls: Arc::new(AtomicUsize::new(0)),
            unsubscribes: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_session(session: Session) -> Self {
        let provider = Self::new();
        provider.set_session(Some(session));
        provider
    }

    /// Replace the current session without emitting anything.
    pub fn set_session(&self, session: Option<Session>) {
        *self.session.lock().unwrap() = session;
    }

    pub fn current(&self) -> Option<Session> {
        self.session.lock().unwrap().clone()
    }

    /// Make `get_current_session` fail.
    pub fn set_session_error(&self, error: Option<ProviderError>) {
        *self.session_error.lock().unwrap() = error;
    }

    /// Make `sign_out` fail. No event is emitted on failure.
    pub fn set_sign_out_error(&self, error: Option<ProviderError>) {
        *self.sign_out_error.lock().unwrap() = error;
    }

    /// Delay `get_current_session` to simulate a slow or hanging backend.
    pub fn set_probe_delay(&self, delay: Option<Duration>) {
        *self.probe_delay.lock().unwrap() = delay;
    }

    /// Whether `subscribe` replays the current session (default true).
    pub fn set_replay_initial(&self, replay: bool) {
        *self.replay_initial.lock().unwrap() = replay;
    }

    /// Deliver `event` to every live subscription.
    ///
    /// The current session follows the event: sign-out or an empty event
    /// clears it, anything carrying a session replaces it.
    pub fn emit(&self, event: AuthEvent) {
        self.set_session(event.effective_session().cloned());
        let mut subscribers = self.subscribers.lock().unwrap();
        subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    /// Subscriptions that have not been dropped.
    pub fn subscriber_count(&self) -> usize {
        let mut subscribers = self.subscribers.lock().unwrap();
        subscribers.retain(|tx| !tx.is_closed());
        subscribers.len()
    }

    pub fn probe_calls(&self) -> usize {
        self.probe_calls.load(Ordering::SeqCst)
    }

    pub fn sign_out_calls(&self) -> usize {
        self.sign_out_calls.load(Ordering::SeqCst)
    }

    /// Unsubscribe hooks that have run.
    pub fn unsubscribe_count(&self) -> usize {
        self.unsubscribes.load(Ordering::SeqCst)
    }
}

impl Default for MockIdentityProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IdentityProvider for MockIdentityProvider {
    async fn get_current_session(&self) -> Result<Option<Session>, ProviderError> {
        self.probe_calls.fetch_add(1, Ordering::SeqCst);

        let delay = *self.probe_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(err) = self.session_error.lock().unwrap().clone() {
            return Err(err);
        }
        Ok(self.current())
    }

    fn subscribe(&self) -> Subscription {
        let (tx, subscription) = Subscription::channel();
        if *self.replay_initial.lock().unwrap() {
            let _ = tx.send(AuthEvent::initial(self.current()));
        }
        self.subscribers.lock().unwrap().push(tx);

        let unsubscribes = self.unsubscribes.clone();
        subscription.with_unsubscribe(move || {
            unsubscribes.fetch_add(1, Ordering::SeqCst);
        })
    }

    async fn sign_out(&self) -> Result<(), ProviderError> {
        self.sign_out_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.sign_out_error.lock().unwrap().clone() {
            return Err(err);
        }
        self.emit(AuthEvent::signed_out());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::AuthEventKind;

    #[tokio::test]
    async fn test_subscribe_replays_current_session() {
        let provider = MockIdentityProvider::with_session(Session::new("u1", "t1"));
        let mut sub = provider.subscribe();

        let event = sub.recv().await.unwrap();
        assert_eq!(event, AuthEvent::initial(Some(Session::new("u1", "t1"))));
    }

    #[tokio::test]
    async fn test_emit_fans_out_and_tracks_session() {
        let provider = MockIdentityProvider::new();
        provider.set_replay_initial(false);
        let mut first = provider.subscribe();
        let mut second = provider.subscribe();

        provider.emit(AuthEvent::signed_in(Session::new("u1", "t1")));

        assert_eq!(first.recv().await.unwrap().kind, AuthEventKind::SignedIn);
        assert_eq!(second.recv().await.unwrap().kind, AuthEventKind::SignedIn);
        assert_eq!(provider.current().unwrap().user_id, "u1");
    }

    #[tokio::test]
    async fn test_sign_out_emits_event() {
        let provider = MockIdentityProvider::with_session(Session::new("u1", "t1"));
        provider.set_replay_initial(false);
        let mut sub = provider.subscribe();

        provider.sign_out().await.unwrap();

        assert_eq!(sub.recv().await.unwrap().kind, AuthEventKind::SignedOut);
        assert_eq!(provider.current(), None);
        assert_eq!(provider.sign_out_calls(), 1);
    }

    #[tokio::test]
    async fn test_failed_sign_out_keeps_session() {
        let provider = MockIdentityProvider::with_session(Session::new("u1", "t1"));
        provider.set_sign_out_error(Some(ProviderError::NoSession));

        assert_eq!(provider.sign_out().await, Err(ProviderError::NoSession));
        assert!(provider.current().is_some());
    }

    #[test]
    fn test_dropping_subscription_unsubscribes() {
        let provider = MockIdentityProvider::new();
        let sub = provider.subscribe();
        assert_eq!(provider.subscriber_count(), 1);

        drop(sub);

        assert_eq!(provider.subscriber_count(), 0);
        assert_eq!(provider.unsubscribe_count(), 1);
    }
}
