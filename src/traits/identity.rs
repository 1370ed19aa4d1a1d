//! Identity provider trait abstraction.
//!
//! The identity provider owns the session: it answers the one-time startup
//! probe, delivers identity-change events, and performs sign-out. The
//! synchronizer only observes it.

use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::mpsc;

use crate::domain::{AuthEvent, Session};
use crate::error::ProviderError;

/// Single-consumer handle on the provider's identity-change stream.
///
/// Events are delivered in order. Dropping the subscription unsubscribes:
/// the receiving half is closed and the provider's unsubscribe hook, if any,
/// runs exactly once.
pub struct Subscription {
    receiver: mpsc::UnboundedReceiver<AuthEvent>,
    on_unsubscribe: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn new(receiver: mpsc::UnboundedReceiver<AuthEvent>) -> Self {
        Self {
            receiver,
            on_unsubscribe: None,
        }
    }

    /// Create a connected sender/subscription pair.
    pub fn channel() -> (mpsc::UnboundedSender<AuthEvent>, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        (tx, Self::new(rx))
    }

    /// Register a hook that runs when the subscription is dropped.
    pub fn with_unsubscribe(mut self, hook: impl FnOnce() + Send + 'static) -> Self {
        self.on_unsubscribe = Some(Box::new(hook));
        self
    }

    /// Wait for the next event. `None` once the provider side is gone.
    pub async fn recv(&mut self) -> Option<AuthEvent> {
        self.receiver.recv().await
    }

    /// Explicitly end the subscription.
    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.receiver.close();
        if let Some(hook) = self.on_unsubscribe.take() {
            hook();
        }
    }
}

impl Stream for Subscription {
    type Item = AuthEvent;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().receiver.poll_recv(cx)
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("has_unsubscribe_hook", &self.on_unsubscribe.is_some())
            .finish()
    }
}

/// External identity provider.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Check whether a live session exists right now.
    ///
    /// May error or hang; the startup probe bounds the wait and treats any
    /// failure as "no session".
    async fn get_current_session(&self) -> Result<Option<Session>, ProviderError>;

    /// Subscribe to identity-change events.
    ///
    /// Implementations replay the current session as an
    /// [`AuthEventKind::InitialSession`](crate::domain::AuthEventKind::InitialSession)
    /// event at subscription time.
    fn subscribe(&self) -> Subscription;

    /// End the current session. Implementations emit a sign-out event to
    /// every live subscription.
    async fn sign_out(&self) -> Result<(), ProviderError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_events_arrive_in_order() {
        let (tx, mut sub) = Subscription::channel();
        tx.send(AuthEvent::initial(None)).unwrap();
        tx.send(AuthEvent::signed_in(Session::new("u1", "t1"))).unwrap();

        assert_eq!(sub.recv().await, Some(AuthEvent::initial(None)));
        assert_eq!(
            sub.recv().await.map(|e| e.kind),
            Some(crate::domain::AuthEventKind::SignedIn)
        );
    }

    #[tokio::test]
    async fn test_drop_runs_unsubscribe_hook_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let (tx, sub) = Subscription::channel();
        let sub = sub.with_unsubscribe(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        sub.unsubscribe();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(tx.send(AuthEvent::signed_out()).is_err());
    }

    #[tokio::test]
    async fn test_subscription_as_stream() {
        let (tx, sub) = Subscription::channel();
        tx.send(AuthEvent::signed_out()).unwrap();
        drop(tx);

        let events: Vec<AuthEvent> = sub.collect().await;
        assert_eq!(events, vec![AuthEvent::signed_out()]);
    }
}
