//! One-time startup check for a live session.

use std::sync::Arc;
use std::time::Duration;

use super::resolver::ProfileResolver;
use super::store::SessionStore;
use super::token_cache::{TokenCache, TokenSource};
use crate::domain::{Identity, IdentityOrigin, Session};
use crate::traits::IdentityProvider;

/// What the startup probe found.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeReport {
    pub identity: Option<Identity>,
    /// Whether the probe resolved and applied the identity's profile.
    pub profile_fetched: bool,
}

pub struct IdentityProbe {
    provider: Arc<dyn IdentityProvider>,
    store: Arc<SessionStore>,
    cache: Arc<TokenCache>,
    resolver: Arc<ProfileResolver>,
    timeout: Duration,
}

impl IdentityProbe {
    pub fn new(
        provider: Arc<dyn IdentityProvider>,
        store: Arc<SessionStore>,
        cache: Arc<TokenCache>,
        resolver: Arc<ProfileResolver>,
        timeout: Duration,
    ) -> Self {
        Self {
            provider,
            store,
            cache,
            resolver,
            timeout,
        }
    }

    /// Run the probe. Marks the probe completed in the store on every path.
    pub async fn probe(&self) -> ProbeReport {
        let report = match self.current_session().await {
            Some(session) => self.resolve_session(session).await,
            None => {
                if self.store.settle_unauthenticated() {
                    tracing::info!("Startup probe: no session");
                }
                ProbeReport {
                    identity: None,
                    profile_fetched: false,
                }
            }
        };

        let resolved = if report.profile_fetched {
            report.identity.as_ref().map(|identity| identity.id.clone())
        } else {
            None
        };
        self.store.mark_probe_completed(resolved);
        report
    }

    async fn current_session(&self) -> Option<Session> {
        match tokio::time::timeout(self.timeout, self.provider.get_current_session()).await {
            Ok(Ok(session)) => session,
            Ok(Err(err)) => {
                tracing::warn!(
                    code = err.error_code(),
                    category = %err.category(),
                    "Startup session check failed, treating as signed out: {}",
                    err
                );
                None
            }
            Err(_) => {
                tracing::warn!(
                    "Startup session check timed out after {:?}, treating as signed out",
                    self.timeout
                );
                None
            }
        }
    }

    async fn resolve_session(&self, session: Session) -> ProbeReport {
        let identity = Identity::from_session(&session, IdentityOrigin::StartupProbe);
        self.cache.set(session.access_token.clone(), TokenSource::HandOff);

        if !self.store.adopt_probe_identity(identity.clone()) {
            tracing::debug!(
                "Startup probe found {} but a live event already installed another identity",
                identity.id
            );
            return ProbeReport {
                identity: Some(identity),
                profile_fetched: false,
            };
        }

        tracing::info!("Startup probe: session for {}", identity.id);
        let report = self
            .resolver
            .resolve_and_apply(&identity.id, Some(session.access_token))
            .await;

        ProbeReport {
            profile_fetched: !report.resolution.is_discarded(),
            identity: Some(identity),
        }
    }
}
