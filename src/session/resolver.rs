//! Profile resolution with bounded retry on cancellation.
//!
//! The retry loop is an explicit state machine:
//!
//! ```text
//! Attempting ──cancelled, retries left──▶ Waiting ──▶ Retrying ──identity still current──▶ Attempting
//!     │                                                   │
//!     │ found / not found / other error / exhausted       │ identity changed
//!     ▼                                                   ▼
//!  Resolved                                           Discarded
//! ```

use std::sync::Arc;
use std::time::Duration;

use super::retry::RetryPolicy;
use super::store::SessionStore;
use super::token_cache::TokenCache;
use crate::domain::Profile;
use crate::error::ProfileError;
use crate::traits::ProfileStore;

/// Terminal outcome of one resolution.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Found(Profile),
    /// Signed in but no profile record yet.
    NotFound,
    /// Non-cancellation error, or cancellation after retries ran out.
    Failed(ProfileError),
    /// The identity changed while waiting to retry, or before the result
    /// could be applied.
    Discarded,
}

impl Resolution {
    /// The profile to store. Failures resolve to no profile.
    pub fn profile(&self) -> Option<&Profile> {
        match self {
            Resolution::Found(profile) => Some(profile),
            _ => None,
        }
    }

    pub fn is_discarded(&self) -> bool {
        matches!(self, Resolution::Discarded)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolveReport {
    pub resolution: Resolution,
    /// Requests issued to the profile store.
    pub attempts: u32,
}

#[derive(Debug)]
enum ResolveStep {
    Attempting { attempt: u32 },
    Waiting { attempt: u32, delay: Duration },
    Retrying { attempt: u32 },
    Resolved(Resolution),
    Discarded,
}

pub struct ProfileResolver {
    profiles: Arc<dyn ProfileStore>,
    store: Arc<SessionStore>,
    cache: Arc<TokenCache>,
    policy: RetryPolicy,
}

impl ProfileResolver {
    pub fn new(
        profiles: Arc<dyn ProfileStore>,
        store: Arc<SessionStore>,
        cache: Arc<TokenCache>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            profiles,
            store,
            cache,
            policy,
        }
    }

    /// Fetch the profile for `identity_id` without touching the session state.
    ///
    /// A missing `token` falls back to the token cache; if that is empty too
    /// the request goes out unauthenticated and is expected to fail.
    pub async fn resolve(&self, identity_id: &str, token: Option<String>) -> ResolveReport {
        let token = token.or_else(|| self.cache.get());
        if token.is_none() {
            tracing::warn!("Resolving profile for {} without a bearer token", identity_id);
        }

        let mut attempts = 0;
        let mut step = ResolveStep::Attempting { attempt: 0 };

        loop {
            step = match step {
                ResolveStep::Attempting { attempt } => {
                    attempts += 1;
                    match self.profiles.get_profile(identity_id, token.as_deref()).await {
                        Ok(Some(profile)) => ResolveStep::Resolved(Resolution::Found(profile)),
                        Ok(None) => {
                            tracing::info!("No profile record for {}", identity_id);
                            ResolveStep::Resolved(Resolution::NotFound)
                        }
                        Err(err)
                            if err.category().is_retryable() && self.policy.should_retry(attempt) =>
                        {
                            let delay = self.policy.delay_for(attempt);
                            tracing::debug!(
                                "Profile fetch for {} cancelled (attempt {}), retrying in {:?}",
                                identity_id,
                                attempt + 1,
                                delay
                            );
                            ResolveStep::Waiting { attempt, delay }
                        }
                        Err(err) => {
                            if err.is_cancellation() {
                                tracing::warn!(
                                    "Profile fetch for {} still cancelled after {} attempts",
                                    identity_id,
                                    self.policy.max_attempts()
                                );
                            } else {
                                tracing::warn!(
                                    code = err.error_code(),
                                    category = %err.category(),
                                    "Profile fetch for {} failed: {}",
                                    identity_id,
                                    err
                                );
                            }
                            ResolveStep::Resolved(Resolution::Failed(err))
                        }
                    }
                }
                ResolveStep::Waiting { attempt, delay } => {
                    tokio::time::sleep(delay).await;
                    ResolveStep::Retrying { attempt }
                }
                ResolveStep::Retrying { attempt } => {
                    if self.store.is_current(identity_id) {
                        ResolveStep::Attempting {
                            attempt: attempt + 1,
                        }
                    } else {
                        tracing::debug!(
                            "Identity changed while retrying profile fetch for {}",
                            identity_id
                        );
                        ResolveStep::Discarded
                    }
                }
                ResolveStep::Resolved(resolution) => {
                    return ResolveReport {
                        resolution,
                        attempts,
                    };
                }
                ResolveStep::Discarded => {
                    return ResolveReport {
                        resolution: Resolution::Discarded,
                        attempts,
                    };
                }
            };
        }
    }

    /// Resolve and write the result into the session state.
    ///
    /// The write is refused if `identity_id` stopped being current in the
    /// meantime; the report then says [`Resolution::Discarded`].
    pub async fn resolve_and_apply(&self, identity_id: &str, token: Option<String>) -> ResolveReport {
        let mut report = self.resolve(identity_id, token).await;
        if report.resolution.is_discarded() {
            return report;
        }

        let profile = report.resolution.profile().cloned();
        if !self.store.finish_resolution(identity_id, profile) {
            tracing::debug!("Dropping stale profile result for {}", identity_id);
            report.resolution = Resolution::Discarded;
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::mock::{InMemoryStorage, MockProfileResponse, MockProfileStore};
    use crate::domain::{Identity, IdentityOrigin};
    use crate::session::extraction::ProviderKeyMatcher;
    use crate::session::token_cache::TokenSource;

    struct Fixture {
        profiles: MockProfileStore,
        store: Arc<SessionStore>,
        cache: Arc<TokenCache>,
        resolver: ProfileResolver,
    }

    fn fixture() -> Fixture {
        let profiles = MockProfileStore::new();
        let store = Arc::new(SessionStore::new());
        let cache = Arc::new(TokenCache::new(
            Arc::new(InMemoryStorage::new()),
            ProviderKeyMatcher::default(),
        ));
        let resolver = ProfileResolver::new(
            Arc::new(profiles.clone()),
            store.clone(),
            cache.clone(),
            RetryPolicy::new(),
        );
        Fixture {
            profiles,
            store,
            cache,
            resolver,
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
    async fn test_found_is_idempotent() {
        let f = fixture();
        f.profiles.insert_profile("U1", manager());

        let first = f.resolver.resolve("U1", Some("T1".to_string())).await;
        let second = f.resolver.resolve("U1", Some("T1".to_string())).await;

        assert_eq!(first.resolution, Resolution::Found(manager()));
        assert_eq!(first, second);
        assert_eq!(f.profiles.call_count(), 2);
    }

    #[tokio::test]
    async fn test_not_found_is_not_an_error() {
        let f = fixture();
        let report = f.resolver.resolve("U2", Some("T2".to_string())).await;
        assert_eq!(report.resolution, Resolution::NotFound);
        assert_eq!(report.attempts, 1);
    }

    #[tokio::test]
    async fn test_non_cancellation_error_fails_without_retry() {
        let f = fixture();
        f.profiles.push_response(
            "U1",
            MockProfileResponse::Error(ProfileError::Unauthorized {
                message: "JWT expired".to_string(),
            }),
        );

        let report = f.resolver.resolve("U1", Some("T1".to_string())).await;

        assert!(matches!(
            report.resolution,
            Resolution::Failed(ProfileError::Unauthorized { .. })
        ));
        assert_eq!(report.attempts, 1);
        assert!(report.resolution.profile().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_retries_then_succeeds() {
        let f = fixture();
        f.store
            .install_identity(Identity::new("U1", "T1", IdentityOrigin::LiveEvent));
        f.profiles
            .push_response("U1", MockProfileResponse::Error(ProfileError::Cancelled));
        f.profiles
            .push_response("U1", MockProfileResponse::Error(ProfileError::Cancelled));
        f.profiles
            .push_response("U1", MockProfileResponse::Found(manager()));

        let started = tokio::time::Instant::now();
        let report = f.resolver.resolve("U1", Some("T1".to_string())).await;

        assert_eq!(report.resolution, Resolution::Found(manager()));
        assert_eq!(report.attempts, 3);
        // 500ms + 1000ms of backoff
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(1500));
        assert!(elapsed < Duration::from_millis(1600));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_bound_is_four_attempts() {
        let f = fixture();
        f.store
            .install_identity(Identity::new("U1", "T1", IdentityOrigin::LiveEvent));
        f.profiles
            .set_default_response(MockProfileResponse::Error(ProfileError::Cancelled));

        let report = f.resolver.resolve("U1", Some("T1".to_string())).await;

        assert_eq!(report.resolution, Resolution::Failed(ProfileError::Cancelled));
        assert_eq!(report.attempts, 4);
        assert_eq!(f.profiles.call_count(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_discarded_when_identity_changes() {
        let f = fixture();
        f.store
            .install_identity(Identity::new("U1", "T1", IdentityOrigin::LiveEvent));
        f.profiles
            .set_default_response(MockProfileResponse::Error(ProfileError::Cancelled));

        let store = f.store.clone();
        let (report, _) = tokio::join!(f.resolver.resolve("U1", Some("T1".to_string())), async {
            tokio::time::sleep(Duration::from_millis(100)).await;
            store.clear();
        });

        assert_eq!(report.resolution, Resolution::Discarded);
        assert_eq!(report.attempts, 1);
    }

    #[tokio::test]
    async fn test_missing_token_falls_back_to_cache() {
        let f = fixture();
        f.cache.set("cached-token", TokenSource::HandOff);
        f.profiles.insert_profile("U1", manager());

        f.resolver.resolve("U1", None).await;

        assert_eq!(f.profiles.calls()[0].token.as_deref(), Some("cached-token"));
    }

    #[tokio::test]
    async fn test_apply_refuses_stale_result() {
        let f = fixture();
        f.profiles.insert_profile("U1", manager());
        f.store
            .install_identity(Identity::new("U2", "T2", IdentityOrigin::LiveEvent));

        let report = f.resolver.resolve_and_apply("U1", Some("T1".to_string())).await;

        assert_eq!(report.resolution, Resolution::Discarded);
        assert!(f.store.snapshot().profile.is_none());
    }

    #[tokio::test]
    async fn test_apply_writes_profile_and_clears_loading() {
        let f = fixture();
        f.profiles.insert_profile("U1", manager());
        f.store
            .install_identity(Identity::new("U1", "T1", IdentityOrigin::LiveEvent));

        f.resolver.resolve_and_apply("U1", Some("T1".to_string())).await;

        let state = f.store.snapshot();
        assert_eq!(state.profile, Some(manager()));
        assert!(!state.loading);
    }
}
