//! Session identity synchronizer.
//!
//! Keeps `{identity, profile, loading}` correct for the lifetime of the
//! process while two sources report identity changes: the one-time startup
//! [`probe`] and the provider's event stream, applied by the [`reconciler`].
//!
//! Components, leaves first:
//!
//! - [`token_cache`] / [`extraction`] - best-effort bearer token
//! - [`retry`] / [`resolver`] - profile lookup with bounded retry
//! - [`probe`] - startup session check
//! - [`reconciler`] - serialized event handling and the startup race arbiter
//! - [`store`] - the injectable state owner
//! - [`facade`] - [`SessionSync`], the only thing consumers touch

pub mod extraction;
pub mod facade;
pub mod probe;
pub mod reconciler;
pub mod resolver;
pub mod retry;
pub mod store;
pub mod token_cache;

pub use facade::{SessionDeps, SessionSync};
pub use probe::{IdentityProbe, ProbeReport};
pub use reconciler::{EventReconciler, Reconciliation};
pub use resolver::{ProfileResolver, Resolution, ResolveReport};
pub use retry::RetryPolicy;
pub use store::{ProbeStatus, SessionState, SessionStatus, SessionStore};
pub use token_cache::{CachedToken, TokenCache, TokenSource};
