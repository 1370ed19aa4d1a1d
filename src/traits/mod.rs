//! Trait abstractions for the synchronizer's collaborators.
//!
//! # Traits
//!
//! - [`IdentityProvider`] - Session probe, identity-change stream, sign-out
//! - [`ProfileStore`] - Profile record lookup
//! - [`LocalStorage`] - Persisted key-value storage scanned by the token cache
//! - [`HttpClient`] - HTTP transport used by the REST adapters

pub mod http;
pub mod identity;
pub mod profile;
pub mod storage;

pub use http::{Headers, HttpClient, HttpError, Response};
pub use identity::{IdentityProvider, Subscription};
pub use profile::ProfileStore;
pub use storage::{LocalStorage, StorageError};
