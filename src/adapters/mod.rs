//! Concrete implementations of trait abstractions.
//!
//! Production adapters implement the seams in `crate::traits` against the
//! hosted backend and the local file system. The synchronizer only sees the
//! traits, so every adapter can be swapped for its mock.
//!
//! # Adapters
//!
//! - [`ReqwestHttpClient`] - HTTP client using reqwest
//! - [`RestIdentityProvider`] - Session probe, sign-in, refresh, sign-out over `/auth/v1`
//! - [`RestProfileStore`] - Profile row lookup over `/rest/v1`
//! - [`FileStorage`] - JSON-file local storage
//!
//! # Mock Implementations
//!
//! The [`mock`] submodule provides test doubles for every seam.

pub mod file_storage;
pub mod mock;
pub mod reqwest_http;
pub mod rest_identity;
pub mod rest_profile;

pub use file_storage::FileStorage;
pub use mock::{InMemoryStorage, MockHttpClient, MockIdentityProvider, MockProfileStore};
pub use reqwest_http::ReqwestHttpClient;
pub use rest_identity::RestIdentityProvider;
pub use rest_profile::RestProfileStore;
