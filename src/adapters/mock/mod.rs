//! Mock implementations for testing.
//!
//! Test doubles for every collaborator seam, so the synchronizer can be
//! exercised without a backend, a network, or the file system.
//!
//! # Available Mocks
//!
//! - [`MockIdentityProvider`] - Session probe, event injection, sign-out
//! - [`MockProfileStore`] - Scripted profile lookups
//! - [`InMemoryStorage`] - In-memory local storage
//! - [`MockHttpClient`] - HTTP client with configurable responses

pub mod http;
pub mod identity;
pub mod profile;
pub mod storage;

pub use http::{MockHttpClient, MockResponse, RecordedRequest};
pub use identity::MockIdentityProvider;
pub use profile::{MockProfileResponse, MockProfileStore, ProfileLookup};
pub use storage::InMemoryStorage;
