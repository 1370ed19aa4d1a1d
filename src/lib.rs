//! rota-session - session identity synchronizer for the Rota scheduling dashboard
//!
//! Tracks who is signed in and what their profile record says, tolerating a
//! request substrate that cancels in-flight calls and an identity event stream
//! that races the startup session check. See [`session::SessionSync`].
//!
//! This library exposes modules for use in integration tests.

pub mod adapters;
pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod session;
pub mod traits;
