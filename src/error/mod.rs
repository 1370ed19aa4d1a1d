//! Error handling for the session synchronizer.
//!
//! Each collaborator seam has its own error enum with an [`ErrorCategory`]
//! and a short error code for logging. [`SessionError`] unifies them for
//! callers outside the synchronizer, such as the command-line binary.
//!
//! | Kind | Handling |
//! |------|----------|
//! | Cancellation | Retried with bounded backoff |
//! | Not found | Not an error, profile resolves to none |
//! | Auth / transport / server | Logged, profile resolves to none |
//! | Stale result | Discarded silently |
//!
//! No error raised here is propagated past [`crate::session::SessionSync`].

mod category;
mod profile;
mod provider;

pub use category::ErrorCategory;
pub use profile::ProfileError;
pub use provider::ProviderError;

use thiserror::Error;

use crate::traits::{HttpError, StorageError};

/// Unified error type for operations outside the synchronizer core.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Profile(#[from] ProfileError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Http(#[from] HttpError),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl SessionError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            SessionError::Provider(err) => err.category(),
            SessionError::Profile(err) => err.category(),
            SessionError::Storage(_) => ErrorCategory::System,
            SessionError::Http(HttpError::Cancelled) => ErrorCategory::Cancellation,
            SessionError::Http(HttpError::ServerError { .. }) => ErrorCategory::Server,
            SessionError::Http(_) => ErrorCategory::Network,
            SessionError::Config(_) => ErrorCategory::Configuration,
        }
    }
}

/// Type alias for Results using [`SessionError`].
pub type SessionResult<T> = Result<T, SessionError>;
