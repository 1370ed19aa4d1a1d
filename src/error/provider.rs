//! Errors raised by the identity provider.

use std::fmt;

use super::category::ErrorCategory;
use crate::traits::{HttpError, StorageError};

/// Identity provider failures (session probe, sign-in, refresh, sign-out).
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderError {
    /// The request was aborted by the transport.
    Cancelled,

    /// Credentials or token were rejected.
    Unauthorized { message: String },

    /// The backend answered with a non-success status.
    Http { status: u16, message: String },

    /// Connection, DNS or timeout failure.
    Transport { message: String },

    /// The response body could not be decoded.
    Decode { message: String },

    /// The operation needs a session and none is held.
    NoSession,

    /// Persisting or removing the session entry failed.
    Storage(StorageError),
}

impl ProviderError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            ProviderError::Cancelled => ErrorCategory::Cancellation,
            ProviderError::Unauthorized { .. } | ProviderError::NoSession => ErrorCategory::Auth,
            ProviderError::Http { .. } => ErrorCategory::Server,
            ProviderError::Transport { .. } => ErrorCategory::Network,
            ProviderError::Decode { .. } => ErrorCategory::Client,
            ProviderError::Storage(_) => ErrorCategory::System,
        }
    }

    /// Get a short error code for logging.
    pub fn error_code(&self) -> &'static str {
        match self {
            ProviderError::Cancelled => "E_PROVIDER_CANCELLED",
            ProviderError::Unauthorized { .. } => "E_PROVIDER_UNAUTHORIZED",
            ProviderError::Http { .. } => "E_PROVIDER_HTTP",
            ProviderError::Transport { .. } => "E_PROVIDER_TRANSPORT",
            ProviderError::Decode { .. } => "E_PROVIDER_DECODE",
            ProviderError::NoSession => "E_PROVIDER_NO_SESSION",
            ProviderError::Storage(_) => "E_PROVIDER_STORAGE",
        }
    }
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderError::Cancelled => write!(f, "Identity request was cancelled"),
            ProviderError::Unauthorized { message } => write!(f, "Unauthorized: {}", message),
            ProviderError::Http { status, message } => {
                write!(f, "Identity request failed ({}): {}", status, message)
            }
            ProviderError::Transport { message } => write!(f, "Transport error: {}", message),
            ProviderError::Decode { message } => {
                write!(f, "Identity response could not be decoded: {}", message)
            }
            ProviderError::NoSession => write!(f, "No active session"),
            ProviderError::Storage(err) => write!(f, "Session storage error: {}", err),
        }
    }
}

impl std::error::Error for ProviderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ProviderError::Storage(err) => Some(err),
            _ => None,
        }
    }
}

impl From<HttpError> for ProviderError {
    fn from(err: HttpError) -> Self {
        match err {
            HttpError::Cancelled => ProviderError::Cancelled,
            HttpError::ServerError { status, message } if status == 400 || status == 401 || status == 403 => {
                ProviderError::Unauthorized { message }
            }
            HttpError::ServerError { status, message } => ProviderError::Http { status, message },
            other => ProviderError::Transport {
                message: other.to_string(),
            },
        }
    }
}

impl From<serde_json::Error> for ProviderError {
    fn from(err: serde_json::Error) -> Self {
        ProviderError::Decode {
            message: err.to_string(),
        }
    }
}

impl From<StorageError> for ProviderError {
    fn from(err: StorageError) -> Self {
        ProviderError::Storage(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bad_credentials_are_unauthorized() {
        // The token endpoint rejects a wrong password with 400
        let err = ProviderError::from(HttpError::ServerError {
            status: 400,
            message: "Invalid login credentials".to_string(),
        });
        assert!(matches!(err, ProviderError::Unauthorized { .. }));
        assert_eq!(err.category(), ErrorCategory::Auth);
    }

    #[test]
    fn test_storage_error_has_source() {
        use std::error::Error;
        let err = ProviderError::from(StorageError::Unavailable("read-only".to_string()));
        assert!(err.source().is_some());
        assert_eq!(err.error_code(), "E_PROVIDER_STORAGE");
    }
}
