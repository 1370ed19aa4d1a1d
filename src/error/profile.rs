//! Errors raised while fetching a profile record.

use std::fmt;

use super::category::ErrorCategory;
use crate::traits::HttpError;

/// Profile lookup failures.
///
/// A missing record is not an error: the profile store reports it as
/// `Ok(None)` and the synchronizer routes it to onboarding.
#[derive(Debug, Clone, PartialEq)]
pub enum ProfileError {
    /// The request was aborted by the transport.
    Cancelled,

    /// The bearer token was missing, expired or rejected.
    Unauthorized { message: String },

    /// The backend answered with a non-success status.
    Http { status: u16, message: String },

    /// Connection, DNS or timeout failure.
    Transport { message: String },

    /// The response body could not be decoded.
    Decode { message: String },
}

impl ProfileError {
    /// True for transport-level aborts.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, ProfileError::Cancelled)
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            ProfileError::Cancelled => ErrorCategory::Cancellation,
            ProfileError::Unauthorized { .. } => ErrorCategory::Auth,
            ProfileError::Http { .. } => ErrorCategory::Server,
            ProfileError::Transport { .. } => ErrorCategory::Network,
            ProfileError::Decode { .. } => ErrorCategory::Client,
        }
    }

    /// Get a short error code for logging.
    pub fn error_code(&self) -> &'static str {
        match self {
            ProfileError::Cancelled => "E_PROFILE_CANCELLED",
            ProfileError::Unauthorized { .. } => "E_PROFILE_UNAUTHORIZED",
            ProfileError::Http { .. } => "E_PROFILE_HTTP",
            ProfileError::Transport { .. } => "E_PROFILE_TRANSPORT",
            ProfileError::Decode { .. } => "E_PROFILE_DECODE",
        }
    }
}

impl fmt::Display for ProfileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProfileError::Cancelled => write!(f, "Profile request was cancelled"),
            ProfileError::Unauthorized { message } => {
                write!(f, "Profile request unauthorized: {}", message)
            }
            ProfileError::Http { status, message } => {
                write!(f, "Profile request failed ({}): {}", status, message)
            }
            ProfileError::Transport { message } => {
                write!(f, "Profile request transport error: {}", message)
            }
            ProfileError::Decode { message } => {
                write!(f, "Profile response could not be decoded: {}", message)
            }
        }
    }
}

impl std::error::Error for ProfileError {}

impl From<HttpError> for ProfileError {
    fn from(err: HttpError) -> Self {
        match err {
            HttpError::Cancelled => ProfileError::Cancelled,
            HttpError::ServerError { status, message } if status == 401 || status == 403 => {
                ProfileError::Unauthorized { message }
            }
            HttpError::ServerError { status, message } => ProfileError::Http { status, message },
            other => ProfileError::Transport {
                message: other.to_string(),
            },
        }
    }
}

impl From<serde_json::Error> for ProfileError {
    fn from(err: serde_json::Error) -> Self {
        ProfileError::Decode {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancellation_detection() {
        assert!(ProfileError::Cancelled.is_cancellation());
        assert!(!ProfileError::Transport {
            message: "reset".to_string()
        }
        .is_cancellation());
    }

    #[test]
    fn test_from_http_error() {
        assert_eq!(ProfileError::from(HttpError::Cancelled), ProfileError::Cancelled);
        assert!(matches!(
            ProfileError::from(HttpError::ServerError {
                status: 401,
                message: "JWT expired".to_string()
            }),
            ProfileError::Unauthorized { .. }
        ));
        assert!(matches!(
            ProfileError::from(HttpError::ServerError {
                status: 500,
                message: "boom".to_string()
            }),
            ProfileError::Http { status: 500, .. }
        ));
        assert!(matches!(
            ProfileError::from(HttpError::Timeout("10s".to_string())),
            ProfileError::Transport { .. }
        ));
    }

    #[test]
    fn test_categories() {
        assert_eq!(ProfileError::Cancelled.category(), ErrorCategory::Cancellation);
        assert_eq!(
            ProfileError::Unauthorized {
                message: String::new()
            }
            .category(),
            ErrorCategory::Auth
        );
        assert!(ProfileError::Cancelled.category().is_retryable());
    }

    #[test]
    fn test_display() {
        assert_eq!(
            ProfileError::Http {
                status: 503,
                message: "unavailable".to_string()
            }
            .to_string(),
            "Profile request failed (503): unavailable"
        );
    }
}
