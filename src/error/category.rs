//! Error category classification for session synchronization.
//!
//! Categories drive the handling decisions made by the synchronizer:
//! only transport cancellations are retried, everything else resolves
//! to a well-defined terminal session state and is logged.

use std::fmt;

/// High-level categorization of errors for handling decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// The request was aborted by the transport for reasons unrelated to
    /// business logic. The only category the profile resolver retries.
    Cancellation,

    /// Authentication/authorization failures (missing, expired or rejected token).
    Auth,

    /// Connection, DNS and timeout failures.
    Network,

    /// Backend errors (non-auth 4xx/5xx responses).
    Server,

    /// Malformed responses or programming errors.
    Client,

    /// Filesystem and local storage failures.
    System,

    /// Missing or invalid settings.
    Configuration,
}

impl ErrorCategory {
    /// Returns true if the synchronizer retries errors in this category.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorCategory::Cancellation)
    }

    /// Returns a short label for the category suitable for logging.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::Cancellation => "cancellation",
            ErrorCategory::Auth => "auth",
            ErrorCategory::Network => "network",
            ErrorCategory::Server => "server",
            ErrorCategory::Client => "client",
            ErrorCategory::System => "system",
            ErrorCategory::Configuration => "configuration",
        }
    }

    /// Returns a user-friendly description of the category.
    pub fn description(&self) -> &'static str {
        match self {
            ErrorCategory::Cancellation => "Request was interrupted",
            ErrorCategory::Auth => "Authentication problem",
            ErrorCategory::Network => "Network connectivity issue",
            ErrorCategory::Server => "Server-side issue",
            ErrorCategory::Client => "Application error",
            ErrorCategory::System => "System error",
            ErrorCategory::Configuration => "Configuration problem",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_cancellation_is_retryable() {
        assert!(ErrorCategory::Cancellation.is_retryable());
        assert!(!ErrorCategory::Auth.is_retryable());
        assert!(!ErrorCategory::Network.is_retryable());
        assert!(!ErrorCategory::Server.is_retryable());
        assert!(!ErrorCategory::Client.is_retryable());
        assert!(!ErrorCategory::System.is_retryable());
        assert!(!ErrorCategory::Configuration.is_retryable());
    }

    #[test]
    fn test_category_display() {
        assert_eq!(format!("{}", ErrorCategory::Cancellation), "cancellation");
        assert_eq!(format!("{}", ErrorCategory::Auth), "auth");
    }

    #[test]
    fn test_category_description() {
        assert!(ErrorCategory::Network.description().contains("Network"));
        assert!(ErrorCategory::Auth.description().contains("Authentication"));
    }
}
