//! HTTP client trait abstraction.
//!
//! The REST adapters talk to the hosted backend through this trait so the
//! transport can be swapped for a mock in tests.

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;

/// HTTP headers represented as a key-value map.
pub type Headers = HashMap<String, String>;

/// HTTP response wrapper.
#[derive(Debug, Clone)]
pub struct Response {
    /// HTTP status code
    pub status: u16,
    /// Response headers
    pub headers: Headers,
    /// Response body
    pub body: Bytes,
}

impl Response {
    pub fn new(status: u16, body: Bytes) -> Self {
        Self {
            status,
            headers: HashMap::new(),
            body,
        }
    }

    pub fn with_headers(status: u16, headers: Headers, body: Bytes) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// Check if the response indicates success (2xx status).
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Get the response body as a string.
    pub fn text(&self) -> Result<String, std::string::FromUtf8Error> {
        String::from_utf8(self.body.to_vec())
    }

    /// Parse the response body as JSON.
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }

    /// Best-effort human readable error message from the body.
    ///
    /// The backend's auth and row endpoints use different keys for the
    /// message (`msg`, `message`, `error_description`, `error`); the raw
    /// body is used when none of them is present.
    pub fn error_message(&self) -> String {
        if let Ok(serde_json::Value::Object(map)) = self.json::<serde_json::Value>() {
            for key in ["msg", "message", "error_description", "error"] {
                if let Some(serde_json::Value::String(msg)) = map.get(key) {
                    return msg.clone();
                }
            }
        }
        match self.text() {
            Ok(text) if !text.trim().is_empty() => text,
            _ => format!("HTTP {}", self.status),
        }
    }

    /// Turn a non-2xx response into [`HttpError::ServerError`].
    pub fn error_for_status(self) -> Result<Response, HttpError> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(HttpError::ServerError {
                status: self.status,
                message: self.error_message(),
            })
        }
    }
}

/// HTTP client errors.
#[derive(Debug, Clone, PartialEq)]
pub enum HttpError {
    /// Connection failed
    ConnectionFailed(String),
    /// Request timeout
    Timeout(String),
    /// Server returned an error status
    ServerError { status: u16, message: String },
    /// Request was aborted before a response arrived
    Cancelled,
    /// IO error
    Io(String),
    /// Invalid URL
    InvalidUrl(String),
    /// Other error
    Other(String),
}

impl std::fmt::Display for HttpError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HttpError::ConnectionFailed(msg) => write!(f, "Connection failed: {}", msg),
            HttpError::Timeout(msg) => write!(f, "Request timeout: {}", msg),
            HttpError::ServerError { status, message } => {
                write!(f, "Server error ({}): {}", status, message)
            }
            HttpError::Cancelled => write!(f, "Request cancelled"),
            HttpError::Io(msg) => write!(f, "IO error: {}", msg),
            HttpError::InvalidUrl(msg) => write!(f, "Invalid URL: {}", msg),
            HttpError::Other(msg) => write!(f, "HTTP error: {}", msg),
        }
    }
}

impl std::error::Error for HttpError {}

/// Trait for HTTP client operations.
///
/// Implementations return `Ok` for every response that arrived, whatever its
/// status; callers decide what a non-2xx status means. `Err` is reserved for
/// requests that never produced a response.
///
/// # Example
///
/// ```ignore
/// use rota_session::traits::{HttpClient, Headers, HttpError};
///
/// async fn fetch_user<C: HttpClient>(client: &C) -> Result<String, HttpError> {
///     let response = client.get("https://project.example.co/auth/v1/user", &Headers::new()).await?;
///     response.text().map_err(|e| HttpError::Other(e.to_string()))
/// }
/// ```
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Perform a GET request.
    async fn get(&self, url: &str, headers: &Headers) -> Result<Response, HttpError>;

    /// Perform a POST request with a string body.
    async fn post(&self, url: &str, body: &str, headers: &Headers) -> Result<Response, HttpError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_is_success() {
        assert!(Response::new(200, Bytes::new()).is_success());
        assert!(Response::new(204, Bytes::new()).is_success());
        assert!(!Response::new(401, Bytes::new()).is_success());
        assert!(!Response::new(500, Bytes::new()).is_success());
    }

    #[test]
    fn test_error_message_prefers_json_keys() {
        let auth = Response::new(400, Bytes::from(r#"{"error":"invalid_grant","error_description":"Invalid login credentials"}"#));
        assert_eq!(auth.error_message(), "Invalid login credentials");

        let rows = Response::new(401, Bytes::from(r#"{"code":"PGRST301","message":"JWT expired"}"#));
        assert_eq!(rows.error_message(), "JWT expired");

        let gotrue = Response::new(401, Bytes::from(r#"{"msg":"invalid JWT"}"#));
        assert_eq!(gotrue.error_message(), "invalid JWT");
    }

    #[test]
    fn test_error_message_falls_back_to_body_or_status() {
        assert_eq!(
            Response::new(502, Bytes::from("Bad Gateway")).error_message(),
            "Bad Gateway"
        );
        assert_eq!(Response::new(503, Bytes::new()).error_message(), "HTTP 503");
    }

    #[test]
    fn test_error_for_status() {
        assert!(Response::new(200, Bytes::from("[]")).error_for_status().is_ok());

        let err = Response::new(403, Bytes::from(r#"{"message":"permission denied"}"#))
            .error_for_status()
            .unwrap_err();
        assert_eq!(
            err,
            HttpError::ServerError {
                status: 403,
                message: "permission denied".to_string()
            }
        );
    }

    #[test]
    fn test_http_error_display() {
        assert_eq!(HttpError::Cancelled.to_string(), "Request cancelled");
        assert_eq!(
            HttpError::ServerError {
                status: 500,
                message: "Internal Error".to_string()
            }
            .to_string(),
            "Server error (500): Internal Error"
        );
    }
}
