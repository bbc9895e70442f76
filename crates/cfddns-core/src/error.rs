//! Error types for the DDNS synchronizer
//!
//! Provider calls never panic and never retry: every failure surfaces as an
//! [`Error`] value and the caller decides whether it aborts a zone, skips a
//! single record, or is merely logged.

use thiserror::Error;

/// Result type alias for DDNS operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the DDNS synchronizer
#[derive(Error, Debug)]
pub enum Error {
    /// Address detector errors (network-info source unreachable or malformed)
    #[error("Address detector error: {0}")]
    Detector(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The request never produced an HTTP response (DNS, connect, timeout)
    #[error("HTTP error: {0}")]
    Http(String),

    /// The provider answered with a non-success status
    #[error("{method} {url} failed with status {status}: {body}")]
    Api {
        /// HTTP method of the failed request
        method: String,
        /// Request URL
        url: String,
        /// HTTP status code
        status: u16,
        /// Raw response body
        body: String,
    },

    /// Zone or record not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Provider-specific error (unexpected response shape and the like)
    #[error("Provider error ({provider}): {message}")]
    Provider {
        /// Provider name
        provider: String,
        /// Error message
        message: String,
    },
}

impl Error {
    /// Create an address detector error
    pub fn detector(msg: impl Into<String>) -> Self {
        Self::Detector(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an HTTP error
    pub fn http(msg: impl Into<String>) -> Self {
        Self::Http(msg.into())
    }

    /// Create a "not found" error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a provider-specific error
    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Whether this error came from talking to a remote API.
    ///
    /// Transport failures are soft: the next cycle is the retry.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Error::Http(_) | Error::Api { .. } | Error::NotFound(_) | Error::Provider { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_message_carries_request_context() {
        let err = Error::Api {
            method: "PUT".to_string(),
            url: "https://api.example.test/zones/z/dns_records/r".to_string(),
            status: 400,
            body: "{\"success\":false}".to_string(),
        };

        let msg = err.to_string();
        assert!(msg.starts_with("PUT https://api.example.test/zones/z/dns_records/r"));
        assert!(msg.contains("400"));
        assert!(err.is_transport());
    }

    #[test]
    fn config_errors_are_not_transport_failures() {
        assert!(!Error::config("no zones").is_transport());
        assert!(!Error::detector("down").is_transport());
        assert!(Error::not_found("zone").is_transport());
    }
}
