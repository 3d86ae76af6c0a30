//! Fetch error types.
//!
//! Every failure mode of an outbound GET maps to one of the
//! [`FetchError`] variants below. The authentication pipeline does not
//! branch on the individual variants — any fetch error follows the same
//! denial path — but the variants preserve enough detail for diagnostic
//! logging.

use std::sync::Arc;

use thiserror::Error;

/// A boxed error type for source chain tracking.
pub type BoxError = Arc<dyn std::error::Error + Send + Sync>;

/// Result type alias for fetch operations.
pub type FetchResult<T> = Result<T, FetchError>;

/// Errors that can occur during an outbound HTTP GET.
///
/// # Non-exhaustive
///
/// This enum is marked `#[non_exhaustive]` — new variants may be added in
/// future minor releases without a semver-breaking change. Downstream match
/// expressions must include a wildcard arm (`_ =>`).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum FetchError {
    /// The URL could not be parsed.
    #[error("invalid URL '{url}': {source}")]
    InvalidUrl {
        /// The URL that failed to parse.
        url: String,
        /// The underlying parse error.
        #[source]
        source: url::ParseError,
    },

    /// The request could not be dispatched or completed.
    ///
    /// Covers DNS failures, connection refusals, TLS errors, and
    /// mid-transfer aborts.
    #[error("connection error: {message}")]
    Connection {
        /// Description of the connection failure.
        message: String,
        /// The underlying error, when available.
        #[source]
        source: Option<BoxError>,
    },

    /// The request exceeded the configured timeout.
    #[error("request to '{url}' timed out")]
    Timeout {
        /// The URL that timed out.
        url: String,
    },

    /// The server responded with a non-success status code.
    #[error("request to '{url}' returned status {status}")]
    Status {
        /// The URL that was fetched.
        url: String,
        /// The HTTP status code.
        status: u16,
    },
}

impl FetchError {
    /// Creates an [`FetchError::InvalidUrl`] error.
    pub fn invalid_url(url: impl Into<String>, source: url::ParseError) -> Self {
        Self::InvalidUrl { url: url.into(), source }
    }

    /// Creates a [`FetchError::Connection`] error without a source.
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection { message: message.into(), source: None }
    }

    /// Creates a [`FetchError::Timeout`] error.
    pub fn timeout(url: impl Into<String>) -> Self {
        Self::Timeout { url: url.into() }
    }

    /// Creates a [`FetchError::Status`] error.
    pub fn status(url: impl Into<String>, status: u16) -> Self {
        Self::Status { url: url.into(), status }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = FetchError::connection("connection refused");
        assert_eq!(err.to_string(), "connection error: connection refused");

        let err = FetchError::timeout("https://issuer.example.com/keys");
        assert_eq!(err.to_string(), "request to 'https://issuer.example.com/keys' timed out");

        let err = FetchError::status("https://issuer.example.com/keys", 503);
        assert_eq!(
            err.to_string(),
            "request to 'https://issuer.example.com/keys' returned status 503"
        );
    }

    #[test]
    fn test_invalid_url_preserves_source() {
        use std::error::Error;

        let parse_err = url::Url::parse("not a url").expect_err("should fail");
        let err = FetchError::invalid_url("not a url", parse_err);

        assert!(err.source().is_some(), "source chain must be preserved");
    }
}
