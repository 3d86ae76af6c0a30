//! In-memory [`HttpFetcher`] implementation for testing.
//!
//! [`MemoryFetcher`] serves canned responses keyed by URL and records
//! every request it receives, so tests can assert both on outcomes and
//! on the exact number and order of fetches the authentication pipeline
//! performed.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::{
    error::{FetchError, FetchResult},
    fetcher::HttpFetcher,
};

/// A canned reply for one URL.
#[derive(Clone, Debug)]
enum Canned {
    /// Success with the given body (may be empty).
    Body(String),
    /// Non-success HTTP status.
    Status(u16),
    /// Dispatch-level failure.
    Error(String),
}

/// In-memory fetcher with canned responses and a request log.
///
/// Unknown URLs fail with a connection error, so a test that forgets to
/// register a response fails loudly rather than hanging.
///
/// # Thread Safety
///
/// `MemoryFetcher` is `Send + Sync`; concurrent pipelines may share one
/// instance, and the request log preserves arrival order.
///
/// # Examples
///
/// ```
/// use apigw_fetch::{HttpFetcher, MemoryFetcher};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let fetcher = MemoryFetcher::new();
/// fetcher.respond("https://issuer.example.com/keys", r#"{"keys":[]}"#);
///
/// let body = fetcher.get("https://issuer.example.com/keys").await.unwrap();
/// assert_eq!(body, r#"{"keys":[]}"#);
/// assert_eq!(fetcher.requests(), vec!["https://issuer.example.com/keys"]);
/// # }
/// ```
#[derive(Debug, Default)]
pub struct MemoryFetcher {
    responses: Mutex<HashMap<String, Canned>>,
    requests: Mutex<Vec<String>>,
}

impl MemoryFetcher {
    /// Creates a fetcher with no canned responses.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a success response for a URL.
    ///
    /// The body may be empty; callers that treat empty bodies as protocol
    /// errors exercise that path this way.
    pub fn respond(&self, url: impl Into<String>, body: impl Into<String>) {
        self.responses.lock().insert(url.into(), Canned::Body(body.into()));
    }

    /// Registers a non-success HTTP status for a URL.
    pub fn respond_with_status(&self, url: impl Into<String>, status: u16) {
        self.responses.lock().insert(url.into(), Canned::Status(status));
    }

    /// Registers a dispatch-level failure for a URL.
    pub fn fail(&self, url: impl Into<String>, message: impl Into<String>) {
        self.responses.lock().insert(url.into(), Canned::Error(message.into()));
    }

    /// Returns every URL requested so far, in arrival order.
    #[must_use]
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().clone()
    }

    /// Returns the number of requests issued so far.
    #[must_use]
    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }

    /// Clears the request log, keeping the canned responses.
    pub fn clear_requests(&self) {
        self.requests.lock().clear();
    }
}

#[async_trait]
impl HttpFetcher for MemoryFetcher {
    async fn get(&self, url: &str) -> FetchResult<String> {
        self.requests.lock().push(url.to_owned());

        let canned = self.responses.lock().get(url).cloned();
        match canned {
            Some(Canned::Body(body)) => Ok(body),
            Some(Canned::Status(status)) => Err(FetchError::status(url, status)),
            Some(Canned::Error(message)) => Err(FetchError::connection(message)),
            None => Err(FetchError::connection(format!("no canned response for '{url}'"))),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_canned_body_returned() {
        let fetcher = MemoryFetcher::new();
        fetcher.respond("https://a.example.com", "hello");

        let body = fetcher.get("https://a.example.com").await.expect("should succeed");

        assert_eq!(body, "hello");
    }

    #[tokio::test]
    async fn test_canned_status_returned_as_error() {
        let fetcher = MemoryFetcher::new();
        fetcher.respond_with_status("https://a.example.com", 404);

        let result = fetcher.get("https://a.example.com").await;

        assert!(matches!(result, Err(FetchError::Status { status: 404, .. })));
    }

    #[tokio::test]
    async fn test_canned_failure_returned_as_error() {
        let fetcher = MemoryFetcher::new();
        fetcher.fail("https://a.example.com", "boom");

        let result = fetcher.get("https://a.example.com").await;

        assert!(matches!(result, Err(FetchError::Connection { .. })));
    }

    #[tokio::test]
    async fn test_unknown_url_fails() {
        let fetcher = MemoryFetcher::new();

        let result = fetcher.get("https://unregistered.example.com").await;

        assert!(matches!(result, Err(FetchError::Connection { .. })));
    }

    #[tokio::test]
    async fn test_request_log_preserves_order() {
        let fetcher = MemoryFetcher::new();
        fetcher.respond("https://a.example.com", "a");
        fetcher.respond("https://b.example.com", "b");

        let _ = fetcher.get("https://a.example.com").await;
        let _ = fetcher.get("https://b.example.com").await;
        let _ = fetcher.get("https://a.example.com").await;

        assert_eq!(
            fetcher.requests(),
            vec!["https://a.example.com", "https://b.example.com", "https://a.example.com"]
        );
        assert_eq!(fetcher.request_count(), 3);
    }

    #[tokio::test]
    async fn test_clear_requests_keeps_responses() {
        let fetcher = MemoryFetcher::new();
        fetcher.respond("https://a.example.com", "a");

        let _ = fetcher.get("https://a.example.com").await;
        fetcher.clear_requests();

        assert_eq!(fetcher.request_count(), 0);
        let body = fetcher.get("https://a.example.com").await.expect("response kept");
        assert_eq!(body, "a");
    }
}
