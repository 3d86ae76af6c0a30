//! The [`HttpFetcher`] trait and the reqwest-backed implementation.
//!
//! The trait deliberately exposes a single operation: an asynchronous GET
//! that resolves exactly once. Callers that need to distinguish "empty
//! body" from "no body" do so themselves — an `Ok` result means the server
//! answered with a success status, nothing more.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use url::Url;

use crate::error::{FetchError, FetchResult};

/// Default timeout applied to each GET request.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(5);

/// Asynchronous HTTP GET capability.
///
/// Implementations must resolve exactly once per call, either with the
/// response body of a success (2xx) response or with a [`FetchError`].
/// Non-success status codes are reported as [`FetchError::Status`], not
/// as `Ok` — the authentication core treats any error uniformly as a
/// fetch failure.
///
/// # Cancellation
///
/// Dropping the returned future cancels the underlying request. The
/// single-resolution contract still holds: a dropped future never
/// resolves at all, and the caller observes its own cancellation error.
#[async_trait]
pub trait HttpFetcher: Send + Sync {
    /// Performs a GET request and returns the response body.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid, the request cannot be
    /// dispatched, the configured timeout elapses, or the server responds
    /// with a non-success status.
    async fn get(&self, url: &str) -> FetchResult<String>;
}

/// Production [`HttpFetcher`] backed by [`reqwest::Client`].
///
/// A single instance owns one connection pool and is cheap to clone.
#[derive(Clone, Debug)]
pub struct ReqwestFetcher {
    client: reqwest::Client,
}

impl ReqwestFetcher {
    /// Creates a fetcher with the given per-request timeout.
    ///
    /// # Errors
    ///
    /// Returns a [`FetchError::Connection`] if the underlying HTTP client
    /// cannot be constructed (e.g. TLS backend initialization failure).
    pub fn new(timeout: Duration) -> FetchResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Connection {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Arc::new(e)),
            })?;
        Ok(Self { client })
    }

    /// Creates a fetcher from an existing [`reqwest::Client`].
    ///
    /// Use this when the host process already maintains a configured
    /// client (proxy settings, custom root certificates).
    #[must_use]
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpFetcher for ReqwestFetcher {
    async fn get(&self, url: &str) -> FetchResult<String> {
        let parsed = Url::parse(url).map_err(|e| FetchError::invalid_url(url, e))?;
        tracing::debug!(%parsed, "http fetch");

        let response = self.client.get(parsed).send().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::timeout(url)
            } else {
                FetchError::Connection { message: e.to_string(), source: Some(Arc::new(e)) }
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::status(url, status.as_u16()));
        }

        response.text().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::timeout(url)
            } else {
                FetchError::Connection { message: e.to_string(), source: Some(Arc::new(e)) }
            }
        })
    }
}
