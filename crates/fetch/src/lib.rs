//! # apigw-fetch
//!
//! Outbound HTTP fetch abstraction used by the apigw authentication core.
//!
//! The authentication pipeline needs exactly one network capability: an
//! asynchronous HTTP GET that resolves once with either a response body or
//! a failure. This crate provides that capability behind the [`HttpFetcher`]
//! trait so the core stays independent of any particular HTTP client.
//!
//! # Implementations
//!
//! - [`ReqwestFetcher`] — production implementation backed by a
//!   [`reqwest::Client`] with a configurable request timeout.
//! - [`MemoryFetcher`] — in-memory implementation for tests: canned
//!   responses per URL plus a log of every request issued, so tests can
//!   assert on fetch counts and targets.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//!
//! use apigw_fetch::{HttpFetcher, ReqwestFetcher};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let fetcher = ReqwestFetcher::new(Duration::from_secs(5))?;
//! let body = fetcher.get("https://issuer.example.com/keys").await?;
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

/// Fetch error types.
pub mod error;
/// The [`HttpFetcher`] trait and the reqwest-backed implementation.
pub mod fetcher;
/// In-memory fetcher for tests.
pub mod memory;

pub use error::{FetchError, FetchResult};
pub use fetcher::{DEFAULT_FETCH_TIMEOUT, HttpFetcher, ReqwestFetcher};
pub use memory::MemoryFetcher;
