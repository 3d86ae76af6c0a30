//! # apigw-authn
//!
//! Per-request authentication core for the apigw gateway.
//!
//! Decides whether an inbound request carries a valid bearer credential
//! (a signed JWT), who the caller is, and whether the caller may invoke
//! the target method. The decision runs as a staged pipeline combining
//! token extraction, a two-tier cache, signature verification against
//! issuer-published key sets, and OpenID discovery to locate those keys.
//!
//! # Architecture
//!
//! ```text
//! request ──► AuthPipeline ──► Outcome (Allow / Deny)
//!                 │
//!                 ├── TokenCache      validated token → UserInfo
//!                 ├── TokenValidator  parse + verify (jsonwebtoken)
//!                 ├── MethodPolicy    issuer / audience acceptance
//!                 ├── KeyCache        issuer → key-set document (TTL)
//!                 ├── IssuerRegistry  issuer → key URL (+ negative entries)
//!                 └── HttpFetcher     discovery + key fetches (apigw-fetch)
//! ```
//!
//! The warm path — a token seen before, or a second token from an
//! already-known issuer — performs zero network I/O. Discovery failures
//! are cached negatively per issuer so a broken discovery endpoint is
//! hit at most once.
//!
//! # Example
//!
//! ```no_run
//! use std::{sync::Arc, time::Duration};
//!
//! use apigw_authn::{
//!     config::{AuthConfig, ProviderConfig},
//!     context::ServiceContext,
//!     pipeline::check_auth,
//!     policy::MethodAuthPolicy,
//! };
//! use apigw_fetch::ReqwestFetcher;
//!
//! # async fn example<R: apigw_authn::context::Request>(
//! #     request: &mut R,
//! # ) -> Result<(), Box<dyn std::error::Error>> {
//! let config = AuthConfig::builder()
//!     .service_name("bookstore.example.com")
//!     .providers(vec![ProviderConfig::new("https://issuer1.com")])
//!     .build()?;
//! let fetcher = Arc::new(ReqwestFetcher::new(Duration::from_secs(5))?);
//! let ctx = ServiceContext::builder().config(config).fetcher(fetcher).build();
//!
//! let method = MethodAuthPolicy::new().allow_issuer("https://issuer1.com");
//! let outcome = check_auth(&ctx, request, &method).await;
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

/// Token claims and the user-info projection.
pub mod claims;
/// Authentication configuration.
pub mod config;
/// Request abstraction and shared service context.
pub mod context;
/// Authentication error types.
pub mod error;
/// Per-issuer cache of verification key sets.
pub mod key_cache;
/// The per-request authentication state machine.
pub mod pipeline;
/// Per-method authentication policy.
pub mod policy;
/// Issuer registry.
pub mod registry;
/// Test helpers (feature `testutil`).
#[cfg(feature = "testutil")]
pub mod testutil;
/// Cache of already-validated tokens.
pub mod token_cache;
/// Token parsing and signature verification.
pub mod validator;

pub use claims::{Claims, UserInfo};
pub use config::{AuthConfig, ProviderConfig};
pub use context::{Request, ServiceContext};
pub use error::{AuthError, AuthResult, ConfigError, ErrorCause, ValidationError};
pub use key_cache::{DEFAULT_KEY_TTL, KeyCache, KeySetEntry};
pub use pipeline::{AuthPipeline, Outcome, check_auth};
pub use policy::{MethodAuthPolicy, MethodPolicy};
pub use registry::{IssuerRegistry, KeyUrlSource, ResolvedKeyUrl};
pub use token_cache::{DEFAULT_TOKEN_CACHE_CAPACITY, TokenCache, TokenCacheEntry};
pub use validator::{
    ACCEPTED_ALGORITHMS, FORBIDDEN_ALGORITHMS, JwtValidator, TokenValidator, validate_algorithm,
};
