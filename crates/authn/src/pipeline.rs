//! The per-request authentication state machine.
//!
//! One [`AuthPipeline`] is created per inbound request and driven to a
//! single [`Outcome`]. The steps, in execution order:
//!
//! ```text
//! extract token ──► token cache ──hit──► check policy ──► allow
//!                        │miss/expired
//!                        ▼
//!                   parse token ──► check policy
//!                                        │
//!                                        ▼
//!                                   key cache ──fresh──► verify ──► allow
//!                                        │miss/expired
//!                                        ▼
//!                              resolve key URL ──negative──► deny
//!                                │configured          │unknown
//!                                ▼                    ▼
//!                           fetch keys ◄── openid discovery
//!                                │
//!                                ▼
//!                             verify ──► cache token ──► allow
//! ```
//!
//! Every failure short-circuits to a denial with one of the stable
//! messages in [`AuthError`]; nothing is retried within a request. The
//! two fetches are the only suspension points, no lock is held across
//! them, and the key cache is re-read after resuming rather than
//! carrying a pre-fetch snapshot forward.

use chrono::Utc;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::{
    claims::{Claims, UserInfo},
    context::{Request, ServiceContext},
    error::{AuthError, AuthResult},
    policy::MethodPolicy,
    registry::KeyUrlSource,
    token_cache::TokenCacheEntry,
};

const AUTH_HEADER: &str = "authorization";
const ACCESS_TOKEN_QUERY: &str = "access_token";
const BEARER_PREFIX: &str = "Bearer ";

/// Final decision for one request.
#[derive(Debug)]
pub enum Outcome {
    /// The request may proceed.
    Allow,
    /// The request is rejected; the error's `Display` output is the
    /// client-visible message.
    Deny(AuthError),
}

impl Outcome {
    /// Whether the request was allowed.
    #[must_use]
    pub fn is_allow(&self) -> bool {
        matches!(self, Outcome::Allow)
    }

    /// The denial reason, if the request was denied.
    #[must_use]
    pub fn deny_reason(&self) -> Option<&AuthError> {
        match self {
            Outcome::Allow => None,
            Outcome::Deny(error) => Some(error),
        }
    }
}

/// Checks authentication for one request against one target method.
///
/// Convenience entry point that constructs and drives an
/// [`AuthPipeline`].
pub async fn check_auth<R, M>(ctx: &ServiceContext, request: &mut R, method: &M) -> Outcome
where
    R: Request,
    M: MethodPolicy,
{
    AuthPipeline::new(ctx, request, method).check().await
}

/// Shape of the OpenID discovery document; only `jwks_uri` matters here.
#[derive(Debug, Deserialize)]
struct DiscoveryDocument {
    #[serde(default)]
    jwks_uri: Option<String>,
}

/// The per-request authentication state machine.
///
/// Holds references into the request, the shared service context, and
/// its own transient parsing state. Single-threaded per request;
/// parallelism happens across pipelines, which share only the caches
/// and the registry.
pub struct AuthPipeline<'a, R, M> {
    ctx: &'a ServiceContext,
    request: &'a mut R,
    method: &'a M,
    token: String,
    user_info: Option<UserInfo>,
    claims: Option<Claims>,
}

impl<'a, R, M> AuthPipeline<'a, R, M>
where
    R: Request,
    M: MethodPolicy,
{
    /// Creates a pipeline for one request.
    pub fn new(ctx: &'a ServiceContext, request: &'a mut R, method: &'a M) -> Self {
        Self { ctx, request, method, token: String::new(), user_info: None, claims: None }
    }

    /// Drives the state machine to completion.
    ///
    /// Resolves exactly once. A denial carries one of the stable
    /// client-visible messages; diagnostic detail goes to the log only.
    pub async fn check(mut self) -> Outcome {
        match self.run().await {
            Ok(()) => Outcome::Allow,
            Err(error) => {
                debug!(error = ?error, cause = ?error.cause(), "authentication denied");
                Outcome::Deny(error)
            },
        }
    }

    async fn run(&mut self) -> AuthResult<()> {
        if !self.ctx.auth_enabled() || !self.method.requires_auth() {
            debug!("auth not required");
            return Ok(());
        }

        self.token = self.extract_token();
        if self.token.is_empty() {
            return Err(AuthError::MissingCredentials);
        }
        self.request.set_auth_token(&self.token);

        let cache_hit = self.lookup_token_cache().await;
        if !cache_hit {
            self.parse_token()?;
        }
        self.check_policy()?;
        if !cache_hit {
            self.init_key().await?;
        }
        self.pass_user_info()
    }

    /// Pulls the bearer token off the request.
    ///
    /// The `Authorization` header wins when present: it must begin with
    /// exactly `"Bearer "` and carry a non-empty remainder, otherwise
    /// the token is empty — a malformed header never falls back to the
    /// query. Only when the header is absent is the `access_token`
    /// query parameter consulted.
    fn extract_token(&self) -> String {
        match self.request.find_header(AUTH_HEADER) {
            Some(header) => match header.strip_prefix(BEARER_PREFIX) {
                Some(token) if !token.is_empty() => token.to_owned(),
                _ => String::new(),
            },
            None => self.request.find_query(ACCESS_TOKEN_QUERY).unwrap_or_default(),
        }
    }

    /// Returns true on a fresh cache hit, populating the user info.
    /// An expired entry is evicted and treated as a miss.
    async fn lookup_token_cache(&mut self) -> bool {
        let Some(entry) = self.ctx.token_cache().lookup(&self.token).await else {
            return false;
        };
        if entry.is_expired(Utc::now()) {
            self.ctx.token_cache().remove(&self.token).await;
            return false;
        }
        self.user_info = Some(entry.user_info);
        true
    }

    fn parse_token(&mut self) -> AuthResult<()> {
        let claims = self.ctx.validator().parse(&self.token)?;
        self.user_info = Some(claims.user_info());
        self.claims = Some(claims);
        Ok(())
    }

    /// Issuer first, audience second; the issuer failure message takes
    /// precedence when both would fail.
    fn check_policy(&self) -> AuthResult<()> {
        let info = self.user_info()?;

        if !self.method.issuer_allowed(&info.issuer) {
            return Err(AuthError::IssuerNotAllowed);
        }

        // An audience equal to the gateway's own service name is always
        // acceptable; anything else needs the method's explicit say-so.
        if !info.audiences.contains(self.ctx.service_name())
            && !self.method.audiences_allowed(&info.issuer, &info.audiences)
        {
            return Err(AuthError::AudienceNotAllowed);
        }
        Ok(())
    }

    /// Ensures a usable key set exists for the issuer, fetching (and
    /// possibly discovering) as needed, then verifies.
    async fn init_key(&mut self) -> AuthResult<()> {
        let issuer = self.user_info()?.issuer.clone();

        if let Some(entry) = self.ctx.key_cache().get(&issuer)
            && !entry.is_expired(Utc::now())
        {
            return self.verify_signature().await;
        }

        let resolved = self.ctx.issuer_registry().resolve_key_url(&issuer);
        if resolved.url.is_empty() {
            // Negative discovery entry: a previous attempt already
            // failed, so no further round-trips for this issuer.
            return Err(AuthError::KeyUriUnknown);
        }

        match resolved.source {
            KeyUrlSource::Unknown => self.discover_jwks_uri(&issuer, &resolved.url).await,
            KeyUrlSource::Configured | KeyUrlSource::Discovered => {
                self.fetch_keys(&issuer, &resolved.url).await
            },
        }
    }

    /// Fetches the discovery document and extracts `jwks_uri`.
    ///
    /// Any failure — fetch error, malformed body, absent or empty
    /// `jwks_uri` — records the negative outcome so subsequent requests
    /// for this issuer deny without another round-trip.
    async fn discover_jwks_uri(&mut self, issuer: &str, url: &str) -> AuthResult<()> {
        debug!(url, "openid discovery fetch");
        let body = match self.ctx.fetcher().get(url).await {
            Ok(body) => body,
            Err(error) => {
                warn!(issuer, %error, "openid discovery fetch failed");
                self.ctx.issuer_registry().record_discovered(issuer, "");
                return Err(AuthError::DiscoveryFailed);
            },
        };

        let jwks_uri = match serde_json::from_str::<DiscoveryDocument>(&body) {
            Ok(DiscoveryDocument { jwks_uri: Some(uri) }) if !uri.is_empty() => uri,
            _ => {
                warn!(issuer, "openid discovery returned an invalid document");
                self.ctx.issuer_registry().record_discovered(issuer, "");
                return Err(AuthError::DiscoveryFailed);
            },
        };

        self.ctx.issuer_registry().record_discovered(issuer, &jwks_uri);
        self.fetch_keys(issuer, &jwks_uri).await
    }

    /// Fetches the key set, caches it, then verifies.
    ///
    /// Unlike discovery failures, a failed key fetch is not recorded
    /// anywhere: the next request is free to retry it.
    async fn fetch_keys(&mut self, issuer: &str, url: &str) -> AuthResult<()> {
        debug!(url, "verification key fetch");
        let body = match self.ctx.fetcher().get(url).await {
            Ok(body) => body,
            Err(error) => {
                warn!(issuer, %error, "verification key fetch failed");
                return Err(AuthError::KeyFetchFailed);
            },
        };
        if body.is_empty() {
            warn!(issuer, "verification key fetch returned an empty body");
            return Err(AuthError::KeyFetchFailed);
        }

        self.ctx.key_cache().update(issuer, &body, Utc::now() + self.ctx.key_ttl());
        self.verify_signature().await
    }

    /// Verifies the signature against the cached key set and, on
    /// success, records the validated token.
    ///
    /// The key cache is re-read here rather than reusing any pre-fetch
    /// snapshot; the token cache is written only after the signature
    /// checks out, so cached identities are always tied to a key that
    /// was trusted at the time.
    async fn verify_signature(&mut self) -> AuthResult<()> {
        let issuer = self.user_info()?.issuer.clone();
        let Some(entry) = self.ctx.key_cache().get(&issuer) else {
            return Err(AuthError::MissingVerificationKey);
        };

        self.ctx.validator().verify(&self.token, &entry.keys)?;

        let claims = self.claims.as_ref().ok_or(AuthError::Internal)?;
        let cache_entry = TokenCacheEntry {
            user_info: claims.user_info(),
            token_expiry: claims.expiry,
            inserted_at: Utc::now(),
        };
        self.ctx.token_cache().insert(&self.token, cache_entry).await;
        Ok(())
    }

    fn pass_user_info(&mut self) -> AuthResult<()> {
        let info = self.user_info()?.clone();
        self.request.set_user_info(info);
        Ok(())
    }

    fn user_info(&self) -> AuthResult<&UserInfo> {
        self.user_info.as_ref().ok_or(AuthError::Internal)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use std::{collections::HashMap, sync::Arc};

    use apigw_fetch::MemoryFetcher;

    use super::*;
    use crate::{config::AuthConfig, policy::MethodAuthPolicy};

    #[derive(Default)]
    struct StubRequest {
        headers: HashMap<String, String>,
        query: HashMap<String, String>,
        auth_token: Option<String>,
        user_info: Option<UserInfo>,
    }

    impl Request for StubRequest {
        fn find_header(&self, name: &str) -> Option<String> {
            self.headers.get(name).cloned()
        }

        fn find_query(&self, name: &str) -> Option<String> {
            self.query.get(name).cloned()
        }

        fn set_auth_token(&mut self, token: &str) {
            self.auth_token = Some(token.to_owned());
        }

        fn set_user_info(&mut self, user_info: UserInfo) {
            self.user_info = Some(user_info);
        }
    }

    fn ctx() -> ServiceContext {
        let config = AuthConfig::builder().service_name("svc").build().expect("valid config");
        ServiceContext::builder().config(config).fetcher(Arc::new(MemoryFetcher::new())).build()
    }

    fn extract(ctx: &ServiceContext, request: &StubRequest) -> String {
        let method = MethodAuthPolicy::new();
        let mut request = StubRequest {
            headers: request.headers.clone(),
            query: request.query.clone(),
            ..StubRequest::default()
        };
        AuthPipeline::new(ctx, &mut request, &method).extract_token()
    }

    #[test]
    fn test_extract_bearer_header() {
        let ctx = ctx();
        let mut request = StubRequest::default();
        request.headers.insert("authorization".into(), "Bearer the-token".into());

        assert_eq!(extract(&ctx, &request), "the-token");
    }

    #[test]
    fn test_extract_bearer_prefix_alone_is_empty() {
        let ctx = ctx();
        let mut request = StubRequest::default();
        request.headers.insert("authorization".into(), "Bearer ".into());

        assert_eq!(extract(&ctx, &request), "");
    }

    #[test]
    fn test_extract_is_case_sensitive() {
        let ctx = ctx();
        let mut request = StubRequest::default();
        request.headers.insert("authorization".into(), "bearer the-token".into());

        assert_eq!(extract(&ctx, &request), "");
    }

    #[test]
    fn test_extract_query_fallback_only_without_header() {
        let ctx = ctx();
        let mut request = StubRequest::default();
        request.query.insert("access_token".into(), "query-token".into());

        assert_eq!(extract(&ctx, &request), "query-token");

        // A malformed header suppresses the query fallback.
        request.headers.insert("authorization".into(), "Basic abc".into());
        assert_eq!(extract(&ctx, &request), "");
    }

    #[tokio::test]
    async fn test_open_method_allows_without_credentials() {
        let ctx = ctx();
        let mut request = StubRequest::default();
        let method = MethodAuthPolicy::open();

        let outcome = check_auth(&ctx, &mut request, &method).await;

        assert!(outcome.is_allow());
        assert!(request.auth_token.is_none(), "no token should have been extracted");
        assert!(request.user_info.is_none(), "no identity is established without auth");
    }

    #[tokio::test]
    async fn test_missing_credentials_denied() {
        let ctx = ctx();
        let mut request = StubRequest::default();
        let method = MethodAuthPolicy::new().allow_issuer("https://issuer1.com");

        let outcome = check_auth(&ctx, &mut request, &method).await;

        let reason = outcome.deny_reason().expect("should be denied");
        assert_eq!(reason.to_string(), "JWT validation failed: Missing or invalid credentials");
    }

    #[tokio::test]
    async fn test_auth_disabled_service_allows_everything() {
        let config = AuthConfig::builder()
            .service_name("svc")
            .auth_enabled(false)
            .build()
            .expect("valid config");
        let ctx = ServiceContext::builder()
            .config(config)
            .fetcher(Arc::new(MemoryFetcher::new()))
            .build();
        let mut request = StubRequest::default();
        let method = MethodAuthPolicy::new().allow_issuer("https://issuer1.com");

        let outcome = check_auth(&ctx, &mut request, &method).await;

        assert!(outcome.is_allow());
    }
}
