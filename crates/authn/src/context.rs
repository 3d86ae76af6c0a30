//! Request abstraction and shared service context.
//!
//! [`Request`] is the narrow view of an inbound request the pipeline
//! needs: two read accessors and two write hooks. [`ServiceContext`]
//! bundles the process-wide collaborators — caches, registry, fetcher,
//! validator — constructed once at service initialisation and shared by
//! every pipeline.

use std::{sync::Arc, time::Duration};

use apigw_fetch::HttpFetcher;

use crate::{
    claims::UserInfo,
    config::AuthConfig,
    key_cache::KeyCache,
    registry::IssuerRegistry,
    token_cache::TokenCache,
    validator::{JwtValidator, TokenValidator},
};

/// The pipeline's view of an inbound request.
///
/// Implemented by the host's request type. The two setters are
/// side-effect hooks: the extracted token is attached before validation
/// (for downstream logging), the user info only on Allow.
pub trait Request {
    /// Returns the value of the named header, if present.
    fn find_header(&self, name: &str) -> Option<String>;

    /// Returns the value of the named query parameter, if present.
    fn find_query(&self, name: &str) -> Option<String>;

    /// Attaches the extracted bearer token to the request.
    fn set_auth_token(&mut self, token: &str);

    /// Attaches the authenticated caller identity to the request.
    fn set_user_info(&mut self, user_info: UserInfo);
}

/// Process-wide authentication state shared by all pipelines.
///
/// Owns the two caches and the issuer registry; holds the fetcher and
/// validator behind trait objects so deployments can substitute either.
pub struct ServiceContext {
    service_name: String,
    auth_enabled: bool,
    key_ttl: Duration,
    token_cache: TokenCache,
    key_cache: KeyCache,
    registry: IssuerRegistry,
    fetcher: Arc<dyn HttpFetcher>,
    validator: Arc<dyn TokenValidator>,
}

#[bon::bon]
impl ServiceContext {
    /// Creates the context from a validated configuration.
    ///
    /// Issuers with a configured `jwks_uri` are registered in the
    /// registry; the rest resolve through discovery on first use. The
    /// validator defaults to [`JwtValidator`].
    #[builder]
    pub fn new(
        config: AuthConfig,
        fetcher: Arc<dyn HttpFetcher>,
        validator: Option<Arc<dyn TokenValidator>>,
    ) -> Self {
        let registry = IssuerRegistry::new();
        for provider in &config.providers {
            if let Some(jwks_uri) = &provider.jwks_uri {
                registry.register_configured(&provider.issuer, jwks_uri);
            }
        }

        Self {
            service_name: config.service_name,
            auth_enabled: config.auth_enabled,
            key_ttl: config.key_ttl,
            token_cache: TokenCache::new(config.token_cache_capacity),
            key_cache: KeyCache::new(),
            registry,
            fetcher,
            validator: validator.unwrap_or_else(|| Arc::new(JwtValidator::new())),
        }
    }

    /// The gateway's own service name.
    #[must_use]
    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    /// Whether authentication is enabled at all for this service.
    #[must_use]
    pub fn auth_enabled(&self) -> bool {
        self.auth_enabled
    }

    /// Lifetime applied to fetched key sets.
    #[must_use]
    pub fn key_ttl(&self) -> Duration {
        self.key_ttl
    }

    /// The validated-token cache.
    #[must_use]
    pub fn token_cache(&self) -> &TokenCache {
        &self.token_cache
    }

    /// The issuer key-set cache.
    #[must_use]
    pub fn key_cache(&self) -> &KeyCache {
        &self.key_cache
    }

    /// The issuer registry.
    #[must_use]
    pub fn issuer_registry(&self) -> &IssuerRegistry {
        &self.registry
    }

    /// The outbound HTTP fetcher.
    #[must_use]
    pub fn fetcher(&self) -> &dyn HttpFetcher {
        self.fetcher.as_ref()
    }

    /// The token validator.
    #[must_use]
    pub fn validator(&self) -> &dyn TokenValidator {
        self.validator.as_ref()
    }
}
