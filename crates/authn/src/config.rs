//! Authentication configuration.
//!
//! [`AuthConfig`] captures everything the core needs to know at service
//! initialisation: the gateway's own service name (matched against token
//! audiences), the set of known issuers, and cache sizing. Parsing of
//! service descriptors into this form is the host's concern.

use std::time::Duration;

use crate::{
    error::ConfigError,
    key_cache::DEFAULT_KEY_TTL,
    token_cache::DEFAULT_TOKEN_CACHE_CAPACITY,
};

/// One known issuer.
///
/// An issuer with a configured `jwks_uri` is fetched from that URL
/// directly; without one, the key URL is learned via OpenID discovery
/// on first use.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProviderConfig {
    /// The issuer, as it appears in token `iss` claims.
    pub issuer: String,
    /// Directly configured key-set URL, if any.
    pub jwks_uri: Option<String>,
}

impl ProviderConfig {
    /// Creates a provider whose key URL is learned via discovery.
    #[must_use]
    pub fn new(issuer: impl Into<String>) -> Self {
        Self { issuer: issuer.into(), jwks_uri: None }
    }

    /// Sets a directly configured key-set URL, disabling discovery.
    #[must_use]
    pub fn with_jwks_uri(mut self, jwks_uri: impl Into<String>) -> Self {
        self.jwks_uri = Some(jwks_uri.into());
        self
    }
}

/// Authentication core configuration.
///
/// # Examples
///
/// ```
/// use apigw_authn::config::{AuthConfig, ProviderConfig};
///
/// let config = AuthConfig::builder()
///     .service_name("endpoints-test.cloudendpointsapis.com")
///     .providers(vec![
///         ProviderConfig::new("https://issuer1.com"),
///         ProviderConfig::new("https://issuer2.com")
///             .with_jwks_uri("https://issuer2.com/pubkey"),
///     ])
///     .build()
///     .unwrap();
///
/// assert!(config.auth_enabled);
/// ```
#[derive(Clone, Debug)]
pub struct AuthConfig {
    /// The gateway's own service name; a token audience equal to this
    /// is always acceptable.
    pub service_name: String,
    /// Master switch; when false, every request is allowed without a
    /// credential check.
    pub auth_enabled: bool,
    /// Known issuers.
    pub providers: Vec<ProviderConfig>,
    /// Maximum number of validated tokens cached.
    pub token_cache_capacity: u64,
    /// Lifetime of fetched key sets.
    pub key_ttl: Duration,
}

#[bon::bon]
impl AuthConfig {
    /// Creates a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] naming the offending field if the
    /// service name or any provider issuer is empty, a configured
    /// `jwks_uri` is empty, or a sizing value is zero.
    #[builder]
    pub fn new(
        #[builder(into)] service_name: String,
        #[builder(default = true)] auth_enabled: bool,
        #[builder(default)] providers: Vec<ProviderConfig>,
        #[builder(default = DEFAULT_TOKEN_CACHE_CAPACITY)] token_cache_capacity: u64,
        #[builder(default = DEFAULT_KEY_TTL)] key_ttl: Duration,
    ) -> Result<Self, ConfigError> {
        if service_name.is_empty() {
            return Err(ConfigError::MustNotBeEmpty { field: "service_name" });
        }
        if token_cache_capacity == 0 {
            return Err(ConfigError::MustBePositive {
                field: "token_cache_capacity",
                value: "0".into(),
            });
        }
        if key_ttl.is_zero() {
            return Err(ConfigError::MustBePositive { field: "key_ttl", value: "0s".into() });
        }
        for provider in &providers {
            if provider.issuer.is_empty() {
                return Err(ConfigError::MustNotBeEmpty { field: "provider.issuer" });
            }
            if provider.jwks_uri.as_deref() == Some("") {
                return Err(ConfigError::MustNotBeEmpty { field: "provider.jwks_uri" });
            }
        }

        Ok(Self { service_name, auth_enabled, providers, token_cache_capacity, key_ttl })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AuthConfig::builder()
            .service_name("svc".to_owned())
            .build()
            .expect("valid config");

        assert!(config.auth_enabled);
        assert!(config.providers.is_empty());
        assert_eq!(config.token_cache_capacity, DEFAULT_TOKEN_CACHE_CAPACITY);
        assert_eq!(config.key_ttl, DEFAULT_KEY_TTL);
    }

    #[test]
    fn test_empty_service_name_rejected() {
        let result = AuthConfig::builder().service_name(String::new()).build();

        assert!(
            matches!(result, Err(ConfigError::MustNotBeEmpty { field }) if field == "service_name")
        );
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let result =
            AuthConfig::builder().service_name("svc".to_owned()).token_cache_capacity(0).build();

        assert!(matches!(result, Err(ConfigError::MustBePositive { .. })));
    }

    #[test]
    fn test_zero_key_ttl_rejected() {
        let result = AuthConfig::builder()
            .service_name("svc".to_owned())
            .key_ttl(Duration::ZERO)
            .build();

        assert!(
            matches!(result, Err(ConfigError::MustBePositive { field, .. }) if field == "key_ttl")
        );
    }

    #[test]
    fn test_empty_provider_issuer_rejected() {
        let result = AuthConfig::builder()
            .service_name("svc".to_owned())
            .providers(vec![ProviderConfig::new("")])
            .build();

        assert!(
            matches!(result, Err(ConfigError::MustNotBeEmpty { field }) if field == "provider.issuer")
        );
    }

    #[test]
    fn test_empty_jwks_uri_rejected() {
        let result = AuthConfig::builder()
            .service_name("svc".to_owned())
            .providers(vec![ProviderConfig::new("https://issuer1.com").with_jwks_uri("")])
            .build();

        assert!(
            matches!(result, Err(ConfigError::MustNotBeEmpty { field }) if field == "provider.jwks_uri")
        );
    }
}
