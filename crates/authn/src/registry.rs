//! Issuer registry: where to find an issuer's verification keys.
//!
//! Each issuer maps to either a directly configured key-set URL or a
//! discovery URL derived by OpenID convention. Discovery outcomes —
//! including failures — are recorded back into the registry so that
//! subsequent requests neither repeat a successful discovery round-trip
//! nor hammer an issuer whose discovery endpoint is broken.
//!
//! A recorded empty URL is the negative entry: "discovery was attempted
//! and the key URL cannot be determined". It is sticky until the issuer
//! is reconfigured out-of-band via [`IssuerRegistry::reset`].

use std::collections::HashMap;

use parking_lot::RwLock;

/// Path suffix appended to an issuer to derive its discovery URL.
pub const DISCOVERY_SUFFIX: &str = "/.well-known/openid-configuration";

/// Where a resolved key URL came from.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum KeyUrlSource {
    /// The URL was configured directly; discovery must not occur.
    Configured,
    /// The URL was learned (or learned to be unavailable) via discovery.
    Discovered,
    /// Nothing is known; the returned URL is the derived discovery URL.
    Unknown,
}

/// A resolved key URL together with its provenance.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedKeyUrl {
    /// The URL to fetch. Empty means "known to be unavailable"
    /// (negative discovery outcome).
    pub url: String,
    /// Provenance of the URL.
    pub source: KeyUrlSource,
}

#[derive(Clone, Debug)]
struct IssuerEntry {
    key_url: String,
    source: KeyUrlSource,
}

/// Maps issuers to key-set URLs.
///
/// Configured at service initialisation, then mutated only by discovery
/// outcomes. Shared read-mostly across all pipelines.
#[derive(Debug, Default)]
pub struct IssuerRegistry {
    entries: RwLock<HashMap<String, IssuerEntry>>,
}

impl IssuerRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an issuer with a directly configured key-set URL.
    ///
    /// Resolution for this issuer will never trigger discovery.
    #[tracing::instrument(skip(self))]
    pub fn register_configured(&self, issuer: &str, key_url: &str) {
        self.entries.write().insert(
            issuer.to_owned(),
            IssuerEntry { key_url: key_url.to_owned(), source: KeyUrlSource::Configured },
        );
    }

    /// Records the outcome of a discovery attempt for an issuer.
    ///
    /// An empty `key_url` records the negative outcome; resolution will
    /// then return the empty URL rather than deriving a discovery URL
    /// again.
    #[tracing::instrument(skip(self))]
    pub fn record_discovered(&self, issuer: &str, key_url: &str) {
        self.entries.write().insert(
            issuer.to_owned(),
            IssuerEntry { key_url: key_url.to_owned(), source: KeyUrlSource::Discovered },
        );
    }

    /// Resolves the key URL for an issuer.
    ///
    /// Unregistered issuers (and registered issuers with no recorded
    /// URL yet) resolve to their derived discovery URL with source
    /// [`KeyUrlSource::Unknown`]. Recorded discovery outcomes are
    /// returned verbatim, including the empty negative URL.
    #[must_use]
    pub fn resolve_key_url(&self, issuer: &str) -> ResolvedKeyUrl {
        let entries = self.entries.read();
        match entries.get(issuer) {
            Some(entry) => ResolvedKeyUrl { url: entry.key_url.clone(), source: entry.source },
            None => ResolvedKeyUrl { url: discovery_url(issuer), source: KeyUrlSource::Unknown },
        }
    }

    /// Forgets everything recorded for an issuer.
    ///
    /// This is the out-of-band reconfiguration hook that un-sticks a
    /// negative discovery entry.
    #[tracing::instrument(skip(self))]
    pub fn reset(&self, issuer: &str) {
        self.entries.write().remove(issuer);
    }
}

/// Derives the OpenID discovery URL for an issuer.
#[must_use]
pub fn discovery_url(issuer: &str) -> String {
    format!("{}{DISCOVERY_SUFFIX}", issuer.trim_end_matches('/'))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn test_unregistered_issuer_derives_discovery_url() {
        let registry = IssuerRegistry::new();

        let resolved = registry.resolve_key_url("https://issuer1.com");

        assert_eq!(resolved.url, "https://issuer1.com/.well-known/openid-configuration");
        assert_eq!(resolved.source, KeyUrlSource::Unknown);
    }

    #[test]
    fn test_discovery_url_trims_trailing_slash() {
        assert_eq!(
            discovery_url("https://issuer1.com/"),
            "https://issuer1.com/.well-known/openid-configuration"
        );
    }

    #[test]
    fn test_configured_issuer_returns_url_verbatim() {
        let registry = IssuerRegistry::new();
        registry.register_configured("https://issuer2.com", "https://issuer2.com/pubkey");

        let resolved = registry.resolve_key_url("https://issuer2.com");

        assert_eq!(resolved.url, "https://issuer2.com/pubkey");
        assert_eq!(resolved.source, KeyUrlSource::Configured);
    }

    #[test]
    fn test_discovered_url_returned_verbatim() {
        let registry = IssuerRegistry::new();
        registry.record_discovered("https://issuer1.com", "https://issuer1.com/pubkey");

        let resolved = registry.resolve_key_url("https://issuer1.com");

        assert_eq!(resolved.url, "https://issuer1.com/pubkey");
        assert_eq!(resolved.source, KeyUrlSource::Discovered);
    }

    #[test]
    fn test_negative_discovery_is_sticky() {
        let registry = IssuerRegistry::new();
        registry.record_discovered("http://openid_fail", "");

        let resolved = registry.resolve_key_url("http://openid_fail");

        assert!(resolved.url.is_empty(), "negative entry must resolve to the empty URL");
        assert_eq!(resolved.source, KeyUrlSource::Discovered);
    }

    #[test]
    fn test_reset_unsticks_negative_entry() {
        let registry = IssuerRegistry::new();
        registry.record_discovered("http://openid_fail", "");

        registry.reset("http://openid_fail");

        let resolved = registry.resolve_key_url("http://openid_fail");
        assert_eq!(resolved.source, KeyUrlSource::Unknown);
        assert!(!resolved.url.is_empty());
    }

    #[test]
    fn test_discovery_outcome_overwrites_previous() {
        let registry = IssuerRegistry::new();
        registry.record_discovered("https://issuer1.com", "");
        registry.record_discovered("https://issuer1.com", "https://issuer1.com/pubkey");

        let resolved = registry.resolve_key_url("https://issuer1.com");
        assert_eq!(resolved.url, "https://issuer1.com/pubkey");
    }
}
