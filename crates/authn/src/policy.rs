//! Per-method authentication policy.
//!
//! The pipeline asks three questions of the target method: does it
//! require authentication at all, does it accept this issuer, and does
//! it accept this audience set. [`MethodPolicy`] is the seam; hosts with
//! their own method descriptors implement it directly, and
//! [`MethodAuthPolicy`] is the config-driven implementation used when no
//! such descriptor exists.

use std::collections::{BTreeSet, HashMap};

/// Authentication policy surface of a target method.
pub trait MethodPolicy {
    /// Whether calls to this method must carry a valid credential.
    fn requires_auth(&self) -> bool;

    /// Whether tokens from `issuer` are accepted at all.
    fn issuer_allowed(&self, issuer: &str) -> bool;

    /// Whether `audiences` satisfies the method's audience policy for
    /// `issuer`, beyond the service-name match the pipeline performs
    /// itself.
    fn audiences_allowed(&self, issuer: &str, audiences: &BTreeSet<String>) -> bool;
}

/// Config-driven [`MethodPolicy`].
///
/// Each allowed issuer optionally carries an explicit audience
/// allow-list. A token's audiences satisfy the policy when they
/// intersect that list.
///
/// # Examples
///
/// ```
/// use apigw_authn::policy::{MethodAuthPolicy, MethodPolicy};
///
/// let method = MethodAuthPolicy::new()
///     .allow_issuer("https://issuer1.com")
///     .allow_audiences("https://issuer2.com", ["aud-a", "aud-b"]);
///
/// assert!(method.requires_auth());
/// assert!(method.issuer_allowed("https://issuer1.com"));
/// assert!(!method.issuer_allowed("https://unknown.com"));
/// ```
#[derive(Clone, Debug, Default)]
pub struct MethodAuthPolicy {
    requires_auth: bool,
    providers: HashMap<String, BTreeSet<String>>,
}

impl MethodAuthPolicy {
    /// Creates a policy that requires authentication and accepts no
    /// issuer yet.
    #[must_use]
    pub fn new() -> Self {
        Self { requires_auth: true, providers: HashMap::new() }
    }

    /// Creates a policy for a method that does not require
    /// authentication.
    #[must_use]
    pub fn open() -> Self {
        Self { requires_auth: false, providers: HashMap::new() }
    }

    /// Allows tokens from `issuer` with no explicit audience list.
    ///
    /// Such tokens are accepted only when one of their audiences equals
    /// the gateway's service name.
    #[must_use]
    pub fn allow_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.providers.entry(issuer.into()).or_default();
        self
    }

    /// Allows tokens from `issuer` whose audiences intersect `audiences`.
    #[must_use]
    pub fn allow_audiences<I, A>(mut self, issuer: impl Into<String>, audiences: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<String>,
    {
        self.providers
            .entry(issuer.into())
            .or_default()
            .extend(audiences.into_iter().map(Into::into));
        self
    }
}

impl MethodPolicy for MethodAuthPolicy {
    fn requires_auth(&self) -> bool {
        self.requires_auth
    }

    fn issuer_allowed(&self, issuer: &str) -> bool {
        self.providers.contains_key(issuer)
    }

    fn audiences_allowed(&self, issuer: &str, audiences: &BTreeSet<String>) -> bool {
        self.providers
            .get(issuer)
            .is_some_and(|allowed| audiences.iter().any(|aud| allowed.contains(aud)))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    fn auds<const N: usize>(values: [&str; N]) -> BTreeSet<String> {
        values.into_iter().map(str::to_owned).collect()
    }

    #[test]
    fn test_open_method_requires_no_auth() {
        assert!(!MethodAuthPolicy::open().requires_auth());
        assert!(MethodAuthPolicy::new().requires_auth());
    }

    #[test]
    fn test_issuer_allow_list() {
        let method = MethodAuthPolicy::new().allow_issuer("https://issuer1.com");

        assert!(method.issuer_allowed("https://issuer1.com"));
        assert!(!method.issuer_allowed("https://issuer2.com"));
    }

    #[test]
    fn test_audiences_intersection() {
        let method = MethodAuthPolicy::new().allow_audiences("https://issuer1.com", ["a", "b"]);

        assert!(method.audiences_allowed("https://issuer1.com", &auds(["b", "z"])));
        assert!(!method.audiences_allowed("https://issuer1.com", &auds(["z"])));
    }

    #[test]
    fn test_issuer_without_audience_list_rejects_all_audiences() {
        let method = MethodAuthPolicy::new().allow_issuer("https://issuer1.com");

        // Only the service-name check (done by the pipeline) can admit
        // these tokens.
        assert!(!method.audiences_allowed("https://issuer1.com", &auds(["anything"])));
    }

    #[test]
    fn test_audiences_for_unknown_issuer_rejected() {
        let method = MethodAuthPolicy::new().allow_audiences("https://issuer1.com", ["a"]);

        assert!(!method.audiences_allowed("https://issuer2.com", &auds(["a"])));
    }

    #[test]
    fn test_allow_audiences_accumulates() {
        let method = MethodAuthPolicy::new()
            .allow_audiences("https://issuer1.com", ["a"])
            .allow_audiences("https://issuer1.com", ["b"]);

        assert!(method.audiences_allowed("https://issuer1.com", &auds(["a"])));
        assert!(method.audiences_allowed("https://issuer1.com", &auds(["b"])));
    }
}
