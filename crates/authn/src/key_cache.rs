//! Per-issuer cache of verification key sets.
//!
//! Key sets are fetched from issuer-published URLs and reused for a
//! bounded lifetime so that steady-state verification performs no
//! network I/O. Entries are replaced atomically; an expired entry is
//! treated as a miss by the caller, which re-fetches and overwrites it.
//!
//! The TTL starts at insertion and is never refreshed by verification,
//! only by a fresh fetch.

use std::{collections::HashMap, sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;

/// Default lifetime of a fetched key set.
pub const DEFAULT_KEY_TTL: Duration = Duration::from_secs(300);

/// A cached key-set document for one issuer.
#[derive(Clone, Debug)]
pub struct KeySetEntry {
    /// The verbatim key-set document, opaque to the cache.
    pub keys: Arc<str>,
    /// Absolute instant past which the entry is stale.
    pub expires_at: DateTime<Utc>,
}

impl KeySetEntry {
    /// Whether the entry is stale as of `now`.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

/// Per-issuer key-set cache.
///
/// # Thread Safety
///
/// Reads and writes take a short critical section on a reader-writer
/// lock; writes never block on external I/O. Concurrent updates for the
/// same issuer are last-writer-wins, which is safe because every writer
/// holds a complete, freshly fetched document.
#[derive(Debug, Default)]
pub struct KeyCache {
    entries: RwLock<HashMap<String, KeySetEntry>>,
}

impl KeyCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of the entry for `issuer`, if present.
    ///
    /// Expiry is not checked here; the caller compares
    /// [`KeySetEntry::expires_at`] against now and treats a stale entry
    /// as a miss.
    #[tracing::instrument(skip(self))]
    pub fn get(&self, issuer: &str) -> Option<KeySetEntry> {
        self.entries.read().get(issuer).cloned()
    }

    /// Atomically replaces the entry for `issuer`.
    #[tracing::instrument(skip(self, keys))]
    pub fn update(&self, issuer: &str, keys: &str, expires_at: DateTime<Utc>) {
        let entry = KeySetEntry { keys: Arc::from(keys), expires_at };
        self.entries.write().insert(issuer.to_owned(), entry);
    }

    /// Returns the number of cached issuers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn test_update_then_get() {
        let cache = KeyCache::new();
        let expires_at = Utc::now() + DEFAULT_KEY_TTL;

        cache.update("https://issuer1.com", r#"{"keys":[]}"#, expires_at);

        let entry = cache.get("https://issuer1.com").expect("entry should exist");
        assert_eq!(&*entry.keys, r#"{"keys":[]}"#);
        assert_eq!(entry.expires_at, expires_at);
        assert!(!entry.is_expired(Utc::now()));
    }

    #[test]
    fn test_get_miss() {
        let cache = KeyCache::new();

        assert!(cache.get("https://unknown.example.com").is_none());
    }

    #[test]
    fn test_update_replaces_atomically() {
        let cache = KeyCache::new();
        let expires_at = Utc::now() + DEFAULT_KEY_TTL;

        cache.update("https://issuer1.com", "first", expires_at);
        cache.update("https://issuer1.com", "second", expires_at);

        let entry = cache.get("https://issuer1.com").expect("entry should exist");
        assert_eq!(&*entry.keys, "second");
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_expired_entry_detected() {
        let cache = KeyCache::new();

        cache.update("https://issuer1.com", "keys", Utc::now() - chrono::Duration::seconds(1));

        let entry = cache.get("https://issuer1.com").expect("entry still stored");
        assert!(entry.is_expired(Utc::now()), "caller must treat this as a miss");
    }

    #[test]
    fn test_expiry_boundary_is_inclusive() {
        let cache = KeyCache::new();
        let now = Utc::now();

        cache.update("https://issuer1.com", "keys", now);

        let entry = cache.get("https://issuer1.com").expect("entry should exist");
        // An entry expiring exactly now is still usable; only strictly
        // past-expiry entries are stale.
        assert!(!entry.is_expired(now));
        assert!(entry.is_expired(now + chrono::Duration::seconds(1)));
    }

    #[test]
    fn test_issuers_are_independent() {
        let cache = KeyCache::new();
        let expires_at = Utc::now() + DEFAULT_KEY_TTL;

        cache.update("https://issuer1.com", "one", expires_at);
        cache.update("https://issuer2.com", "two", expires_at);

        assert_eq!(&*cache.get("https://issuer1.com").expect("issuer1").keys, "one");
        assert_eq!(&*cache.get("https://issuer2.com").expect("issuer2").keys, "two");
        assert_eq!(cache.len(), 2);
    }
}
