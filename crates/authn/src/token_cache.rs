//! Cache of already-validated tokens.
//!
//! A hit here short-circuits the whole parse/fetch/verify tail of the
//! pipeline: the raw token string maps directly to the [`UserInfo`] that
//! was established when the token first verified.
//!
//! # Cache Strategy
//!
//! - **Keyed by the raw token string** — two requests carrying the same
//!   bytes share one entry.
//! - **Bounded**: LRU eviction at a configurable capacity. Eviction never
//!   affects correctness; a missing entry merely forces a re-parse.
//! - **Expiry on lookup**: entries are not TTL'd by the cache itself.
//!   The caller compares the stored token expiry against now and treats
//!   an expired entry as a miss, scheduling its removal.

use chrono::{DateTime, Utc};
use moka::{future::Cache, policy::EvictionPolicy};

use crate::claims::UserInfo;

/// Default maximum number of validated tokens tracked.
pub const DEFAULT_TOKEN_CACHE_CAPACITY: u64 = 10_000;

/// One validated token.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TokenCacheEntry {
    /// Identity established when the token verified.
    pub user_info: UserInfo,
    /// The token's own expiry; past this instant the entry is dead.
    pub token_expiry: DateTime<Utc>,
    /// When the entry was inserted.
    pub inserted_at: DateTime<Utc>,
}

impl TokenCacheEntry {
    /// Whether the underlying token has expired as of `now`.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.token_expiry <= now
    }
}

/// Capacity-bounded cache of validated tokens.
///
/// # Thread Safety
///
/// `TokenCache` is `Send + Sync`; concurrent lookups and inserts are
/// permitted and observe either an older or a newer complete entry,
/// never a partially constructed one. Insertion is last-writer-wins.
pub struct TokenCache {
    entries: Cache<String, TokenCacheEntry>,
}

impl TokenCache {
    /// Creates a cache bounded to `max_capacity` entries with LRU eviction.
    #[must_use]
    pub fn new(max_capacity: u64) -> Self {
        let entries = Cache::builder()
            .max_capacity(max_capacity)
            .eviction_policy(EvictionPolicy::lru())
            .build();
        Self { entries }
    }

    /// Returns a snapshot of the entry for `token`, if present.
    ///
    /// The caller must check [`TokenCacheEntry::is_expired`] and treat an
    /// expired entry as a miss plus [`remove`](Self::remove).
    pub async fn lookup(&self, token: &str) -> Option<TokenCacheEntry> {
        self.entries.get(token).await
    }

    /// Inserts or overwrites the entry for `token`.
    pub async fn insert(&self, token: &str, entry: TokenCacheEntry) {
        self.entries.insert(token.to_owned(), entry).await;
    }

    /// Removes the entry for `token`, if present. Best-effort.
    pub async fn remove(&self, token: &str) {
        self.entries.invalidate(token).await;
    }

    /// Returns the current entry count.
    ///
    /// Note: this count is eventually consistent. For accurate counts in
    /// tests, call `sync` first.
    #[must_use]
    pub fn entry_count(&self) -> u64 {
        self.entries.entry_count()
    }

    /// Synchronizes pending cache operations so entry counts are accurate.
    ///
    /// Only useful in tests; production code never reads entry counts.
    #[cfg(any(test, feature = "testutil"))]
    pub async fn sync(&self) {
        self.entries.run_pending_tasks().await;
    }
}
