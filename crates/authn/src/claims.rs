//! Token claims and the user-info projection.
//!
//! [`Claims`] is the parsed, canonicalised view of a token payload used
//! throughout the pipeline. [`UserInfo`] is the subset handed to
//! downstream request handling once authentication succeeds.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};

/// Parsed token payload.
///
/// Created during pipeline execution and dropped when the pipeline
/// completes. Audiences are canonicalised: deduplicated, with insertion
/// order not significant.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Claims {
    /// The authority that signed the token (`iss`).
    pub issuer: String,
    /// The end-user identifier (`sub`).
    pub subject: String,
    /// The intended recipients (`aud`), at least one.
    pub audiences: BTreeSet<String>,
    /// Absolute instant beyond which the token is invalid (`exp`).
    pub expiry: DateTime<Utc>,
    /// Optional hint selecting one key within the issuer's set (`kid`).
    pub key_id: Option<String>,
}

impl Claims {
    /// Projects these claims into the [`UserInfo`] passed downstream.
    #[must_use]
    pub fn user_info(&self) -> UserInfo {
        UserInfo {
            id: self.subject.clone(),
            issuer: self.issuer.clone(),
            audiences: self.audiences.clone(),
        }
    }

    /// Whether the token has expired as of `now`.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expiry <= now
    }
}

/// Caller identity attached to an allowed request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UserInfo {
    /// The end-user identifier (the token's `sub`).
    pub id: String,
    /// The issuer the identity was established under.
    pub issuer: String,
    /// The token's audiences.
    pub audiences: BTreeSet<String>,
}

/// Wire-format payload as found in a token body.
///
/// Only the claims the pipeline acts on are modeled; everything else in
/// the payload is ignored. Validation of required-claim presence happens
/// in the validator after deserialization.
#[derive(Debug, Deserialize)]
pub(crate) struct RawClaims {
    #[serde(default)]
    pub iss: String,
    #[serde(default)]
    pub sub: String,
    #[serde(default, deserialize_with = "string_or_set")]
    pub aud: BTreeSet<String>,
    pub exp: i64,
    #[serde(default)]
    pub nbf: Option<i64>,
}

/// Accepts the `aud` claim as either a single string or an array of
/// strings, per RFC 7519 §4.1.3. Duplicates collapse into the set.
fn string_or_set<'de, D>(deserializer: D) -> Result<BTreeSet<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(aud) => BTreeSet::from([aud]),
        OneOrMany::Many(auds) => auds.into_iter().collect(),
    })
}
