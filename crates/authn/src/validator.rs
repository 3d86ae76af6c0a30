//! Token parsing and signature verification.
//!
//! [`TokenValidator`] splits credential checking into two phases with a
//! deliberate ordering contract:
//!
//! - [`parse`](TokenValidator::parse) must fail *before any network I/O*
//!   if the token is syntactically invalid, its signature segment is not
//!   well-formed, or its time constraints already fail. Rejecting expired
//!   tokens here means no key is ever fetched for them.
//! - [`verify`](TokenValidator::verify) checks the signature against a
//!   key-set document and must not revalidate time constraints — those
//!   were settled at parse time.
//!
//! [`JwtValidator`] is the production implementation on top of the
//! `jsonwebtoken` crate. The trait exists so tests and alternative
//! deployments can substitute their own primitive layer.

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, Utc};
use jsonwebtoken::{DecodingKey, Validation, decode_header, jwk::JwkSet};

use crate::{
    claims::{Claims, RawClaims},
    error::ValidationError,
};

/// JWT algorithms that are never accepted.
///
/// - `none`: no signature verification (trivially bypassable). Note
///   that `jsonwebtoken`'s header decoder has no `none` variant, so
///   such tokens already fail header decoding inside
///   [`parse`](TokenValidator::parse) and are denied as malformed
///   before this list is consulted; the entry guards direct calls to
///   [`validate_algorithm`].
/// - `HS256`, `HS384`, `HS512`: symmetric algorithms; accepting them
///   enables the classic confusion attack where a published public key
///   doubles as the HMAC secret
pub const FORBIDDEN_ALGORITHMS: &[&str] = &["none", "HS256", "HS384", "HS512"];

/// JWT algorithms accepted for verification.
///
/// Issuer key sets in the wild are overwhelmingly RSA; EdDSA is accepted
/// for issuers that publish OKP keys. Anything else is rejected at parse
/// time so unsupported tokens never trigger a key fetch.
pub const ACCEPTED_ALGORITHMS: &[&str] = &["RS256", "EdDSA"];

/// Validates a JWT algorithm name against the allow/deny lists.
///
/// Forbidden algorithms are rejected first so symmetric and unsigned
/// tokens always produce the security rejection, independent of the
/// accepted list's contents.
///
/// # Errors
///
/// Returns [`ValidationError::UnsupportedAlgorithm`] for anything outside
/// [`ACCEPTED_ALGORITHMS`].
pub fn validate_algorithm(alg: &str) -> Result<(), ValidationError> {
    if FORBIDDEN_ALGORITHMS.contains(&alg) {
        return Err(ValidationError::unsupported_algorithm(format!(
            "{alg} is not allowed for security reasons"
        )));
    }
    if !ACCEPTED_ALGORITHMS.contains(&alg) {
        return Err(ValidationError::unsupported_algorithm(alg));
    }
    Ok(())
}

/// Credential parse and verification capability.
///
/// Implementations are stateless and shared across concurrent pipelines.
pub trait TokenValidator: Send + Sync {
    /// Parses a token into [`Claims`] without verifying its signature.
    ///
    /// # Errors
    ///
    /// Returns an error if the token is structurally invalid, uses an
    /// unacceptable algorithm, or fails its time constraints (`exp`,
    /// `nbf`) as of now.
    fn parse(&self, token: &str) -> Result<Claims, ValidationError>;

    /// Verifies the token's signature against a key-set document.
    ///
    /// `keys` is the verbatim body fetched from the issuer's `jwks_uri`.
    /// Time constraints are not re-checked here.
    ///
    /// # Errors
    ///
    /// Returns an error if the key set is unusable, contains no matching
    /// key, or the signature does not verify.
    fn verify(&self, token: &str, keys: &str) -> Result<(), ValidationError>;
}

/// Production [`TokenValidator`] backed by the `jsonwebtoken` crate.
#[derive(Clone, Copy, Debug, Default)]
pub struct JwtValidator;

impl JwtValidator {
    /// Creates a new validator.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn parse_at(&self, token: &str, now: DateTime<Utc>) -> Result<Claims, ValidationError> {
        let header = decode_header(token)
            .map_err(|e| ValidationError::malformed(format!("failed to decode JWT header: {e}")))?;

        validate_algorithm(&format!("{:?}", header.alg))?;

        let parts: Vec<&str> = token.split('.').collect();
        if parts.len() != 3 {
            return Err(ValidationError::malformed("JWT must have 3 dot-separated segments"));
        }

        // The signature segment must at least be well-formed base64url;
        // rejecting it here keeps garbage tokens from triggering a key fetch.
        if parts[2].is_empty() {
            return Err(ValidationError::malformed("JWT signature segment is empty"));
        }
        URL_SAFE_NO_PAD
            .decode(parts[2])
            .map_err(|e| ValidationError::malformed(format!("invalid signature encoding: {e}")))?;

        let payload = URL_SAFE_NO_PAD
            .decode(parts[1])
            .map_err(|e| ValidationError::malformed(format!("failed to decode payload: {e}")))?;
        let raw: RawClaims = serde_json::from_slice(&payload)
            .map_err(|e| ValidationError::malformed(format!("failed to parse claims: {e}")))?;

        if raw.iss.is_empty() {
            return Err(ValidationError::malformed("missing claim: iss"));
        }
        if raw.sub.is_empty() {
            return Err(ValidationError::malformed("missing claim: sub"));
        }
        if raw.aud.is_empty() {
            return Err(ValidationError::malformed("missing claim: aud"));
        }

        let expiry = DateTime::from_timestamp(raw.exp, 0)
            .ok_or_else(|| ValidationError::malformed("exp claim out of range"))?;
        if expiry <= now {
            return Err(ValidationError::TokenExpired);
        }
        if let Some(nbf) = raw.nbf
            && let Some(not_before) = DateTime::from_timestamp(nbf, 0)
            && not_before > now
        {
            return Err(ValidationError::TokenNotYetValid);
        }

        Ok(Claims {
            issuer: raw.iss,
            subject: raw.sub,
            audiences: raw.aud,
            expiry,
            key_id: header.kid,
        })
    }
}

impl TokenValidator for JwtValidator {
    fn parse(&self, token: &str) -> Result<Claims, ValidationError> {
        self.parse_at(token, Utc::now())
    }

    fn verify(&self, token: &str, keys: &str) -> Result<(), ValidationError> {
        let jwks: JwkSet = serde_json::from_str(keys)
            .map_err(|e| ValidationError::invalid_key_set(format!("not a JWK set: {e}")))?;

        let header = decode_header(token)
            .map_err(|e| ValidationError::malformed(format!("failed to decode JWT header: {e}")))?;

        // A kid hint narrows the search to one key; without one, every
        // key in the set is a candidate.
        let candidates: Vec<_> = match header.kid.as_deref() {
            Some(kid) => jwks.find(kid).into_iter().collect(),
            None => jwks.keys.iter().collect(),
        };
        if candidates.is_empty() {
            return Err(ValidationError::NoMatchingKey { kid: header.kid });
        }

        let mut validation = Validation::new(header.alg);
        // Time constraints were already settled at parse time.
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();

        let mut last_error = ValidationError::InvalidSignature;
        for jwk in candidates {
            let key = match DecodingKey::from_jwk(jwk) {
                Ok(key) => key,
                Err(e) => {
                    last_error =
                        ValidationError::invalid_key_set(format!("unusable JWK in set: {e}"));
                    continue;
                },
            };
            match jsonwebtoken::decode::<serde_json::Value>(token, &key, &validation) {
                Ok(_) => return Ok(()),
                Err(e) => last_error = e.into(),
            }
        }

        Err(last_error)
    }
}
