//! Shared test utilities for authentication testing.
//!
//! Helpers for minting Ed25519 key pairs, JWKS documents, signed (and
//! deliberately broken) tokens, OpenID discovery documents, and an
//! in-memory [`Request`] implementation. Feature-gated behind `testutil`
//! to keep signing machinery out of production builds.
//!
//! # Usage
//!
//! In integration tests, enable the feature in `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! apigw-authn = { path = ".", features = ["testutil"] }
//! ```

use std::collections::HashMap;

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, Duration, Utc};
use ed25519_dalek::SigningKey;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use rand_core::OsRng;
use serde_json::json;

use crate::{claims::UserInfo, context::Request};

/// Generates a fresh Ed25519 key pair for signing test tokens.
///
/// Returns `(pkcs8_der, public_key_b64url)`:
/// - `pkcs8_der` feeds [`EncodingKey::from_ed_der`] for signing
/// - `public_key_b64url` is the 32-byte public key, base64url without
///   padding, ready to drop into a JWKS document via [`jwks_document`]
pub fn generate_test_keypair() -> (Vec<u8>, String) {
    let signing_key = SigningKey::generate(&mut OsRng);
    let public_key_b64 = URL_SAFE_NO_PAD.encode(signing_key.verifying_key().to_bytes());

    // Minimal PKCS#8 v1 wrapper around the raw 32-byte Ed25519 seed.
    let mut pkcs8_der = vec![
        0x30, 0x2e, // SEQUENCE, 46 bytes
        0x02, 0x01, 0x00, // INTEGER version 0
        0x30, 0x05, // SEQUENCE, 5 bytes (algorithm identifier)
        0x06, 0x03, 0x2b, 0x65, 0x70, // OID 1.3.101.112 (Ed25519)
        0x04, 0x22, // OCTET STRING, 34 bytes
        0x04, 0x20, // OCTET STRING, 32 bytes (the seed)
    ];
    pkcs8_der.extend_from_slice(&signing_key.to_bytes());

    (pkcs8_der, public_key_b64)
}

/// Renders a single-key JWKS document for an Ed25519 public key.
///
/// # Panics
///
/// Panics if JSON serialization fails (it cannot with these inputs).
pub fn jwks_document(kid: &str, public_key_b64: &str) -> String {
    json!({
        "keys": [{
            "kty": "OKP",
            "crv": "Ed25519",
            "alg": "EdDSA",
            "use": "sig",
            "kid": kid,
            "x": public_key_b64,
        }]
    })
    .to_string()
}

/// Renders an OpenID discovery document pointing at `jwks_uri`.
///
/// # Panics
///
/// Panics if JSON serialization fails (it cannot with these inputs).
pub fn discovery_document(jwks_uri: &str) -> String {
    json!({ "jwks_uri": jwks_uri }).to_string()
}

/// Creates a signed token with the given expiry.
///
/// # Panics
///
/// Panics if encoding fails (it cannot with a key pair from
/// [`generate_test_keypair`]).
pub fn signed_token_with_expiry(
    pkcs8_der: &[u8],
    kid: &str,
    issuer: &str,
    subject: &str,
    audience: &str,
    expiry: DateTime<Utc>,
) -> String {
    let claims = json!({
        "iss": issuer,
        "sub": subject,
        "aud": audience,
        "iat": Utc::now().timestamp(),
        "exp": expiry.timestamp(),
    });

    let mut header = Header::new(Algorithm::EdDSA);
    header.kid = Some(kid.to_owned());

    let encoding_key = EncodingKey::from_ed_der(pkcs8_der);
    jsonwebtoken::encode(&header, &claims, &encoding_key).expect("failed to encode test JWT")
}

/// Creates a signed token valid for one hour.
///
/// # Panics
///
/// Panics if encoding fails (it cannot with a key pair from
/// [`generate_test_keypair`]).
pub fn signed_token(
    pkcs8_der: &[u8],
    kid: &str,
    issuer: &str,
    subject: &str,
    audience: &str,
) -> String {
    let expiry = Utc::now() + Duration::hours(1);
    signed_token_with_expiry(pkcs8_der, kid, issuer, subject, audience, expiry)
}

/// Creates a raw token from arbitrary header and payload JSON with a
/// fake signature segment.
///
/// Useful for exercising rejection of malformed or attack tokens
/// (`alg: "none"`, algorithm confusion, missing claims).
///
/// # Panics
///
/// Panics if JSON serialization fails.
pub fn craft_raw_token(header: &serde_json::Value, payload: &serde_json::Value) -> String {
    let header_b64 = URL_SAFE_NO_PAD.encode(serde_json::to_vec(header).expect("header json"));
    let payload_b64 = URL_SAFE_NO_PAD.encode(serde_json::to_vec(payload).expect("payload json"));
    let signature_b64 = URL_SAFE_NO_PAD.encode(b"not-a-real-signature");
    format!("{header_b64}.{payload_b64}.{signature_b64}")
}

/// In-memory [`Request`] capturing the pipeline's side effects.
#[derive(Debug, Default)]
pub struct MemoryRequest {
    headers: HashMap<String, String>,
    query: HashMap<String, String>,
    /// Token attached by the pipeline, if extraction succeeded.
    pub auth_token: Option<String>,
    /// Identity attached by the pipeline on Allow.
    pub user_info: Option<UserInfo>,
}

impl MemoryRequest {
    /// Creates a request with no headers or query parameters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a request carrying `Authorization: Bearer <token>`.
    #[must_use]
    pub fn with_bearer(token: &str) -> Self {
        Self::new().header("authorization", format!("Bearer {token}"))
    }

    /// Creates a request carrying the token in the `access_token`
    /// query parameter.
    #[must_use]
    pub fn with_query_token(token: &str) -> Self {
        let mut request = Self::new();
        request.query.insert("access_token".to_owned(), token.to_owned());
        request
    }

    /// Adds a header.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }
}

impl Request for MemoryRequest {
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

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::validator::{JwtValidator, TokenValidator};

    #[test]
    fn test_keypair_shape() {
        let (pkcs8_der, public_key_b64) = generate_test_keypair();
        // PKCS#8 DER for Ed25519 is 48 bytes (16 header + 32 seed)
        assert_eq!(pkcs8_der.len(), 48);
        // base64url of 32 bytes = 43 characters, no padding
        assert_eq!(public_key_b64.len(), 43);
    }

    #[test]
    fn test_keypairs_are_unique() {
        let (_, pk1) = generate_test_keypair();
        let (_, pk2) = generate_test_keypair();
        assert_ne!(pk1, pk2);
    }

    #[test]
    fn test_signed_token_round_trips_through_validator() {
        let (pkcs8_der, public_key_b64) = generate_test_keypair();
        let token =
            signed_token(&pkcs8_der, "kid-1", "https://issuer1.com", "end-user-id", "svc");
        let jwks = jwks_document("kid-1", &public_key_b64);

        let validator = JwtValidator::new();
        let claims = validator.parse(&token).expect("token should parse");
        assert_eq!(claims.issuer, "https://issuer1.com");
        assert_eq!(claims.subject, "end-user-id");
        assert_eq!(claims.key_id.as_deref(), Some("kid-1"));

        validator.verify(&token, &jwks).expect("signature should verify");
    }

    #[test]
    fn test_token_signed_by_other_key_fails_verification() {
        let (pkcs8_der, _) = generate_test_keypair();
        let (_, other_public_key) = generate_test_keypair();
        let token =
            signed_token(&pkcs8_der, "kid-1", "https://issuer1.com", "end-user-id", "svc");
        let jwks = jwks_document("kid-1", &other_public_key);

        let result = JwtValidator::new().verify(&token, &jwks);
        assert!(result.is_err(), "wrong key must not verify, got: {result:?}");
    }

    #[test]
    fn test_memory_request_accessors() {
        let request = MemoryRequest::with_bearer("tok");
        assert_eq!(request.find_header("authorization").as_deref(), Some("Bearer tok"));
        assert!(request.find_query("access_token").is_none());

        let request = MemoryRequest::with_query_token("tok");
        assert_eq!(request.find_query("access_token").as_deref(), Some("tok"));
        assert!(request.find_header("authorization").is_none());
    }
}
