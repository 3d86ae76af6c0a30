//! Authentication error types.
//!
//! Two layers of errors exist here, matching the two layers of the core:
//!
//! - [`ValidationError`] — produced by the token validator when parsing or
//!   verifying a credential. Its `Display` output is the *reason* text
//!   that ends up behind the stable `"JWT validation failed: "` prefix.
//! - [`AuthError`] — the terminal denial of the authentication pipeline.
//!   Its `Display` output is the full, externally observable message and
//!   is stable across releases; clients and tests match on it verbatim.
//!
//! Internal detail (malformed-payload specifics, upstream status codes)
//! is carried in non-displayed fields and logged at the denial point; it
//! is never surfaced to clients.

use thiserror::Error;

/// Result type alias for pipeline operations.
pub type AuthResult<T> = Result<T, AuthError>;

/// Classification of a denial for the host's error-cause annotation.
///
/// Every denial maps to an authentication-failure status; the cause
/// distinguishes ordinary credential rejections from internal faults.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ErrorCause {
    /// The credential (or the trust material for it) was rejected.
    Auth,
    /// An internal invariant failed; the credential itself was not judged.
    Internal,
}

/// Token-level parse and verification errors.
///
/// # Non-exhaustive
///
/// This enum is marked `#[non_exhaustive]` — new variants may be added in
/// future minor releases without a semver-breaking change. Downstream match
/// expressions must include a wildcard arm (`_ =>`).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ValidationError {
    /// The token is structurally invalid: wrong segment count, undecodable
    /// payload, non-JSON claims, or missing required claims.
    ///
    /// The `detail` field describes the specific defect for logging; the
    /// displayed message is deliberately generic.
    #[error("Missing or invalid credentials")]
    Malformed {
        /// What exactly was wrong, for diagnostics only.
        detail: String,
    },

    /// The token's `exp` claim is in the past.
    #[error("Token expired")]
    TokenExpired,

    /// The token's `nbf` claim is in the future.
    #[error("Token not yet valid")]
    TokenNotYetValid,

    /// The signing algorithm is forbidden or not supported.
    #[error("Unsupported algorithm: {message}")]
    UnsupportedAlgorithm {
        /// The algorithm that was rejected, with the reason when the
        /// rejection is security-motivated.
        message: String,
    },

    /// Signature verification failed against the supplied key set.
    #[error("Invalid signature")]
    InvalidSignature,

    /// The key set contains no key usable for this token.
    #[error("No matching verification key")]
    NoMatchingKey {
        /// The `kid` hint from the token header, when present.
        kid: Option<String>,
    },

    /// The key-set document could not be parsed.
    #[error("Invalid key set")]
    InvalidKeySet {
        /// What exactly was wrong, for diagnostics only.
        detail: String,
    },
}

impl ValidationError {
    /// Creates a [`ValidationError::Malformed`] error.
    pub fn malformed(detail: impl Into<String>) -> Self {
        Self::Malformed { detail: detail.into() }
    }

    /// Creates a [`ValidationError::UnsupportedAlgorithm`] error.
    pub fn unsupported_algorithm(message: impl Into<String>) -> Self {
        Self::UnsupportedAlgorithm { message: message.into() }
    }

    /// Creates a [`ValidationError::InvalidKeySet`] error.
    pub fn invalid_key_set(detail: impl Into<String>) -> Self {
        Self::InvalidKeySet { detail: detail.into() }
    }
}

impl From<jsonwebtoken::errors::Error> for ValidationError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match err.kind() {
            ErrorKind::InvalidSignature => ValidationError::InvalidSignature,
            ErrorKind::ExpiredSignature => ValidationError::TokenExpired,
            ErrorKind::ImmatureSignature => ValidationError::TokenNotYetValid,
            ErrorKind::InvalidAlgorithm | ErrorKind::InvalidAlgorithmName => {
                ValidationError::unsupported_algorithm("unknown")
            },
            _ => ValidationError::malformed(format!("JWT error: {err}")),
        }
    }
}

/// Terminal denial of the authentication pipeline.
///
/// The `Display` output of every variant is part of the public contract:
/// it is exactly what a denied client observes, and it never leaks
/// internal state.
///
/// # Non-exhaustive
///
/// This enum is marked `#[non_exhaustive]` — new variants may be added in
/// future minor releases without a semver-breaking change. Downstream match
/// expressions must include a wildcard arm (`_ =>`).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AuthError {
    /// No usable bearer credential was found on the request.
    #[error("JWT validation failed: Missing or invalid credentials")]
    MissingCredentials,

    /// The token's issuer is not in the method's allow-list.
    #[error("JWT validation failed: Issuer not allowed")]
    IssuerNotAllowed,

    /// The token's audiences satisfy neither the service name nor the
    /// method's audience policy.
    #[error("JWT validation failed: Audience not allowed")]
    AudienceNotAllowed,

    /// No key URL is known for the issuer and discovery has already
    /// failed (negative cache hit).
    #[error("JWT validation failed: Cannot determine the URI of the key")]
    KeyUriUnknown,

    /// OpenID discovery fetch failed or returned an unusable document.
    #[error("JWT validation failed: Unable to fetch URI of the key via OpenID discovery")]
    DiscoveryFailed,

    /// The key-set fetch failed or returned an empty body.
    #[error("JWT validation failed: Unable to fetch verification key")]
    KeyFetchFailed,

    /// The key cache held no entry at verification time.
    #[error("JWT validation failed: Missing verification key")]
    MissingVerificationKey,

    /// A token-level parse or verification error.
    #[error("JWT validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// An internal invariant failed.
    #[error("JWT validation failed: Internal error")]
    Internal,
}

impl AuthError {
    /// Returns the cause classification for this denial.
    #[must_use]
    pub fn cause(&self) -> ErrorCause {
        match self {
            AuthError::Internal => ErrorCause::Internal,
            _ => ErrorCause::Auth,
        }
    }
}

/// Error returned when a configuration value fails validation.
///
/// Each variant names the field that was invalid and the constraint it
/// violated, providing actionable feedback for operators constructing
/// configs.
///
/// # Non-exhaustive
///
/// New variants may be added in future minor releases.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// A field that must be non-empty was empty.
    #[error("invalid {field}: must not be empty")]
    MustNotBeEmpty {
        /// The name of the configuration field.
        field: &'static str,
    },

    /// A field that must be positive was set to zero.
    #[error("invalid {field}: must be positive (got {value})")]
    MustBePositive {
        /// The name of the configuration field.
        field: &'static str,
        /// A human-readable representation of the invalid value.
        value: String,
    },
}
