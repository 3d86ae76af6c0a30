//! Fuzz target for token parsing and verification.
//!
//! Feeds arbitrary byte strings as bearer tokens to the validator. The
//! goal is to find inputs that cause panics, hangs, or unexpected
//! behavior — every result must be either `Ok(...)` or a
//! `ValidationError`.

#![no_main]

use apigw_authn::validator::{JwtValidator, TokenValidator, validate_algorithm};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Only process valid UTF-8 — bearer tokens are always UTF-8 strings
    let Ok(token) = std::str::from_utf8(data) else {
        return;
    };

    let validator = JwtValidator::new();

    // Parsing must not panic on any input
    let parse_result = validator.parse(token);

    // Verification must not panic either, against an empty key set and
    // against the input itself posing as a key set
    let _ = validator.verify(token, r#"{"keys":[]}"#);
    let _ = validator.verify(token, token);

    // If the token parsed, its required claims are guaranteed non-empty
    if let Ok(claims) = parse_result {
        assert!(!claims.issuer.is_empty());
        assert!(!claims.subject.is_empty());
        assert!(!claims.audiences.is_empty());
    }

    // If the header decoded, the algorithm name it carries must pass
    // through validation without panicking
    if let Ok(header) = jsonwebtoken::decode_header(token) {
        let alg_str = format!("{:?}", header.alg);
        let _ = validate_algorithm(&alg_str);
    }
});
