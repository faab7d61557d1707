//! PKCE (RFC 7636), S256 method only.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use sha2::{Digest, Sha256};

/// The only supported code challenge method.
pub const METHOD_S256: &str = "S256";

/// Compute the S256 code challenge for a verifier:
/// `base64url(SHA-256(verifier))` without padding.
#[must_use]
pub fn code_challenge(code_verifier: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(code_verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(hasher.finalize())
}

/// Verify a code verifier against a stored challenge in constant time.
#[must_use]
pub fn verify_code_verifier(code_verifier: &str, stored_challenge: &str) -> bool {
    let computed = code_challenge(code_verifier);
    subtle::ConstantTimeEq::ct_eq(computed.as_bytes(), stored_challenge.as_bytes()).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rfc7636_appendix_b_vector() {
        let verifier = "dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk";
        let expected = "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM";
        assert_eq!(code_challenge(verifier), expected);
    }

    #[test]
    fn test_verifier_round_trip() {
        let verifier = "a-verifier-that-is-at-least-43-characters-long!";
        let challenge = code_challenge(verifier);

        assert!(verify_code_verifier(verifier, &challenge));
        assert!(!verify_code_verifier("wrong-verifier", &challenge));
    }

    #[test]
    fn test_challenge_is_deterministic() {
        let verifier = "abc123xyz";
        assert_eq!(code_challenge(verifier), code_challenge(verifier));
    }

    #[test]
    fn test_challenge_has_no_padding() {
        let challenge = code_challenge("abc123xyz");
        assert_eq!(challenge.len(), 43);
        assert!(!challenge.contains('='));
    }
}
