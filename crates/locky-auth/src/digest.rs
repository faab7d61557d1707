//! Opaque-token digests.
//!
//! Authorization codes and refresh tokens are persisted as
//! `base64url(SHA-256(plaintext))` with no salt: the inputs are uniformly
//! random high-entropy values and the digest serves only as a
//! non-reversible exact-match index.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use sha2::{Digest, Sha256};

/// Length of a generated opaque token in raw bytes (256 bits).
pub const OPAQUE_TOKEN_LEN: usize = 32;

/// Digest a plaintext token for storage or lookup.
#[must_use]
pub fn token_digest(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    URL_SAFE_NO_PAD.encode(hasher.finalize())
}

/// Generate a random opaque token (authorization code, refresh token).
///
/// Uses the operating system CSPRNG directly.
#[must_use]
pub fn generate_opaque_token() -> String {
    use rand::rngs::OsRng;
    use rand::RngCore;
    let mut bytes = [0u8; OPAQUE_TOKEN_LEN];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digest_is_deterministic() {
        assert_eq!(token_digest("some-token"), token_digest("some-token"));
    }

    #[test]
    fn test_digest_is_base64url_of_sha256() {
        let digest = token_digest("some-token");
        // 32 bytes base64url without padding = 43 characters
        assert_eq!(digest.len(), 43);
        assert!(!digest.contains('='));
        assert!(!digest.contains('+'));
        assert!(!digest.contains('/'));
    }

    #[test]
    fn test_different_tokens_differ() {
        assert_ne!(token_digest("a"), token_digest("b"));
    }

    #[test]
    fn test_generated_tokens_are_unique() {
        assert_ne!(generate_opaque_token(), generate_opaque_token());
    }

    #[test]
    fn test_generated_token_length() {
        // 32 bytes base64url encoded = 43 characters
        assert_eq!(generate_opaque_token().len(), 43);
    }
}
