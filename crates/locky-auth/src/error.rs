//! Error types for cryptographic operations.

use thiserror::Error;

/// Cryptographic operation errors.
///
/// Each variant maps to a specific failure mode so callers can react
/// precisely (e.g. treat `TokenExpired` differently from a bad signature).
#[derive(Debug, Clone, Error)]
pub enum AuthError {
    // JWT errors
    /// Token has expired (`exp` is in the past).
    #[error("token has expired")]
    TokenExpired,

    /// Token is not yet valid (`nbf` is in the future).
    #[error("token is not yet valid")]
    TokenNotYetValid,

    /// Token signature verification failed.
    #[error("invalid token signature")]
    InvalidSignature,

    /// Token is malformed or fails structural validation.
    #[error("invalid token: {0}")]
    InvalidToken(String),

    /// Token uses an algorithm other than ES256.
    #[error("unsupported algorithm: only ES256 is allowed")]
    InvalidAlgorithm,

    /// A required claim is missing from the token.
    #[error("missing required claim: {0}")]
    MissingClaim(String),

    // Password errors
    /// Password hashing failed.
    #[error("password hashing failed: {0}")]
    HashingFailed(String),

    /// The stored password hash is not a valid PHC encoding.
    #[error("invalid password hash format")]
    InvalidHashFormat,

    // Key errors
    /// Keypair generation failed.
    #[error("key generation failed: {0}")]
    KeyGenerationFailed(String),

    /// A public or private key is malformed.
    #[error("invalid key: {0}")]
    InvalidKey(String),

    /// Sealing a private key under the master key failed.
    #[error("key sealing failed: {0}")]
    SealFailed(String),

    /// Unsealing a private key failed (wrong master key or corrupt data).
    #[error("key unsealing failed: {0}")]
    OpenFailed(String),
}

impl AuthError {
    /// Whether this error indicates an expired token.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        matches!(self, AuthError::TokenExpired)
    }

    /// Whether this error relates to JWT validation.
    #[must_use]
    pub fn is_jwt_error(&self) -> bool {
        matches!(
            self,
            AuthError::TokenExpired
                | AuthError::TokenNotYetValid
                | AuthError::InvalidSignature
                | AuthError::InvalidToken(_)
                | AuthError::InvalidAlgorithm
                | AuthError::MissingClaim(_)
        )
    }
}
