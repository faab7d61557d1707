//! Password hashing with Argon2id.
//!
//! Hashes are stored in PHC string format with the parameters embedded, so
//! verification reparses whatever parameter set the hash was created with.
//! This allows the cost parameters to be tuned later without invalidating
//! existing credentials.

use crate::error::AuthError;
use argon2::{
    password_hash::{
        rand_core::OsRng, PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString,
    },
    Algorithm, Argon2, Params, Version,
};

/// Password hasher configuration.
///
/// Parameters:
/// - Memory: 65536 KiB (64 MiB)
/// - Iterations: 3
/// - Parallelism: 4
/// - Output: 32 bytes
#[derive(Debug, Clone)]
pub struct PasswordHasher {
    params: Params,
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self::new()
    }
}

impl PasswordHasher {
    /// Create a hasher with the engine's standard parameters.
    #[must_use]
    pub fn new() -> Self {
        // m=65536 (64 MiB), t=3, p=4. Constants are always valid; a failure
        // here would indicate a bug in the argon2 crate itself.
        let params = Params::new(
            65536, // m_cost: memory in KiB
            3,     // t_cost: iterations
            4,     // p_cost: parallelism
            Some(32),
        )
        .expect("standard Argon2 parameters are valid constants");

        Self { params }
    }

    /// Create a hasher with custom parameters.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::HashingFailed` if the parameters are invalid.
    pub fn with_params(
        memory_kib: u32,
        iterations: u32,
        parallelism: u32,
    ) -> Result<Self, AuthError> {
        let params = Params::new(memory_kib, iterations, parallelism, Some(32))
            .map_err(|e| AuthError::HashingFailed(format!("invalid parameters: {e}")))?;

        Ok(Self { params })
    }

    /// Hash a password with a fresh 16-byte random salt.
    ///
    /// Returns the PHC-formatted hash string
    /// (`$argon2id$v=19$m=65536,t=3,p=4$<salt>$<hash>`).
    ///
    /// # Errors
    ///
    /// Returns `AuthError::HashingFailed` if hashing fails.
    pub fn hash(&self, password: &str) -> Result<String, AuthError> {
        let salt = SaltString::generate(&mut OsRng);
        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone());

        let hash = argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| AuthError::HashingFailed(e.to_string()))?;

        Ok(hash.to_string())
    }

    /// Verify a password against a PHC-formatted hash.
    ///
    /// The algorithm, version, parameters, and salt are taken from the hash
    /// string itself, so hashes created under other parameter sets verify
    /// correctly. The comparison is constant time.
    ///
    /// Returns `Ok(true)` on a match and `Ok(false)` on a mismatch; a wrong
    /// password is not an error.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidHashFormat` when the stored hash is not a
    /// valid PHC encoding.
    pub fn verify(&self, password: &str, hash: &str) -> Result<bool, AuthError> {
        let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidHashFormat)?;

        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone());

        match argon2.verify_password(password.as_bytes(), &parsed_hash) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(_) => Ok(false),
        }
    }
}

/// Hash a password with the engine's standard parameters.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    PasswordHasher::new().hash(password)
}

/// Verify a password against an Argon2id hash.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, AuthError> {
    PasswordHasher::new().verify(password, hash)
}
