//! Signing keypair generation and private-key sealing.
//!
//! Keypairs are EC P-256; the private key is a PKCS#8 document sealed with
//! AES-256-GCM under the process master key before it touches storage. When
//! no master key is configured (development only, opt-in), the document is
//! stored as-is.

use crate::error::AuthError;
use crate::jwks::Jwk;
use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use rand::rngs::OsRng;
use rand::RngCore;
use uuid::Uuid;

/// AES-GCM nonce length in bytes.
const NONCE_LEN: usize = 12;

/// A freshly generated signing keypair.
#[derive(Debug, Clone)]
pub struct GeneratedKeypair {
    /// Key identifier, stamped into JWT headers and the published JWK.
    pub kid: String,

    /// The private key as a PKCS#8 DER document, unsealed.
    pub pkcs8_der: Vec<u8>,

    /// The public half as an RFC 7517 JWK.
    pub jwk: Jwk,
}

/// Generate an EC P-256 keypair with a random kid.
///
/// # Errors
///
/// Returns `AuthError::KeyGenerationFailed` if the underlying generator
/// fails, or `AuthError::InvalidKey` if the produced public key is not an
/// uncompressed P-256 point.
pub fn generate_p256_keypair() -> Result<GeneratedKeypair, AuthError> {
    let key_pair = rcgen::KeyPair::generate_for(&rcgen::PKCS_ECDSA_P256_SHA256)
        .map_err(|e| AuthError::KeyGenerationFailed(e.to_string()))?;

    let kid = Uuid::new_v4().to_string();
    let jwk = Jwk::from_p256_point(key_pair.public_key_raw(), &kid)?;

    Ok(GeneratedKeypair {
        kid,
        pkcs8_der: key_pair.serialize_der(),
        jwk,
    })
}

/// Seals and unseals private-key material under the process master key.
///
/// The sealed form is `nonce || ciphertext` with a random 96-bit nonce per
/// sealing. With no master key configured, seal and open are the identity
/// function.
pub struct KeySealer {
    cipher: Option<Aes256Gcm>,
}

impl KeySealer {
    /// Create a sealer.
    ///
    /// Pass `None` only when plaintext key storage has been explicitly
    /// permitted in configuration.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidKey` when the key is not 32 bytes.
    pub fn new(master_key: Option<&[u8]>) -> Result<Self, AuthError> {
        let cipher = match master_key {
            Some(key) => Some(
                Aes256Gcm::new_from_slice(key)
                    .map_err(|_| AuthError::InvalidKey("master key must be 32 bytes".to_string()))?,
            ),
            None => None,
        };
        Ok(Self { cipher })
    }

    /// Whether sealing actually encrypts.
    #[must_use]
    pub fn is_sealing(&self) -> bool {
        self.cipher.is_some()
    }

    /// Seal a private-key document.
    pub fn seal(&self, plaintext: &[u8]) -> Result<Vec<u8>, AuthError> {
        let Some(cipher) = &self.cipher else {
            return Ok(plaintext.to_vec());
        };

        let mut nonce_bytes = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = cipher
            .encrypt(nonce, plaintext)
            .map_err(|e| AuthError::SealFailed(e.to_string()))?;

        let mut sealed = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        sealed.extend_from_slice(&nonce_bytes);
        sealed.extend_from_slice(&ciphertext);
        Ok(sealed)
    }

    /// Unseal a private-key document.
    pub fn open(&self, sealed: &[u8]) -> Result<Vec<u8>, AuthError> {
        let Some(cipher) = &self.cipher else {
            return Ok(sealed.to_vec());
        };

        if sealed.len() <= NONCE_LEN {
            return Err(AuthError::OpenFailed("sealed data too short".to_string()));
        }

        let (nonce_bytes, ciphertext) = sealed.split_at(NONCE_LEN);
        cipher
            .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
            .map_err(|e| AuthError::OpenFailed(e.to_string()))
    }
}

impl std::fmt::Debug for KeySealer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeySealer")
            .field("sealing", &self.is_sealing())
            .finish()
    }
}
