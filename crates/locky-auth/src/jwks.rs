//! JSON Web Key types (RFC 7517), EC P-256 only.
//!
//! The engine publishes per-tenant key sets for access-token verification;
//! it never consumes remote JWKS.

use crate::error::AuthError;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde::{Deserialize, Serialize};

/// Length of an uncompressed SEC1 P-256 point (0x04 || x || y).
const P256_POINT_LEN: usize = 65;

/// An EC public key in JWK form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Jwk {
    /// Key type; always `"EC"`.
    pub kty: String,

    /// Curve; always `"P-256"`.
    pub crv: String,

    /// Key identifier, unique per tenant.
    pub kid: String,

    /// X coordinate, base64url without padding.
    pub x: String,

    /// Y coordinate, base64url without padding.
    pub y: String,

    /// Public key use.
    #[serde(rename = "use", skip_serializing_if = "Option::is_none")]
    pub key_use: Option<String>,

    /// Signing algorithm.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alg: Option<String>,
}

impl Jwk {
    /// Build a signature JWK from an uncompressed SEC1 P-256 point.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidKey` if the point is not a 65-byte
    /// uncompressed encoding.
    pub fn from_p256_point(point: &[u8], kid: impl Into<String>) -> Result<Self, AuthError> {
        if point.len() != P256_POINT_LEN || point[0] != 0x04 {
            return Err(AuthError::InvalidKey(format!(
                "expected uncompressed P-256 point of {P256_POINT_LEN} bytes, got {}",
                point.len()
            )));
        }

        Ok(Self {
            kty: "EC".to_string(),
            crv: "P-256".to_string(),
            kid: kid.into(),
            x: URL_SAFE_NO_PAD.encode(&point[1..33]),
            y: URL_SAFE_NO_PAD.encode(&point[33..65]),
            key_use: Some("sig".to_string()),
            alg: Some("ES256".to_string()),
        })
    }
}

/// A JSON Web Key Set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JwkSet {
    /// The published keys.
    pub keys: Vec<Jwk>,
}

impl JwkSet {
    /// Find a key by its kid.
    #[must_use]
    pub fn find_key(&self, kid: &str) -> Option<&Jwk> {
        self.keys.iter().find(|k| k.kid == kid)
    }
}
