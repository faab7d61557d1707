//! JWT encoding and verification with ES256.
//!
//! Tokens are signed with a tenant's active P-256 key and carry the key's
//! `kid` in the header so verifiers can select the right public key from
//! the tenant's JWKS.

use crate::claims::AccessClaims;
use crate::error::AuthError;
use crate::jwks::Jwk;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use jsonwebtoken::{
    decode, encode, Algorithm, DecodingKey, EncodingKey, Header, TokenData, Validation,
};
use uuid::Uuid;

/// Validation knobs for token verification.
#[derive(Debug, Clone)]
pub struct ValidationConfig {
    /// Clock-skew tolerance in seconds for `exp`/`nbf`.
    pub leeway: u64,
    /// Expected issuer; tokens from other issuers are rejected when set.
    pub issuer: Option<String>,
    /// Expected audience; unchecked when unset.
    pub audience: Option<String>,
    /// Whether to enforce expiration.
    pub validate_exp: bool,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            leeway: 60,
            issuer: None,
            audience: None,
            validate_exp: true,
        }
    }
}

impl ValidationConfig {
    /// Set the expected issuer.
    #[must_use]
    pub fn issuer(mut self, iss: impl Into<String>) -> Self {
        self.issuer = Some(iss.into());
        self
    }

    /// Set the expected audience.
    #[must_use]
    pub fn audience(mut self, aud: impl Into<String>) -> Self {
        self.audience = Some(aud.into());
        self
    }

    /// Disable expiration validation. Tests only.
    #[must_use]
    pub fn skip_exp_validation(mut self) -> Self {
        self.validate_exp = false;
        self
    }
}

/// Sign claims with an ES256 private key, stamping `kid` into the header.
///
/// # Arguments
///
/// * `claims` - The access-token claims
/// * `pkcs8_der` - The private key as an unsealed PKCS#8 DER document
/// * `kid` - Key identifier for the header
///
/// # Errors
///
/// Returns `AuthError::InvalidKey` for a malformed private key and
/// `AuthError::InvalidToken` when encoding fails.
pub fn encode_es256(claims: &AccessClaims, pkcs8_der: &[u8], kid: &str) -> Result<String, AuthError> {
    let key = EncodingKey::from_ec_der(pkcs8_der);

    let mut header = Header::new(Algorithm::ES256);
    header.kid = Some(kid.to_string());

    encode(&header, claims, &key).map_err(|e| AuthError::InvalidToken(format!("encoding failed: {e}")))
}

/// Verify a token against an EC public key taken from a JWK.
///
/// Only ES256 is accepted; `exp` and `nbf` are enforced (with leeway) along
/// with any issuer/audience expectations in `config`.
///
/// # Errors
///
/// - `AuthError::TokenExpired` - `exp` is in the past
/// - `AuthError::TokenNotYetValid` - `nbf` is in the future
/// - `AuthError::InvalidSignature` - signature check failed
/// - `AuthError::InvalidAlgorithm` - token alg is not ES256
/// - `AuthError::InvalidToken` - structural failure
pub fn decode_es256(
    token: &str,
    jwk: &Jwk,
    config: &ValidationConfig,
) -> Result<AccessClaims, AuthError> {
    let key = DecodingKey::from_ec_components(&jwk.x, &jwk.y)
        .map_err(|e| AuthError::InvalidKey(format!("invalid public key: {e}")))?;

    let mut validation = Validation::new(Algorithm::ES256);
    validation.leeway = config.leeway;
    validation.validate_exp = config.validate_exp;
    validation.validate_nbf = true;
    validation.algorithms = vec![Algorithm::ES256];

    if let Some(ref iss) = config.issuer {
        validation.set_issuer(&[iss]);
    }

    if let Some(ref aud) = config.audience {
        validation.set_audience(&[aud]);
    } else {
        validation.validate_aud = false;
    }

    let token_data: TokenData<AccessClaims> = decode(token, &key, &validation).map_err(map_jwt_error)?;

    Ok(token_data.claims)
}

/// Read the `kid` from a token header without verifying anything.
pub fn extract_kid(token: &str) -> Result<Option<String>, AuthError> {
    let header = jsonwebtoken::decode_header(token)
        .map_err(|e| AuthError::InvalidToken(format!("invalid token header: {e}")))?;
    Ok(header.kid)
}

/// Read the `tid` claim from a token payload WITHOUT verifying the
/// signature.
///
/// Used only to select the tenant whose key set will perform the real
/// verification; nothing else may be trusted from the unverified payload.
pub fn extract_tenant_unverified(token: &str) -> Result<Uuid, AuthError> {
    let payload = token
        .split('.')
        .nth(1)
        .ok_or_else(|| AuthError::InvalidToken("token is not a compact JWT".to_string()))?;

    let bytes = URL_SAFE_NO_PAD
        .decode(payload)
        .map_err(|e| AuthError::InvalidToken(format!("invalid payload encoding: {e}")))?;

    let value: serde_json::Value = serde_json::from_slice(&bytes)
        .map_err(|e| AuthError::InvalidToken(format!("invalid payload JSON: {e}")))?;

    let tid = value
        .get("tid")
        .and_then(|v| v.as_str())
        .ok_or_else(|| AuthError::MissingClaim("tid".to_string()))?;

    Uuid::parse_str(tid).map_err(|_| AuthError::MissingClaim("tid".to_string()))
}

fn map_jwt_error(err: jsonwebtoken::errors::Error) -> AuthError {
    use jsonwebtoken::errors::ErrorKind;

    match err.kind() {
        ErrorKind::ExpiredSignature => AuthError::TokenExpired,
        ErrorKind::ImmatureSignature => AuthError::TokenNotYetValid,
        ErrorKind::InvalidSignature => AuthError::InvalidSignature,
        ErrorKind::InvalidAlgorithm | ErrorKind::InvalidAlgorithmName => AuthError::InvalidAlgorithm,
        ErrorKind::InvalidIssuer => AuthError::InvalidToken("issuer mismatch".to_string()),
        ErrorKind::InvalidAudience => AuthError::InvalidToken("audience mismatch".to_string()),
        _ => AuthError::InvalidToken(err.to_string()),
    }
}
