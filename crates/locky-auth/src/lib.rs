//! Cryptographic primitives for the locky identity engine.
//!
//! Everything here is pure computation: password hashing, PKCE, opaque
//! token digests, ES256 JWT handling, JWK types, keypair generation, and
//! private-key sealing. No storage, no I/O.

pub mod claims;
pub mod digest;
pub mod error;
pub mod jwks;
pub mod jwt;
pub mod keypair;
pub mod password;
pub mod pkce;

pub use claims::{AccessClaims, AccessClaimsBuilder};
pub use digest::{generate_opaque_token, token_digest};
pub use error::AuthError;
pub use jwks::{Jwk, JwkSet};
pub use jwt::{
    decode_es256, encode_es256, extract_kid, extract_tenant_unverified, ValidationConfig,
};
pub use keypair::{generate_p256_keypair, GeneratedKeypair, KeySealer};
pub use password::{hash_password, verify_password, PasswordHasher};
pub use pkce::{code_challenge, verify_code_verifier, METHOD_S256};
