//! Per-tenant signing key lifecycle and lookup.
//!
//! Signing always uses the tenant's single active key. Verification keys
//! are served through an in-memory cache keyed `(tenant, kid)`; entries
//! remember the key's `not_after` so a cached key can never outlive its
//! verification window, and the cache TTL bounds how long a retirement
//! can go unnoticed.

use crate::error::OAuthError;
use chrono::{DateTime, Duration, Utc};
use locky_auth::{generate_p256_keypair, AccessClaims, Jwk, JwkSet, KeySealer};
use locky_core::{ConfigError, EngineConfig, SharedClock};
use locky_db::{NewSigningKey, SigningKey};
use moka::future::Cache;
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

/// How long a verification key may be served from cache.
const CACHE_TTL_SECS: u64 = 300;

/// Upper bound on cached verification keys across all tenants.
const CACHE_CAPACITY: u64 = 10_000;

struct CachedKey {
    jwk: Jwk,
    not_after: DateTime<Utc>,
}

/// Manages per-tenant EC-P256 signing keys.
pub struct KeyService {
    pool: PgPool,
    sealer: KeySealer,
    key_lifetime: Duration,
    clock: SharedClock,
    cache: Cache<(Uuid, String), Arc<CachedKey>>,
}

impl KeyService {
    /// Create the key service.
    ///
    /// # Errors
    ///
    /// Fails when the configuration is unsound: in particular when no
    /// master key is present and plaintext key storage was not explicitly
    /// permitted.
    pub fn new(
        pool: PgPool,
        config: &EngineConfig,
        clock: SharedClock,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let sealer = KeySealer::new(config.master_key.as_deref()).map_err(|_| {
            ConfigError::MasterKeyLength(config.master_key.as_ref().map_or(0, Vec::len))
        })?;

        Ok(Self {
            pool,
            sealer,
            key_lifetime: config.signing_key_lifetime,
            clock,
            cache: Cache::builder()
                .time_to_live(std::time::Duration::from_secs(CACHE_TTL_SECS))
                .max_capacity(CACHE_CAPACITY)
                .build(),
        })
    }

    /// Provision the first signing key for a tenant. Called on tenant
    /// creation.
    pub async fn provision(&self, tenant_id: Uuid) -> Result<SigningKey, OAuthError> {
        let key = self.generate_record(tenant_id)?;
        let stored = SigningKey::insert(&self.pool, key).await?;
        tracing::info!(tenant_id = %tenant_id, kid = %stored.kid, "provisioned signing key");
        Ok(stored)
    }

    /// Rotate the tenant's signing key: the new key becomes active, the
    /// previous active key drops to inactive (it keeps verifying until
    /// its `not_after`).
    pub async fn rotate(&self, tenant_id: Uuid) -> Result<SigningKey, OAuthError> {
        let key = self.generate_record(tenant_id)?;
        let stored = SigningKey::rotate(&self.pool, key).await?;
        tracing::info!(tenant_id = %tenant_id, kid = %stored.kid, "rotated signing key");
        Ok(stored)
    }

    fn generate_record(&self, tenant_id: Uuid) -> Result<NewSigningKey, OAuthError> {
        let keypair = generate_p256_keypair()?;
        let sealed = self.sealer.seal(&keypair.pkcs8_der)?;
        Ok(NewSigningKey::starting_now(
            tenant_id,
            keypair.kid,
            keypair.jwk,
            sealed,
            self.clock.now(),
            self.key_lifetime,
        ))
    }

    /// Sign access-token claims with the tenant's active key.
    ///
    /// The ES256 signature is computed on a blocking thread; the unsealed
    /// private key never leaves that closure.
    pub async fn sign_claims(
        &self,
        tenant_id: Uuid,
        claims: &AccessClaims,
    ) -> Result<String, OAuthError> {
        let now = self.clock.now();
        let key = SigningKey::find_active(&self.pool, tenant_id, now)
            .await?
            .filter(|k| k.is_signing_usable(now))
            .ok_or(OAuthError::SigningKeyUnavailable)?;

        let pkcs8_der = self.sealer.open(&key.private_key_sealed)?;
        let kid = key.kid;
        let claims = claims.clone();

        let token = tokio::task::spawn_blocking(move || {
            locky_auth::encode_es256(&claims, &pkcs8_der, &kid)
        })
        .await
        .map_err(|e| OAuthError::Internal(format!("signing task failed: {e}")))??;

        Ok(token)
    }

    /// Fetch the JWK for `(tenant, kid)` if the key is currently usable
    /// for verification.
    pub async fn verification_jwk(
        &self,
        tenant_id: Uuid,
        kid: &str,
    ) -> Result<Jwk, OAuthError> {
        let now = self.clock.now();
        let cache_key = (tenant_id, kid.to_string());

        if let Some(cached) = self.cache.get(&cache_key).await {
            if now < cached.not_after {
                return Ok(cached.jwk.clone());
            }
            self.cache.invalidate(&cache_key).await;
            return Err(OAuthError::SigningKeyUnavailable);
        }

        let key = SigningKey::find_by_kid(&self.pool, tenant_id, kid)
            .await?
            .filter(|k| k.is_verification_usable(now))
            .ok_or(OAuthError::SigningKeyUnavailable)?;

        let jwk = key.public_jwk.0.clone();
        self.cache
            .insert(
                cache_key,
                Arc::new(CachedKey {
                    jwk: jwk.clone(),
                    not_after: key.not_after,
                }),
            )
            .await;

        Ok(jwk)
    }

    /// The tenant's published key set: all keys still usable for
    /// verification.
    pub async fn jwks(&self, tenant_id: Uuid) -> Result<JwkSet, OAuthError> {
        let keys = SigningKey::list_verification(&self.pool, tenant_id, self.clock.now()).await?;
        Ok(JwkSet {
            keys: keys.into_iter().map(|k| k.public_jwk.0).collect(),
        })
    }
}

impl std::fmt::Debug for KeyService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyService")
            .field("key_lifetime", &self.key_lifetime)
            .field("sealing", &self.sealer.is_sealing())
            .finish()
    }
}
