//! Per-tenant signing key entity model.
//!
//! Lifecycle: `active` (signs and verifies) → `inactive` (verifies only,
//! grace window) → `retired` (dead). At most one key per tenant is active
//! at any time; rotation demotes the previous active key in the same
//! transaction that inserts its successor.

use chrono::{DateTime, Duration, Utc};
use locky_auth::Jwk;
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

/// Key status: signs new tokens and verifies existing ones.
pub const STATUS_ACTIVE: &str = "active";

/// Key status: verifies until `not_after`, never signs.
pub const STATUS_INACTIVE: &str = "inactive";

/// Key status: neither signs nor verifies.
pub const STATUS_RETIRED: &str = "retired";

/// A tenant's EC-P256 signing key.
#[derive(Debug, Clone, FromRow)]
pub struct SigningKey {
    pub id: Uuid,
    pub tenant_id: Uuid,

    /// Key identifier stamped into JWT headers. Unique per tenant.
    pub kid: String,

    /// Public half as an RFC 7517 JWK.
    pub public_jwk: Json<Jwk>,

    /// PKCS#8 private key document, AES-GCM sealed under the master key
    /// (or raw when plaintext storage was permitted).
    pub private_key_sealed: Vec<u8>,

    /// `active`, `inactive`, or `retired`.
    pub status: String,

    pub created_at: DateTime<Utc>,

    /// Start of the signing window.
    pub not_before: DateTime<Utc>,

    /// End of both the signing and verification windows.
    pub not_after: DateTime<Utc>,
}

/// Data required to persist a freshly generated key.
#[derive(Debug, Clone)]
pub struct NewSigningKey {
    pub tenant_id: Uuid,
    pub kid: String,
    pub public_jwk: Jwk,
    pub private_key_sealed: Vec<u8>,
    pub not_before: DateTime<Utc>,
    pub not_after: DateTime<Utc>,
}

impl NewSigningKey {
    /// Build a key record valid from `now` for `lifetime`.
    #[must_use]
    pub fn starting_now(
        tenant_id: Uuid,
        kid: String,
        public_jwk: Jwk,
        private_key_sealed: Vec<u8>,
        now: DateTime<Utc>,
        lifetime: Duration,
    ) -> Self {
        Self {
            tenant_id,
            kid,
            public_jwk,
            private_key_sealed,
            not_before: now,
            not_after: now + lifetime,
        }
    }
}

impl SigningKey {
    /// Usable for signing: active and inside the validity window.
    #[must_use]
    pub fn is_signing_usable(&self, now: DateTime<Utc>) -> bool {
        self.status == STATUS_ACTIVE && self.not_before <= now && now < self.not_after
    }

    /// Usable for verification: active or inactive, not yet past
    /// `not_after`.
    #[must_use]
    pub fn is_verification_usable(&self, now: DateTime<Utc>) -> bool {
        (self.status == STATUS_ACTIVE || self.status == STATUS_INACTIVE) && now < self.not_after
    }

    /// Insert a key with `status = active`.
    pub async fn insert<'e, E>(executor: E, new: NewSigningKey) -> Result<Self, sqlx::Error>
    where
        E: sqlx::PgExecutor<'e>,
    {
        sqlx::query_as(
            r"
            INSERT INTO signing_keys (
                id, tenant_id, kid, public_jwk, private_key_sealed,
                status, not_before, not_after
            )
            VALUES ($1, $2, $3, $4, $5, 'active', $6, $7)
            RETURNING *
            ",
        )
        .bind(Uuid::new_v4())
        .bind(new.tenant_id)
        .bind(&new.kid)
        .bind(Json(&new.public_jwk))
        .bind(&new.private_key_sealed)
        .bind(new.not_before)
        .bind(new.not_after)
        .fetch_one(executor)
        .await
    }

    /// The tenant's current signing key: active and within its window.
    pub async fn find_active<'e, E>(
        executor: E,
        tenant_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: sqlx::PgExecutor<'e>,
    {
        sqlx::query_as(
            r"
            SELECT * FROM signing_keys
            WHERE tenant_id = $1 AND status = 'active'
              AND not_before <= $2 AND not_after > $2
            ORDER BY created_at DESC
            LIMIT 1
            ",
        )
        .bind(tenant_id)
        .bind(now)
        .fetch_optional(executor)
        .await
    }

    /// Look up a key by `(tenant, kid)` regardless of status; callers
    /// apply the usability rules.
    pub async fn find_by_kid<'e, E>(
        executor: E,
        tenant_id: Uuid,
        kid: &str,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: sqlx::PgExecutor<'e>,
    {
        sqlx::query_as("SELECT * FROM signing_keys WHERE tenant_id = $1 AND kid = $2")
            .bind(tenant_id)
            .bind(kid)
            .fetch_optional(executor)
            .await
    }

    /// All keys the tenant currently publishes for verification
    /// (active + inactive, not past `not_after`).
    pub async fn list_verification<'e, E>(
        executor: E,
        tenant_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Vec<Self>, sqlx::Error>
    where
        E: sqlx::PgExecutor<'e>,
    {
        sqlx::query_as(
            r"
            SELECT * FROM signing_keys
            WHERE tenant_id = $1 AND status IN ('active', 'inactive') AND not_after > $2
            ORDER BY created_at DESC
            ",
        )
        .bind(tenant_id)
        .bind(now)
        .fetch_all(executor)
        .await
    }

    /// Rotate: demote the current active key(s) to `inactive` and insert
    /// the successor as `active`, in one transaction.
    pub async fn rotate(pool: &PgPool, new: NewSigningKey) -> Result<Self, sqlx::Error> {
        let mut tx = pool.begin().await?;

        sqlx::query(
            r"
            UPDATE signing_keys
            SET status = 'inactive'
            WHERE tenant_id = $1 AND status = 'active'
            ",
        )
        .bind(new.tenant_id)
        .execute(&mut *tx)
        .await?;

        let key = Self::insert(&mut *tx, new).await?;

        tx.commit().await?;
        Ok(key)
    }

    /// Retire inactive keys whose verification window has ended. Used by
    /// the sweeper.
    pub async fn retire_expired<'e, E>(
        executor: E,
        now: DateTime<Utc>,
    ) -> Result<u64, sqlx::Error>
    where
        E: sqlx::PgExecutor<'e>,
    {
        let result = sqlx::query(
            r"
            UPDATE signing_keys
            SET status = 'retired'
            WHERE status = 'inactive' AND not_after < $1
            ",
        )
        .bind(now)
        .execute(executor)
        .await?;
        Ok(result.rows_affected())
    }
}
