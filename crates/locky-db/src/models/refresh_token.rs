//! Refresh token entity model with rotation chains.
//!
//! Tokens are stored by digest and linked into a chain through
//! `rotated_from_hash`. Rotation revokes the presented token and inserts
//! its successor in one transaction. Presenting an already-revoked token
//! is replay: every descendant of the presented token is revoked and the
//! caller gets [`RefreshRotateError::Replayed`].

use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use thiserror::Error;
use uuid::Uuid;

/// Why a token could not be rotated.
#[derive(Debug, Error)]
pub enum RefreshRotateError {
    /// No token with this digest exists for the tenant.
    #[error("refresh token not found")]
    NotFound,

    /// The token was already rotated or revoked; its descendant chain has
    /// been revoked in response.
    #[error("refresh token replayed")]
    Replayed,

    /// The token's validity window has passed.
    #[error("refresh token expired")]
    Expired,

    /// The storage layer failed.
    #[error("storage failure: {0}")]
    Storage(#[from] sqlx::Error),
}

/// A long-lived opaque credential, stored hashed, rotated on every use.
#[derive(Debug, Clone, FromRow)]
pub struct RefreshToken {
    /// `base64url(SHA-256(token))`; primary key.
    pub token_hash: String,

    pub tenant_id: Uuid,

    /// Internal id of the client the token was issued to.
    pub client_id: Uuid,

    pub user_id: Uuid,

    /// Granted scopes, space separated.
    pub scope: String,

    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,

    /// Terminal. Set by rotation, explicit revocation, or replay
    /// response.
    pub revoked_at: Option<DateTime<Utc>>,

    /// Digest of the token this one replaced, forming the rotation chain.
    pub rotated_from_hash: Option<String>,
}

/// Data required to persist a new token.
#[derive(Debug, Clone)]
pub struct NewRefreshToken {
    pub token_hash: String,
    pub tenant_id: Uuid,
    pub client_id: Uuid,
    pub user_id: Uuid,
    pub scope: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// The successor row inserted by a rotation. Subject, client, and scope
/// are copied from the presented token inside the transaction.
#[derive(Debug, Clone)]
pub struct SuccessorToken {
    pub token_hash: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl RefreshToken {
    /// Whether the token is expired at `now`. The boundary instant itself
    /// is expired.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Whether the token has been revoked (including by rotation).
    #[must_use]
    pub fn is_revoked(&self) -> bool {
        self.revoked_at.is_some()
    }

    /// The granted scopes as a vector.
    #[must_use]
    pub fn scopes(&self) -> Vec<&str> {
        self.scope.split_whitespace().collect()
    }

    /// Insert a new chain head (no predecessor).
    pub async fn insert<'e, E>(executor: E, new: NewRefreshToken) -> Result<Self, sqlx::Error>
    where
        E: sqlx::PgExecutor<'e>,
    {
        sqlx::query_as(
            r"
            INSERT INTO refresh_tokens (
                token_hash, tenant_id, client_id, user_id, scope,
                created_at, expires_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            ",
        )
        .bind(&new.token_hash)
        .bind(new.tenant_id)
        .bind(new.client_id)
        .bind(new.user_id)
        .bind(&new.scope)
        .bind(new.created_at)
        .bind(new.expires_at)
        .fetch_one(executor)
        .await
    }

    /// Fetch a token by digest, scoped by tenant.
    pub async fn find_by_hash<'e, E>(
        executor: E,
        tenant_id: Uuid,
        token_hash: &str,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: sqlx::PgExecutor<'e>,
    {
        sqlx::query_as("SELECT * FROM refresh_tokens WHERE token_hash = $1 AND tenant_id = $2")
            .bind(token_hash)
            .bind(tenant_id)
            .fetch_optional(executor)
            .await
    }

    /// Revoke a token. Idempotent; returns the number of rows that
    /// actually transitioned.
    pub async fn revoke<'e, E>(
        executor: E,
        tenant_id: Uuid,
        token_hash: &str,
        at: DateTime<Utc>,
    ) -> Result<u64, sqlx::Error>
    where
        E: sqlx::PgExecutor<'e>,
    {
        let result = sqlx::query(
            r"
            UPDATE refresh_tokens
            SET revoked_at = $3
            WHERE token_hash = $1 AND tenant_id = $2 AND revoked_at IS NULL
            ",
        )
        .bind(token_hash)
        .bind(tenant_id)
        .bind(at)
        .execute(executor)
        .await?;
        Ok(result.rows_affected())
    }

    /// Revoke every descendant of `from_hash`, following
    /// `rotated_from_hash` links forward through the chain.
    pub async fn revoke_descendants<'e, E>(
        executor: E,
        tenant_id: Uuid,
        from_hash: &str,
        at: DateTime<Utc>,
    ) -> Result<u64, sqlx::Error>
    where
        E: sqlx::PgExecutor<'e>,
    {
        let result = sqlx::query(
            r"
            WITH RECURSIVE chain AS (
                SELECT token_hash FROM refresh_tokens
                WHERE tenant_id = $1 AND rotated_from_hash = $2
                UNION ALL
                SELECT rt.token_hash FROM refresh_tokens rt
                JOIN chain c ON rt.rotated_from_hash = c.token_hash
                WHERE rt.tenant_id = $1
            )
            UPDATE refresh_tokens
            SET revoked_at = $3
            WHERE tenant_id = $1
              AND revoked_at IS NULL
              AND token_hash IN (SELECT token_hash FROM chain)
            ",
        )
        .bind(tenant_id)
        .bind(from_hash)
        .bind(at)
        .execute(executor)
        .await?;
        Ok(result.rows_affected())
    }

    /// Rotate a token: revoke the presented row and insert its successor
    /// in one transaction. Either both mutations persist or neither does.
    ///
    /// The presented token must belong to `client_id`; a mismatch reads
    /// as `NotFound` before anything is mutated.
    ///
    /// Returns the presented (now revoked) row so the caller can reissue
    /// for the same `(user, client, scope)`.
    ///
    /// Replay handling: when the presented token is already revoked, its
    /// descendant chain is revoked (that cascade commits) and the call
    /// fails with [`RefreshRotateError::Replayed`].
    pub async fn rotate(
        pool: &PgPool,
        tenant_id: Uuid,
        client_id: Uuid,
        old_hash: &str,
        successor: SuccessorToken,
        now: DateTime<Utc>,
    ) -> Result<Self, RefreshRotateError> {
        let mut tx = pool.begin().await?;

        let old: Option<Self> = sqlx::query_as(
            r"
            SELECT * FROM refresh_tokens
            WHERE token_hash = $1 AND tenant_id = $2
            FOR UPDATE
            ",
        )
        .bind(old_hash)
        .bind(tenant_id)
        .fetch_optional(&mut *tx)
        .await?;

        let mut old = old.ok_or(RefreshRotateError::NotFound)?;

        if old.client_id != client_id {
            tracing::warn!(
                tenant_id = %tenant_id,
                "refresh token presented by a different client"
            );
            return Err(RefreshRotateError::NotFound);
        }

        if old.is_revoked() {
            // Replay: the chain is burned. The cascade must survive the
            // failed rotation, so it commits before the error returns.
            let revoked = Self::revoke_descendants(&mut *tx, tenant_id, old_hash, now).await?;
            tx.commit().await?;
            tracing::warn!(
                tenant_id = %tenant_id,
                descendants_revoked = revoked,
                "refresh token replay detected; descendant chain revoked"
            );
            return Err(RefreshRotateError::Replayed);
        }

        if old.is_expired(now) {
            return Err(RefreshRotateError::Expired);
        }

        let updated = sqlx::query(
            r"
            UPDATE refresh_tokens
            SET revoked_at = $3
            WHERE token_hash = $1 AND tenant_id = $2 AND revoked_at IS NULL
            ",
        )
        .bind(old_hash)
        .bind(tenant_id)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() != 1 {
            return Err(RefreshRotateError::Replayed);
        }

        sqlx::query(
            r"
            INSERT INTO refresh_tokens (
                token_hash, tenant_id, client_id, user_id, scope,
                created_at, expires_at, rotated_from_hash
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ",
        )
        .bind(&successor.token_hash)
        .bind(tenant_id)
        .bind(old.client_id)
        .bind(old.user_id)
        .bind(&old.scope)
        .bind(successor.created_at)
        .bind(successor.expires_at)
        .bind(old_hash)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        old.revoked_at = Some(now);
        Ok(old)
    }

    /// Delete revoked and expired tokens. Used by the sweeper.
    pub async fn delete_spent<'e, E>(executor: E, now: DateTime<Utc>) -> Result<u64, sqlx::Error>
    where
        E: sqlx::PgExecutor<'e>,
    {
        let result = sqlx::query(
            "DELETE FROM refresh_tokens WHERE revoked_at IS NOT NULL OR expires_at < $1",
        )
        .bind(now)
        .execute(executor)
        .await?;
        Ok(result.rows_affected())
    }
}
