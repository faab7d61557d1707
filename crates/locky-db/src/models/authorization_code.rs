//! Authorization code entity model.
//!
//! Codes are single-use: consumption atomically stamps `used_at` inside a
//! transaction holding a row lock, so at most one of any number of
//! concurrent consumers succeeds. The plaintext code is never stored; rows
//! are keyed by its SHA-256 digest.

use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use thiserror::Error;
use uuid::Uuid;

/// Why a code could not be consumed.
#[derive(Debug, Error)]
pub enum CodeConsumeError {
    /// No code with this digest exists for the tenant.
    #[error("authorization code not found")]
    NotFound,

    /// The code was already exchanged once.
    #[error("authorization code already used")]
    AlreadyUsed,

    /// The code's validity window has passed.
    #[error("authorization code expired")]
    Expired,

    /// The storage layer failed.
    #[error("storage failure: {0}")]
    Storage(#[from] sqlx::Error),
}

/// A single-use credential binding an authorization grant to a client,
/// user, redirect URI, and PKCE challenge.
#[derive(Debug, Clone, FromRow)]
pub struct AuthorizationCode {
    /// `base64url(SHA-256(code))`; primary key.
    pub code_hash: String,

    pub tenant_id: Uuid,

    /// Internal id of the client the code was issued to.
    pub client_id: Uuid,

    /// The user who authorized the request.
    pub user_id: Uuid,

    /// Must match the token request exactly.
    pub redirect_uri: String,

    /// PKCE S256 challenge from the authorization request.
    pub pkce_challenge: String,

    /// Always `S256`.
    pub pkce_method: String,

    /// Granted scopes, space separated.
    pub scope: String,

    pub expires_at: DateTime<Utc>,

    /// Set exactly once, by consumption.
    pub used_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
}

/// Data required to persist a new code.
#[derive(Debug, Clone)]
pub struct NewAuthorizationCode {
    pub code_hash: String,
    pub tenant_id: Uuid,
    pub client_id: Uuid,
    pub user_id: Uuid,
    pub redirect_uri: String,
    pub pkce_challenge: String,
    pub pkce_method: String,
    pub scope: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl AuthorizationCode {
    /// Whether the code is expired at `now`. The boundary instant itself
    /// is expired.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Whether the code has been consumed.
    #[must_use]
    pub fn is_used(&self) -> bool {
        self.used_at.is_some()
    }

    /// Insert a new unused code.
    pub async fn insert<'e, E>(executor: E, new: NewAuthorizationCode) -> Result<Self, sqlx::Error>
    where
        E: sqlx::PgExecutor<'e>,
    {
        sqlx::query_as(
            r"
            INSERT INTO authorization_codes (
                code_hash, tenant_id, client_id, user_id, redirect_uri,
                pkce_challenge, pkce_method, scope, created_at, expires_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING *
            ",
        )
        .bind(&new.code_hash)
        .bind(new.tenant_id)
        .bind(new.client_id)
        .bind(new.user_id)
        .bind(&new.redirect_uri)
        .bind(&new.pkce_challenge)
        .bind(&new.pkce_method)
        .bind(&new.scope)
        .bind(new.created_at)
        .bind(new.expires_at)
        .fetch_one(executor)
        .await
    }

    /// Atomically consume a code: fetch under a row lock, validate state,
    /// stamp `used_at`.
    ///
    /// The update carries a `used_at IS NULL` predicate on top of the
    /// lock, so two concurrent consumers can never both succeed.
    pub async fn get_and_consume(
        pool: &PgPool,
        tenant_id: Uuid,
        code_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Self, CodeConsumeError> {
        let mut tx = pool.begin().await?;

        let code: Option<Self> = sqlx::query_as(
            r"
            SELECT * FROM authorization_codes
            WHERE code_hash = $1 AND tenant_id = $2
            FOR UPDATE
            ",
        )
        .bind(code_hash)
        .bind(tenant_id)
        .fetch_optional(&mut *tx)
        .await?;

        let mut code = code.ok_or(CodeConsumeError::NotFound)?;

        if code.is_used() {
            return Err(CodeConsumeError::AlreadyUsed);
        }
        if code.is_expired(now) {
            return Err(CodeConsumeError::Expired);
        }

        let updated = sqlx::query(
            r"
            UPDATE authorization_codes
            SET used_at = $3
            WHERE code_hash = $1 AND tenant_id = $2 AND used_at IS NULL
            ",
        )
        .bind(code_hash)
        .bind(tenant_id)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() != 1 {
            return Err(CodeConsumeError::AlreadyUsed);
        }

        tx.commit().await?;

        code.used_at = Some(now);
        Ok(code)
    }

    /// Delete consumed and expired codes. Used by the sweeper.
    pub async fn delete_spent<'e, E>(executor: E, now: DateTime<Utc>) -> Result<u64, sqlx::Error>
    where
        E: sqlx::PgExecutor<'e>,
    {
        let result = sqlx::query(
            "DELETE FROM authorization_codes WHERE used_at IS NOT NULL OR expires_at < $1",
        )
        .bind(now)
        .execute(executor)
        .await?;
        Ok(result.rows_affected())
    }
}
