//! Browser session entity model.
//!
//! Sessions are server-side login records. Validity is bounded by an
//! absolute lifetime from `created_at`; `last_seen_at` slides forward on
//! each validation but does not extend the lifetime.

use chrono::{DateTime, Duration, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// A server-side browser session bound to `(tenant, user)`.
#[derive(Debug, Clone, FromRow)]
pub struct Session {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub user_id: Uuid,

    /// The client that initiated the login, when known.
    pub client_id: Option<Uuid>,

    /// Remote address observed at login.
    pub ip: String,

    /// User agent observed at login.
    pub user_agent: String,

    pub created_at: DateTime<Utc>,

    /// Advanced on every successful validation.
    pub last_seen_at: DateTime<Utc>,

    /// Terminal. A revoked session never validates again.
    pub revoked_at: Option<DateTime<Utc>>,
}

/// Data required to create a session.
#[derive(Debug, Clone)]
pub struct NewSession {
    pub tenant_id: Uuid,
    pub user_id: Uuid,
    pub client_id: Option<Uuid>,
    pub ip: String,
    pub user_agent: String,
    pub created_at: DateTime<Utc>,
}

impl Session {
    /// Whether the session is expired at `now` for the given absolute
    /// lifetime. The boundary instant itself is expired.
    #[must_use]
    pub fn is_expired(&self, ttl: Duration, now: DateTime<Utc>) -> bool {
        now >= self.created_at + ttl
    }

    /// Whether the session has been revoked.
    #[must_use]
    pub fn is_revoked(&self) -> bool {
        self.revoked_at.is_some()
    }

    /// Insert a new session with `last_seen_at = created_at`.
    pub async fn insert<'e, E>(executor: E, new: NewSession) -> Result<Self, sqlx::Error>
    where
        E: sqlx::PgExecutor<'e>,
    {
        sqlx::query_as(
            r"
            INSERT INTO sessions (
                id, tenant_id, user_id, client_id, ip, user_agent,
                created_at, last_seen_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $7)
            RETURNING *
            ",
        )
        .bind(Uuid::new_v4())
        .bind(new.tenant_id)
        .bind(new.user_id)
        .bind(new.client_id)
        .bind(&new.ip)
        .bind(&new.user_agent)
        .bind(new.created_at)
        .fetch_one(executor)
        .await
    }

    /// Fetch a session scoped by tenant.
    pub async fn find_by_id<'e, E>(
        executor: E,
        tenant_id: Uuid,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: sqlx::PgExecutor<'e>,
    {
        sqlx::query_as("SELECT * FROM sessions WHERE id = $1 AND tenant_id = $2")
            .bind(id)
            .bind(tenant_id)
            .fetch_optional(executor)
            .await
    }

    /// Advance `last_seen_at`. Monotone: concurrent validations may race
    /// freely, the column only moves forward.
    pub async fn touch<'e, E>(
        executor: E,
        tenant_id: Uuid,
        id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<u64, sqlx::Error>
    where
        E: sqlx::PgExecutor<'e>,
    {
        let result = sqlx::query(
            r"
            UPDATE sessions
            SET last_seen_at = $3
            WHERE id = $1 AND tenant_id = $2 AND last_seen_at < $3
            ",
        )
        .bind(id)
        .bind(tenant_id)
        .bind(at)
        .execute(executor)
        .await?;
        Ok(result.rows_affected())
    }

    /// Revoke a session. Idempotent: already-revoked sessions keep their
    /// original `revoked_at`.
    pub async fn revoke<'e, E>(
        executor: E,
        tenant_id: Uuid,
        id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<u64, sqlx::Error>
    where
        E: sqlx::PgExecutor<'e>,
    {
        let result = sqlx::query(
            r"
            UPDATE sessions
            SET revoked_at = $3
            WHERE id = $1 AND tenant_id = $2 AND revoked_at IS NULL
            ",
        )
        .bind(id)
        .bind(tenant_id)
        .bind(at)
        .execute(executor)
        .await?;
        Ok(result.rows_affected())
    }

    /// Delete revoked sessions and sessions created before `cutoff`
    /// (i.e. past their absolute lifetime). Used by the sweeper.
    pub async fn delete_spent<'e, E>(
        executor: E,
        cutoff: DateTime<Utc>,
    ) -> Result<u64, sqlx::Error>
    where
        E: sqlx::PgExecutor<'e>,
    {
        let result =
            sqlx::query("DELETE FROM sessions WHERE revoked_at IS NOT NULL OR created_at < $1")
                .bind(cutoff)
                .execute(executor)
                .await?;
        Ok(result.rows_affected())
    }
}
