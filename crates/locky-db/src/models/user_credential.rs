//! Password record storage.
//!
//! One row per user holding the PHC-encoded Argon2id hash. The hash never
//! leaves the engine.

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// A user's password credential.
#[derive(Debug, Clone, FromRow)]
pub struct UserCredential {
    /// The owning user; primary key.
    pub user_id: Uuid,

    /// PHC-encoded Argon2id hash with parameters embedded.
    pub encoded_hash: String,

    pub updated_at: DateTime<Utc>,
}

impl UserCredential {
    /// Set or replace a user's password hash.
    pub async fn upsert<'e, E>(
        executor: E,
        user_id: Uuid,
        encoded_hash: &str,
    ) -> Result<Self, sqlx::Error>
    where
        E: sqlx::PgExecutor<'e>,
    {
        sqlx::query_as(
            r"
            INSERT INTO user_credentials (user_id, encoded_hash, updated_at)
            VALUES ($1, $2, now())
            ON CONFLICT (user_id)
            DO UPDATE SET encoded_hash = EXCLUDED.encoded_hash, updated_at = now()
            RETURNING *
            ",
        )
        .bind(user_id)
        .bind(encoded_hash)
        .fetch_one(executor)
        .await
    }

    /// Fetch a user's credential, if one has been set.
    pub async fn find_by_user<'e, E>(
        executor: E,
        user_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: sqlx::PgExecutor<'e>,
    {
        sqlx::query_as("SELECT * FROM user_credentials WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(executor)
            .await
    }
}
