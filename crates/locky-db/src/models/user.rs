//! User entity model.

use chrono::{DateTime, Utc};
use locky_core::UserId;
use sqlx::FromRow;
use uuid::Uuid;

/// User status: may authenticate and receive tokens.
pub const STATUS_ACTIVE: &str = "active";

/// User status: authentication and token issuance are blocked.
pub const STATUS_DISABLED: &str = "disabled";

/// An end-user identity, unique by `(tenant_id, email)`.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,
    pub tenant_id: Uuid,

    /// Stored lowercase; lookups are case-insensitive.
    pub email: String,

    pub email_verified: bool,

    /// `active` or `disabled`.
    pub status: String,

    pub display_name: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl User {
    /// Get the id as a typed [`UserId`].
    #[must_use]
    pub fn user_id(&self) -> UserId {
        UserId::from_uuid(self.id)
    }

    /// Whether this user may authenticate.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == STATUS_ACTIVE
    }

    /// Insert a new active user.
    pub async fn insert<'e, E>(
        executor: E,
        tenant_id: Uuid,
        email: &str,
        display_name: Option<&str>,
    ) -> Result<Self, sqlx::Error>
    where
        E: sqlx::PgExecutor<'e>,
    {
        sqlx::query_as(
            r"
            INSERT INTO users (id, tenant_id, email, email_verified, status, display_name)
            VALUES ($1, $2, lower($3), FALSE, 'active', $4)
            RETURNING *
            ",
        )
        .bind(Uuid::new_v4())
        .bind(tenant_id)
        .bind(email)
        .bind(display_name)
        .fetch_one(executor)
        .await
    }

    /// Find a user by id within a tenant.
    pub async fn find_by_id<'e, E>(
        executor: E,
        tenant_id: Uuid,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: sqlx::PgExecutor<'e>,
    {
        sqlx::query_as("SELECT * FROM users WHERE id = $1 AND tenant_id = $2")
            .bind(id)
            .bind(tenant_id)
            .fetch_optional(executor)
            .await
    }

    /// Find a user by email within a tenant.
    pub async fn find_by_email<'e, E>(
        executor: E,
        tenant_id: Uuid,
        email: &str,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: sqlx::PgExecutor<'e>,
    {
        sqlx::query_as("SELECT * FROM users WHERE tenant_id = $1 AND email = lower($2)")
            .bind(tenant_id)
            .bind(email)
            .fetch_optional(executor)
            .await
    }

    /// Change a user's status.
    pub async fn set_status<'e, E>(
        executor: E,
        tenant_id: Uuid,
        id: Uuid,
        status: &str,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: sqlx::PgExecutor<'e>,
    {
        sqlx::query_as(
            r"
            UPDATE users
            SET status = $3, updated_at = now()
            WHERE id = $1 AND tenant_id = $2
            RETURNING *
            ",
        )
        .bind(id)
        .bind(tenant_id)
        .bind(status)
        .fetch_optional(executor)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(status: &str) -> User {
        User {
            id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            email: "alice@example.com".to_string(),
            email_verified: true,
            status: status.to_string(),
            display_name: Some("Alice".to_string()),
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    #[test]
    fn test_active_user() {
        assert!(user(STATUS_ACTIVE).is_active());
    }

    #[test]
    fn test_disabled_user() {
        assert!(!user(STATUS_DISABLED).is_active());
    }
}
