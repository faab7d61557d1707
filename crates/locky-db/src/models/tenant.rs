//! Tenant entity model.

use chrono::{DateTime, Utc};
use locky_core::TenantId;
use sqlx::FromRow;
use uuid::Uuid;

/// Tenant status: operations proceed normally.
pub const STATUS_ACTIVE: &str = "active";

/// Tenant status: every engine operation for the tenant fails closed.
pub const STATUS_SUSPENDED: &str = "suspended";

/// An isolation unit. Every other entity carries this tenant's id and
/// every query filters by it.
#[derive(Debug, Clone, FromRow)]
pub struct Tenant {
    /// Internal unique identifier. Immutable.
    pub id: Uuid,

    /// URL-safe short name, globally unique. Resolves as
    /// `<slug>.<base_domain>`.
    pub slug: String,

    /// Human-readable display name.
    pub name: String,

    /// `active` or `suspended`.
    pub status: String,

    /// When the tenant was created.
    pub created_at: DateTime<Utc>,
}

impl Tenant {
    /// Get the id as a typed [`TenantId`].
    #[must_use]
    pub fn tenant_id(&self) -> TenantId {
        TenantId::from_uuid(self.id)
    }

    /// Whether engine operations may proceed for this tenant.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == STATUS_ACTIVE
    }

    /// Whether the tenant is suspended and must fail closed.
    #[must_use]
    pub fn is_suspended(&self) -> bool {
        self.status == STATUS_SUSPENDED
    }

    /// Insert a new active tenant.
    pub async fn insert<'e, E>(executor: E, slug: &str, name: &str) -> Result<Self, sqlx::Error>
    where
        E: sqlx::PgExecutor<'e>,
    {
        sqlx::query_as(
            r"
            INSERT INTO tenants (id, slug, name, status)
            VALUES ($1, $2, $3, 'active')
            RETURNING *
            ",
        )
        .bind(Uuid::new_v4())
        .bind(slug)
        .bind(name)
        .fetch_one(executor)
        .await
    }

    /// Find a tenant by id.
    pub async fn find_by_id<'e, E>(executor: E, id: Uuid) -> Result<Option<Self>, sqlx::Error>
    where
        E: sqlx::PgExecutor<'e>,
    {
        sqlx::query_as("SELECT * FROM tenants WHERE id = $1")
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Find a tenant by slug.
    pub async fn find_by_slug<'e, E>(executor: E, slug: &str) -> Result<Option<Self>, sqlx::Error>
    where
        E: sqlx::PgExecutor<'e>,
    {
        sqlx::query_as("SELECT * FROM tenants WHERE slug = $1")
            .bind(slug)
            .fetch_optional(executor)
            .await
    }

    /// Change a tenant's status.
    pub async fn set_status<'e, E>(
        executor: E,
        id: Uuid,
        status: &str,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: sqlx::PgExecutor<'e>,
    {
        sqlx::query_as(
            r"
            UPDATE tenants SET status = $2 WHERE id = $1
            RETURNING *
            ",
        )
        .bind(id)
        .bind(status)
        .fetch_optional(executor)
        .await
    }
}
