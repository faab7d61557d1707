//! Custom domain mapping for tenant resolution.

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// A custom domain owned by a tenant.
///
/// Only verified domains (`verified_at` set) take part in resolution.
#[derive(Debug, Clone, FromRow)]
pub struct TenantDomain {
    pub id: Uuid,
    pub tenant_id: Uuid,

    /// Fully qualified domain name, globally unique, stored lowercase.
    pub domain: String,

    /// Set once ownership has been proven. Unverified domains never
    /// resolve.
    pub verified_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
}

impl TenantDomain {
    /// Whether the domain may resolve to its tenant.
    #[must_use]
    pub fn is_verified(&self) -> bool {
        self.verified_at.is_some()
    }

    /// Insert a new, unverified domain.
    pub async fn insert<'e, E>(
        executor: E,
        tenant_id: Uuid,
        domain: &str,
    ) -> Result<Self, sqlx::Error>
    where
        E: sqlx::PgExecutor<'e>,
    {
        sqlx::query_as(
            r"
            INSERT INTO tenant_domains (id, tenant_id, domain)
            VALUES ($1, $2, lower($3))
            RETURNING *
            ",
        )
        .bind(Uuid::new_v4())
        .bind(tenant_id)
        .bind(domain)
        .fetch_one(executor)
        .await
    }

    /// Exact-match lookup by domain name. Global, not tenant-scoped:
    /// this is the entry point that determines the tenant.
    pub async fn find_by_domain<'e, E>(
        executor: E,
        domain: &str,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: sqlx::PgExecutor<'e>,
    {
        sqlx::query_as("SELECT * FROM tenant_domains WHERE domain = lower($1)")
            .bind(domain)
            .fetch_optional(executor)
            .await
    }

    /// Mark a domain as verified.
    pub async fn mark_verified<'e, E>(
        executor: E,
        tenant_id: Uuid,
        id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: sqlx::PgExecutor<'e>,
    {
        sqlx::query_as(
            r"
            UPDATE tenant_domains
            SET verified_at = $3
            WHERE id = $1 AND tenant_id = $2
            RETURNING *
            ",
        )
        .bind(id)
        .bind(tenant_id)
        .bind(at)
        .fetch_optional(executor)
        .await
    }

}
