//! Behavior contracts the engine consumes.
//!
//! One narrow trait per collaborator: role lookup ([`Authorizer`]), audit
//! delivery ([`AuditSink`]), and time ([`Clock`]). The engine is
//! instantiated once with these injected; there is no global state.

use crate::audit::AuditEvent;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

/// Failure of the authorization backend.
#[derive(Debug, Clone, Error)]
#[error("authorization backend failure: {0}")]
pub struct AuthzError(pub String);

/// Role lookup contract.
///
/// Policy storage and authoring live outside the engine; token issuance
/// only needs the current role set of a user.
#[async_trait]
pub trait Authorizer: Send + Sync {
    /// The roles currently held by `user_id` within `tenant_id`.
    async fn roles_for_user(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
    ) -> Result<Vec<String>, AuthzError>;
}

/// Fixed role assignments, for tests and single-tenant embedding.
#[derive(Debug, Default)]
pub struct StaticRoles {
    roles: HashMap<(Uuid, Uuid), Vec<String>>,
}

impl StaticRoles {
    /// Empty assignment set: every lookup yields no roles.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign roles to a user.
    #[must_use]
    pub fn with_roles(mut self, tenant_id: Uuid, user_id: Uuid, roles: Vec<String>) -> Self {
        self.roles.insert((tenant_id, user_id), roles);
        self
    }
}

#[async_trait]
impl Authorizer for StaticRoles {
    async fn roles_for_user(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
    ) -> Result<Vec<String>, AuthzError> {
        Ok(self
            .roles
            .get(&(tenant_id, user_id))
            .cloned()
            .unwrap_or_default())
    }
}

/// Audit delivery contract. Implementations must not block issuance on
/// slow transports; delivery is best-effort from the engine's view.
#[async_trait]
pub trait AuditSink: Send + Sync {
    /// Record one event.
    async fn record(&self, event: AuditEvent);
}

/// Audit sink that emits events as structured log records.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogAuditSink;

#[async_trait]
impl AuditSink for LogAuditSink {
    async fn record(&self, event: AuditEvent) {
        tracing::info!(
            tenant_id = %event.tenant_id,
            actor = %event.actor,
            actor_id = ?event.actor_id,
            kind = %event.kind,
            data = %event.data,
            "audit event"
        );
    }
}

/// Time source, injectable for boundary tests.
pub trait Clock: Send + Sync {
    /// The current instant.
    fn now(&self) -> DateTime<Utc>;
}

/// Production clock backed by the system time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Shared clock handle used throughout the services.
pub type SharedClock = Arc<dyn Clock>;
