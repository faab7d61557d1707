//! Audit event model.
//!
//! Events describe security-relevant actions the engine performed. The
//! transport (database table, message bus, file) lives behind the
//! [`AuditSink`](crate::AuditSink) contract and is injected by the host.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Who performed an audited action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditActor {
    /// An end user, identified by `actor_id`.
    User,
    /// A registered client acting for itself.
    Client,
    /// The engine itself (sweeper, key rotation).
    System,
}

impl std::fmt::Display for AuditActor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Client => write!(f, "client"),
            Self::System => write!(f, "system"),
        }
    }
}

/// A security-relevant event emitted by the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub actor: AuditActor,
    pub actor_id: Option<Uuid>,
    /// Event kind, e.g. `oauth.authorize`, `oauth.token`, `login.failed`.
    pub kind: String,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
    pub at: DateTime<Utc>,
    /// Free-form event payload.
    pub data: serde_json::Value,
}

impl AuditEvent {
    /// Build an event stamped with the current time.
    #[must_use]
    pub fn new(tenant_id: Uuid, actor: AuditActor, kind: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            tenant_id,
            actor,
            actor_id: None,
            kind: kind.into(),
            ip: None,
            user_agent: None,
            at: Utc::now(),
            data: serde_json::Value::Null,
        }
    }

    /// Attach the acting principal.
    #[must_use]
    pub fn actor_id(mut self, id: Uuid) -> Self {
        self.actor_id = Some(id);
        self
    }

    /// Attach a payload.
    #[must_use]
    pub fn data(mut self, data: serde_json::Value) -> Self {
        self.data = data;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_builder() {
        let tenant = Uuid::new_v4();
        let user = Uuid::new_v4();
        let event = AuditEvent::new(tenant, AuditActor::User, "oauth.authorize")
            .actor_id(user)
            .data(serde_json::json!({"client_id": "web"}));

        assert_eq!(event.tenant_id, tenant);
        assert_eq!(event.actor_id, Some(user));
        assert_eq!(event.kind, "oauth.authorize");
        assert_eq!(event.data["client_id"], "web");
    }

    #[test]
    fn test_actor_display() {
        assert_eq!(AuditActor::User.to_string(), "user");
        assert_eq!(AuditActor::Client.to_string(), "client");
        assert_eq!(AuditActor::System.to_string(), "system");
    }
}
