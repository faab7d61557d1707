//! Stateful browser session lifecycle.

use crate::error::OAuthError;
use chrono::Duration;
use locky_core::{EngineConfig, SharedClock};
use locky_db::{NewSession, Session};
use sqlx::PgPool;
use uuid::Uuid;

/// Creates, validates, and revokes server-side sessions.
pub struct SessionService {
    pool: PgPool,
    ttl: Duration,
    clock: SharedClock,
}

impl SessionService {
    /// Create the session service.
    #[must_use]
    pub fn new(pool: PgPool, config: &EngineConfig, clock: SharedClock) -> Self {
        Self {
            pool,
            ttl: config.session_ttl,
            clock,
        }
    }

    /// Create a session for a freshly authenticated user.
    pub async fn create(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
        client_id: Option<Uuid>,
        ip: &str,
        user_agent: &str,
    ) -> Result<Session, OAuthError> {
        let session = Session::insert(
            &self.pool,
            NewSession {
                tenant_id,
                user_id,
                client_id,
                ip: ip.to_string(),
                user_agent: user_agent.to_string(),
                created_at: self.clock.now(),
            },
        )
        .await?;

        tracing::debug!(tenant_id = %tenant_id, session_id = %session.id, "session created");
        Ok(session)
    }

    /// Validate a session and slide `last_seen_at` forward.
    ///
    /// Fails with `SessionRevoked` or `SessionExpired` on terminal
    /// sessions; the `last_seen_at` update itself is best-effort and a
    /// failure there does not fail validation.
    pub async fn validate(&self, tenant_id: Uuid, session_id: Uuid) -> Result<Session, OAuthError> {
        let now = self.clock.now();

        let mut session = Session::find_by_id(&self.pool, tenant_id, session_id)
            .await?
            .ok_or(OAuthError::SessionNotFound)?;

        if session.is_revoked() {
            return Err(OAuthError::SessionRevoked);
        }
        if session.is_expired(self.ttl, now) {
            return Err(OAuthError::SessionExpired);
        }

        if let Err(e) = Session::touch(&self.pool, tenant_id, session_id, now).await {
            tracing::warn!(
                tenant_id = %tenant_id,
                session_id = %session_id,
                error = %e,
                "failed to advance last_seen_at"
            );
        } else {
            session.last_seen_at = now;
        }

        Ok(session)
    }

    /// Revoke a session. Idempotent: revoking an already-revoked session
    /// succeeds and leaves the original `revoked_at` in place.
    pub async fn revoke(&self, tenant_id: Uuid, session_id: Uuid) -> Result<(), OAuthError> {
        Session::revoke(&self.pool, tenant_id, session_id, self.clock.now()).await?;
        Ok(())
    }
}

impl std::fmt::Debug for SessionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionService").field("ttl", &self.ttl).finish()
    }
}
