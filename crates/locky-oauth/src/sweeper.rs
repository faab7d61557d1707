//! Background sweeper for spent credentials.
//!
//! Deletes consumed/expired authorization codes, revoked/expired refresh
//! tokens, and revoked/expired sessions, and retires signing keys whose
//! verification window has closed. Passes are best-effort and
//! idempotent; a failed pass logs and retries on the next tick.

use chrono::Duration;
use locky_core::{EngineConfig, SharedClock};
use locky_db::{AuthorizationCode, RefreshToken, Session, SigningKey};
use sqlx::PgPool;
use tokio::sync::watch;

/// What one sweep pass removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub codes_deleted: u64,
    pub refresh_tokens_deleted: u64,
    pub sessions_deleted: u64,
    pub keys_retired: u64,
}

/// Periodic cleanup task.
pub struct Sweeper {
    pool: PgPool,
    session_ttl: Duration,
    interval: std::time::Duration,
    clock: SharedClock,
}

impl Sweeper {
    /// Create the sweeper.
    #[must_use]
    pub fn new(pool: PgPool, config: &EngineConfig, clock: SharedClock) -> Self {
        Self {
            pool,
            session_ttl: config.session_ttl,
            interval: config
                .sweep_interval
                .to_std()
                .unwrap_or(std::time::Duration::from_secs(3600)),
            clock,
        }
    }

    /// Run until the shutdown signal flips to `true` (or its sender is
    /// dropped). A shutdown arriving mid-pass abandons that pass; the
    /// rolled-back work is picked up on the next start.
    ///
    /// Intended to be spawned as a long-lived task; hosts on their own
    /// schedulers can call [`Sweeper::sweep_once`] directly instead.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        tracing::info!(interval_secs = self.interval.as_secs(), "sweeper started");

        loop {
            tokio::select! {
                () = tokio::time::sleep(self.interval) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        tracing::info!("sweeper shutting down");
                        return;
                    }
                    continue;
                }
            }

            tokio::select! {
                result = self.sweep_once() => match result {
                    Ok(report) => {
                        tracing::info!(
                            codes = report.codes_deleted,
                            refresh_tokens = report.refresh_tokens_deleted,
                            sessions = report.sessions_deleted,
                            keys_retired = report.keys_retired,
                            "sweep pass complete"
                        );
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "sweep pass failed; retrying next tick");
                    }
                },
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        tracing::info!("sweeper shutting down mid-pass");
                        return;
                    }
                }
            }
        }
    }

    /// One cleanup pass across all four categories.
    pub async fn sweep_once(&self) -> Result<SweepReport, sqlx::Error> {
        let now = self.clock.now();
        let session_cutoff = now - self.session_ttl;

        let codes_deleted = AuthorizationCode::delete_spent(&self.pool, now).await?;
        let refresh_tokens_deleted = RefreshToken::delete_spent(&self.pool, now).await?;
        let sessions_deleted = Session::delete_spent(&self.pool, session_cutoff).await?;
        let keys_retired = SigningKey::retire_expired(&self.pool, now).await?;

        Ok(SweepReport {
            codes_deleted,
            refresh_tokens_deleted,
            sessions_deleted,
            keys_retired,
        })
    }
}

impl std::fmt::Debug for Sweeper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sweeper")
            .field("interval", &self.interval)
            .field("session_ttl", &self.session_ttl)
            .finish()
    }
}
