//! End-user authentication.

use crate::error::OAuthError;
use locky_db::{Tenant, User, UserCredential};
use sqlx::PgPool;

/// Authenticates end users against stored Argon2id credentials.
///
/// Any mismatch (unknown email, no credential, wrong password) collapses
/// into a single `InvalidCredentials` error so callers cannot probe for
/// account existence.
#[derive(Debug, Clone)]
pub struct LoginService {
    pool: PgPool,
}

impl LoginService {
    /// Create the login service.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Authenticate `(email, password)` within a tenant.
    ///
    /// The Argon2id verification runs on a blocking thread; it is far too
    /// expensive for an async worker.
    pub async fn authenticate(
        &self,
        tenant: &Tenant,
        email: &str,
        password: &str,
    ) -> Result<User, OAuthError> {
        if tenant.is_suspended() {
            return Err(OAuthError::TenantSuspended);
        }

        let user = User::find_by_email(&self.pool, tenant.id, email)
            .await?
            .ok_or(OAuthError::InvalidCredentials)?;

        let credential = UserCredential::find_by_user(&self.pool, user.id)
            .await?
            .ok_or(OAuthError::InvalidCredentials)?;

        let password = password.to_string();
        let encoded_hash = credential.encoded_hash;
        let matches = tokio::task::spawn_blocking(move || {
            locky_auth::verify_password(&password, &encoded_hash)
        })
        .await
        .map_err(|e| OAuthError::Internal(format!("verify task failed: {e}")))?;

        match matches {
            Ok(true) => {}
            Ok(false) => return Err(OAuthError::InvalidCredentials),
            Err(e) => {
                // A malformed stored hash is an operational problem, not a
                // user error; still fail closed toward the caller.
                tracing::error!(user_id = %user.id, error = %e, "stored credential unreadable");
                return Err(OAuthError::InvalidCredentials);
            }
        }

        if !user.is_active() {
            return Err(OAuthError::UserDisabled);
        }

        Ok(user)
    }

    /// Set a user's password, replacing any existing credential.
    pub async fn set_password(&self, user_id: uuid::Uuid, password: &str) -> Result<(), OAuthError> {
        let password = password.to_string();
        let encoded = tokio::task::spawn_blocking(move || locky_auth::hash_password(&password))
            .await
            .map_err(|e| OAuthError::Internal(format!("hash task failed: {e}")))??;

        UserCredential::upsert(&self.pool, user_id, &encoded).await?;
        Ok(())
    }
}
