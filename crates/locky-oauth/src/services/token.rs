//! Access-token issuance/validation and refresh-token lifecycle.

use crate::error::OAuthError;
use crate::services::keys::KeyService;
use chrono::Duration;
use locky_auth::{
    decode_es256, extract_kid, extract_tenant_unverified, generate_opaque_token, token_digest,
    AccessClaims, ValidationConfig,
};
use locky_core::{EngineConfig, SharedClock, TenantId};
use locky_db::{NewRefreshToken, OAuthClient, RefreshToken, SuccessorToken, Tenant};
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

/// Issues and validates access tokens; issues and rotates refresh tokens.
///
/// Access tokens are stateless ES256 JWTs; refresh tokens are opaque,
/// stored hashed, and rotated on every use.
pub struct TokenService {
    pool: PgPool,
    keys: Arc<KeyService>,
    access_ttl: Duration,
    refresh_ttl: Duration,
    base_domain: String,
    clock: SharedClock,
}

impl TokenService {
    /// Create the token service.
    #[must_use]
    pub fn new(
        pool: PgPool,
        keys: Arc<KeyService>,
        config: &EngineConfig,
        clock: SharedClock,
    ) -> Self {
        Self {
            pool,
            keys,
            access_ttl: config.access_token_ttl,
            refresh_ttl: config.refresh_token_ttl,
            base_domain: config.base_domain.clone(),
            clock,
        }
    }

    /// The issuer URL for a tenant.
    #[must_use]
    pub fn issuer_for(&self, tenant: &Tenant) -> String {
        format!("https://{}.{}", tenant.slug, self.base_domain)
    }

    /// Access-token lifetime for a client, honoring its per-client
    /// override.
    pub(crate) fn access_ttl_for(&self, client: &OAuthClient) -> i64 {
        if client.token_ttl_seconds > 0 {
            i64::from(client.token_ttl_seconds)
        } else {
            self.access_ttl.num_seconds()
        }
    }

    /// Refresh-token lifetime for a client, honoring its per-client
    /// override.
    fn refresh_ttl_for(&self, client: &OAuthClient) -> Duration {
        if client.refresh_ttl_seconds > 0 {
            Duration::seconds(i64::from(client.refresh_ttl_seconds))
        } else {
            self.refresh_ttl
        }
    }

    /// Issue a signed access token.
    ///
    /// `user_id = None` marks a client-credentials token: the subject
    /// becomes the client id and no session is attached.
    pub async fn issue_access_token(
        &self,
        tenant: &Tenant,
        user_id: Option<Uuid>,
        client: &OAuthClient,
        scope: &str,
        roles: Vec<String>,
        session_id: Option<Uuid>,
    ) -> Result<String, OAuthError> {
        let subject = match user_id {
            Some(uid) => uid.to_string(),
            None => client.client_id.clone(),
        };

        let mut builder = AccessClaims::builder()
            .issuer(self.issuer_for(tenant))
            .subject(subject)
            .audience(&client.client_id)
            .tenant(TenantId::from_uuid(tenant.id))
            .roles(roles)
            .scope(scope)
            .expires_in_secs(self.access_ttl_for(client));

        if let Some(sid) = session_id {
            builder = builder.session(sid);
        }

        let claims = builder.build();
        self.keys.sign_claims(tenant.id, &claims).await
    }

    /// Issue a refresh token: generate an opaque value, store its digest,
    /// return the plaintext exactly once.
    pub async fn issue_refresh_token(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
        client: &OAuthClient,
        scope: &str,
    ) -> Result<String, OAuthError> {
        let token = generate_opaque_token();
        let now = self.clock.now();

        RefreshToken::insert(
            &self.pool,
            NewRefreshToken {
                token_hash: token_digest(&token),
                tenant_id,
                client_id: client.id,
                user_id,
                scope: scope.to_string(),
                created_at: now,
                expires_at: now + self.refresh_ttl_for(client),
            },
        )
        .await?;

        Ok(token)
    }

    /// Validate an access token end to end.
    ///
    /// The header's `kid` and the (unverified) `tid` claim select the
    /// verification key; nothing else is trusted before the ES256
    /// signature and the `exp`/`nbf` window check out.
    pub async fn validate_access_token(&self, token: &str) -> Result<AccessClaims, OAuthError> {
        let tenant_id = extract_tenant_unverified(token)?;
        let kid = extract_kid(token)?
            .ok_or_else(|| OAuthError::Crypto(locky_auth::AuthError::MissingClaim("kid".into())))?;

        let jwk = self.keys.verification_jwk(tenant_id, &kid).await?;

        let claims = decode_es256(token, &jwk, &ValidationConfig::default())?;
        Ok(claims)
    }

    /// Rotate a refresh token: revoke the presented one and mint its
    /// successor atomically. Returns the presented row (for subject,
    /// client, and scope recovery) and the new plaintext.
    ///
    /// Presenting an already-rotated or revoked token revokes its entire
    /// descendant chain and fails with
    /// [`OAuthError::RefreshTokenReplay`].
    pub async fn rotate_refresh_token(
        &self,
        tenant_id: Uuid,
        plaintext: &str,
        client: &OAuthClient,
    ) -> Result<(RefreshToken, String), OAuthError> {
        let old_hash = token_digest(plaintext);
        let new_token = generate_opaque_token();
        let now = self.clock.now();

        let old = RefreshToken::rotate(
            &self.pool,
            tenant_id,
            client.id,
            &old_hash,
            SuccessorToken {
                token_hash: token_digest(&new_token),
                created_at: now,
                expires_at: now + self.refresh_ttl_for(client),
            },
            now,
        )
        .await?;

        Ok((old, new_token))
    }

    /// Revoke a refresh token by plaintext. Idempotent and silent about
    /// whether the token existed.
    pub async fn revoke_refresh_token(
        &self,
        tenant_id: Uuid,
        plaintext: &str,
    ) -> Result<(), OAuthError> {
        let hash = token_digest(plaintext);
        RefreshToken::revoke(&self.pool, tenant_id, &hash, self.clock.now()).await?;
        Ok(())
    }

    /// Look up a refresh token row by plaintext. Used by introspection.
    pub async fn find_refresh_token(
        &self,
        tenant_id: Uuid,
        plaintext: &str,
    ) -> Result<Option<RefreshToken>, OAuthError> {
        let hash = token_digest(plaintext);
        Ok(RefreshToken::find_by_hash(&self.pool, tenant_id, &hash).await?)
    }
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService")
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .field("base_domain", &self.base_domain)
            .finish()
    }
}
