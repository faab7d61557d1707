//! Engine assembly.
//!
//! [`Engine`] wires the services together from one pool, one immutable
//! configuration, and the injected collaborators. It also carries the
//! minimal control-plane surface the flows depend on: creating a tenant
//! (which provisions its first signing key) and registering a client.

use crate::error::OAuthError;
use crate::services::{KeyService, LoginService, OAuthService, SessionService, TokenService};
use crate::sweeper::Sweeper;
use locky_auth::generate_opaque_token;
use locky_core::{AuditSink, Authorizer, ConfigError, EngineConfig, SharedClock, SystemClock};
use locky_db::{NewOAuthClient, OAuthClient, Tenant};
use locky_tenant::TenantResolver;
use sqlx::PgPool;
use std::sync::Arc;

/// A client registration request.
#[derive(Debug, Clone)]
pub struct ClientRegistration {
    /// The wire `client_id`. Unique per tenant.
    pub client_id: String,
    /// Whether to issue a secret. Public clients get none and must use
    /// PKCE.
    pub confidential: bool,
    pub redirect_uris: Vec<String>,
    pub post_logout_redirect_uris: Vec<String>,
    pub grant_types: Vec<String>,
    pub scopes: Vec<String>,
    /// Access-token lifetime override in seconds; 0 uses the engine
    /// default.
    pub token_ttl_seconds: i32,
    /// Refresh-token lifetime override in seconds; 0 uses the engine
    /// default.
    pub refresh_ttl_seconds: i32,
}

/// The assembled identity engine.
///
/// Construct once at startup; every service hangs off the same pool and
/// configuration. The HTTP adapter resolves the tenant through
/// [`Engine::resolver`] and calls the services with it.
pub struct Engine {
    pub resolver: TenantResolver,
    pub keys: Arc<KeyService>,
    pub tokens: Arc<TokenService>,
    pub sessions: Arc<SessionService>,
    pub login: LoginService,
    pub oauth: OAuthService,
    pub sweeper: Sweeper,
    pool: PgPool,
}

impl Engine {
    /// Assemble the engine with the system clock.
    ///
    /// # Errors
    ///
    /// Fails when the configuration is unsound (see
    /// [`EngineConfig::validate`]); hosts should refuse to start.
    pub fn new(
        pool: PgPool,
        config: EngineConfig,
        authorizer: Arc<dyn Authorizer>,
        audit: Arc<dyn AuditSink>,
    ) -> Result<Self, ConfigError> {
        Self::with_clock(pool, config, authorizer, audit, Arc::new(SystemClock))
    }

    /// Assemble the engine with an explicit clock.
    pub fn with_clock(
        pool: PgPool,
        config: EngineConfig,
        authorizer: Arc<dyn Authorizer>,
        audit: Arc<dyn AuditSink>,
        clock: SharedClock,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let resolver = TenantResolver::new(pool.clone(), config.base_domain.clone());
        let keys = Arc::new(KeyService::new(pool.clone(), &config, clock.clone())?);
        let tokens = Arc::new(TokenService::new(
            pool.clone(),
            keys.clone(),
            &config,
            clock.clone(),
        ));
        let sessions = Arc::new(SessionService::new(pool.clone(), &config, clock.clone()));
        let login = LoginService::new(pool.clone());
        let oauth = OAuthService::new(
            pool.clone(),
            config.clone(),
            tokens.clone(),
            sessions.clone(),
            authorizer,
            audit,
            clock.clone(),
        );
        let sweeper = Sweeper::new(pool.clone(), &config, clock);

        Ok(Self {
            resolver,
            keys,
            tokens,
            sessions,
            login,
            oauth,
            sweeper,
            pool,
        })
    }

    /// Create a tenant and provision its first signing key.
    ///
    /// A tenant without a usable key cannot issue tokens, so the two
    /// steps belong together.
    pub async fn create_tenant(&self, slug: &str, name: &str) -> Result<Tenant, OAuthError> {
        let tenant = Tenant::insert(&self.pool, slug, name).await?;
        self.keys.provision(tenant.id).await?;
        Ok(tenant)
    }

    /// Register a client. For confidential clients the generated secret
    /// is returned exactly once; only its Argon2id hash is stored.
    pub async fn register_client(
        &self,
        tenant: &Tenant,
        registration: ClientRegistration,
    ) -> Result<(OAuthClient, Option<String>), OAuthError> {
        let secret = registration.confidential.then(generate_opaque_token);

        let secret_hash = match &secret {
            Some(plaintext) => {
                let plaintext = plaintext.clone();
                let hash =
                    tokio::task::spawn_blocking(move || locky_auth::hash_password(&plaintext))
                        .await
                        .map_err(|e| OAuthError::Internal(format!("hash task failed: {e}")))??;
                Some(hash)
            }
            None => None,
        };

        let client = OAuthClient::insert(
            &self.pool,
            NewOAuthClient {
                tenant_id: tenant.id,
                client_id: registration.client_id,
                client_secret_hash: secret_hash,
                redirect_uris: registration.redirect_uris,
                post_logout_redirect_uris: registration.post_logout_redirect_uris,
                grant_types: registration.grant_types,
                response_types: vec!["code".to_string()],
                scopes: registration.scopes,
                token_ttl_seconds: registration.token_ttl_seconds,
                refresh_ttl_seconds: registration.refresh_ttl_seconds,
            },
        )
        .await?;

        Ok((client, secret))
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine").finish_non_exhaustive()
    }
}
