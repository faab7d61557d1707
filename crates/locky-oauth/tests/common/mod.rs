//! Shared context for database-backed integration tests.
//!
//! Requires a running PostgreSQL and `DATABASE_URL`. The schema is
//! applied idempotently on first use so the tests are self-contained.

#![allow(dead_code)]

use chrono::{DateTime, Duration, Utc};
use locky_core::{Clock, EngineConfig, LogAuditSink, SharedClock, StaticRoles};
use locky_db::{NewOAuthClient, OAuthClient, Tenant, User, UserCredential};
use locky_oauth::{KeyService, LoginService, OAuthService, SessionService, TokenService};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

const SCHEMA: &str = r"
CREATE TABLE IF NOT EXISTS tenants (
    id UUID PRIMARY KEY,
    slug TEXT NOT NULL UNIQUE,
    name TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'active',
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
);
CREATE TABLE IF NOT EXISTS tenant_domains (
    id UUID PRIMARY KEY,
    tenant_id UUID NOT NULL REFERENCES tenants(id),
    domain TEXT NOT NULL UNIQUE,
    verified_at TIMESTAMPTZ,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
);
CREATE TABLE IF NOT EXISTS users (
    id UUID PRIMARY KEY,
    tenant_id UUID NOT NULL REFERENCES tenants(id),
    email TEXT NOT NULL,
    email_verified BOOLEAN NOT NULL DEFAULT FALSE,
    status TEXT NOT NULL DEFAULT 'active',
    display_name TEXT,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ,
    UNIQUE (tenant_id, email)
);
CREATE TABLE IF NOT EXISTS user_credentials (
    user_id UUID PRIMARY KEY REFERENCES users(id),
    encoded_hash TEXT NOT NULL,
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
);
CREATE TABLE IF NOT EXISTS sessions (
    id UUID PRIMARY KEY,
    tenant_id UUID NOT NULL REFERENCES tenants(id),
    user_id UUID NOT NULL,
    client_id UUID,
    ip TEXT NOT NULL,
    user_agent TEXT NOT NULL,
    created_at TIMESTAMPTZ NOT NULL,
    last_seen_at TIMESTAMPTZ NOT NULL,
    revoked_at TIMESTAMPTZ
);
CREATE TABLE IF NOT EXISTS oauth_clients (
    id UUID PRIMARY KEY,
    tenant_id UUID NOT NULL REFERENCES tenants(id),
    client_id TEXT NOT NULL,
    client_secret_hash TEXT,
    redirect_uris TEXT[] NOT NULL DEFAULT '{}',
    post_logout_redirect_uris TEXT[] NOT NULL DEFAULT '{}',
    grant_types TEXT[] NOT NULL DEFAULT '{}',
    response_types TEXT[] NOT NULL DEFAULT '{}',
    scopes TEXT[] NOT NULL DEFAULT '{}',
    token_ttl_seconds INTEGER NOT NULL DEFAULT 0,
    refresh_ttl_seconds INTEGER NOT NULL DEFAULT 0,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    UNIQUE (tenant_id, client_id)
);
CREATE TABLE IF NOT EXISTS signing_keys (
    id UUID PRIMARY KEY,
    tenant_id UUID NOT NULL REFERENCES tenants(id),
    kid TEXT NOT NULL,
    public_jwk JSONB NOT NULL,
    private_key_sealed BYTEA NOT NULL,
    status TEXT NOT NULL DEFAULT 'active',
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    not_before TIMESTAMPTZ NOT NULL,
    not_after TIMESTAMPTZ NOT NULL,
    UNIQUE (tenant_id, kid)
);
CREATE TABLE IF NOT EXISTS authorization_codes (
    code_hash TEXT PRIMARY KEY,
    tenant_id UUID NOT NULL REFERENCES tenants(id),
    client_id UUID NOT NULL,
    user_id UUID NOT NULL,
    redirect_uri TEXT NOT NULL,
    pkce_challenge TEXT NOT NULL,
    pkce_method TEXT NOT NULL DEFAULT 'S256',
    scope TEXT NOT NULL DEFAULT '',
    expires_at TIMESTAMPTZ NOT NULL,
    used_at TIMESTAMPTZ,
    created_at TIMESTAMPTZ NOT NULL
);
CREATE TABLE IF NOT EXISTS refresh_tokens (
    token_hash TEXT PRIMARY KEY,
    tenant_id UUID NOT NULL REFERENCES tenants(id),
    client_id UUID NOT NULL,
    user_id UUID NOT NULL,
    scope TEXT NOT NULL DEFAULT '',
    created_at TIMESTAMPTZ NOT NULL,
    expires_at TIMESTAMPTZ NOT NULL,
    revoked_at TIMESTAMPTZ,
    rotated_from_hash TEXT
);
";

/// A clock that can be shifted forward by tests.
pub struct AdjustableClock {
    offset: Mutex<Duration>,
}

impl AdjustableClock {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            offset: Mutex::new(Duration::zero()),
        })
    }

    /// Move the clock forward.
    pub fn advance(&self, by: Duration) {
        *self.offset.lock().unwrap() += by;
    }
}

impl Clock for AdjustableClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now() + *self.offset.lock().unwrap()
    }
}

/// Everything a test needs: a pool, a config, and the wired services.
pub struct TestContext {
    pub pool: PgPool,
    pub config: EngineConfig,
    pub clock: Arc<AdjustableClock>,
    pub keys: Arc<KeyService>,
    pub tokens: Arc<TokenService>,
    pub sessions: Arc<SessionService>,
    pub login: LoginService,
    pub oauth: OAuthService,
}

impl TestContext {
    pub async fn new() -> Self {
        Self::with_config(test_config()).await
    }

    pub async fn with_config(config: EngineConfig) -> Self {
        let url = std::env::var("DATABASE_URL")
            .expect("DATABASE_URL must be set for integration tests");
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(&url)
            .await
            .expect("failed to connect to test database");

        for statement in SCHEMA.split(';').filter(|s| !s.trim().is_empty()) {
            sqlx::query(statement)
                .execute(&pool)
                .await
                .expect("failed to apply test schema");
        }

        let clock = AdjustableClock::new();
        let shared: SharedClock = clock.clone();

        let keys = Arc::new(
            KeyService::new(pool.clone(), &config, shared.clone())
                .expect("key service construction"),
        );
        let tokens = Arc::new(TokenService::new(
            pool.clone(),
            keys.clone(),
            &config,
            shared.clone(),
        ));
        let sessions = Arc::new(SessionService::new(pool.clone(), &config, shared.clone()));
        let login = LoginService::new(pool.clone());
        let oauth = OAuthService::new(
            pool.clone(),
            config.clone(),
            tokens.clone(),
            sessions.clone(),
            Arc::new(StaticRoles::new()),
            Arc::new(LogAuditSink),
            shared,
        );

        Self {
            pool,
            config,
            clock,
            keys,
            tokens,
            sessions,
            login,
            oauth,
        }
    }

    /// Unique suffix so parallel test runs never collide.
    pub fn unique(prefix: &str) -> String {
        format!("{prefix}-{}", Uuid::new_v4().simple())
    }

    pub async fn create_tenant(&self, name: &str) -> Tenant {
        let slug = Self::unique(name);
        Tenant::insert(&self.pool, &slug, name)
            .await
            .expect("create tenant")
    }

    pub async fn create_user(&self, tenant: &Tenant, password: &str) -> User {
        let email = format!("{}@example.com", Self::unique("user"));
        let user = User::insert(&self.pool, tenant.id, &email, Some("Test User"))
            .await
            .expect("create user");
        let hash = locky_auth::hash_password(password).expect("hash password");
        UserCredential::upsert(&self.pool, user.id, &hash)
            .await
            .expect("store credential");
        user
    }

    /// Register a client; `secret: None` makes it public.
    pub async fn create_client(&self, tenant: &Tenant, secret: Option<&str>) -> OAuthClient {
        let secret_hash = secret.map(|s| locky_auth::hash_password(s).expect("hash secret"));
        OAuthClient::insert(
            &self.pool,
            NewOAuthClient {
                tenant_id: tenant.id,
                client_id: Self::unique("client"),
                client_secret_hash: secret_hash,
                redirect_uris: vec!["http://localhost:3000/callback".to_string()],
                post_logout_redirect_uris: vec!["http://localhost:3000/".to_string()],
                grant_types: vec![
                    "authorization_code".to_string(),
                    "refresh_token".to_string(),
                    "client_credentials".to_string(),
                ],
                response_types: vec!["code".to_string()],
                scopes: vec![
                    "openid".to_string(),
                    "profile".to_string(),
                    "email".to_string(),
                    "offline_access".to_string(),
                    "api:read".to_string(),
                ],
                token_ttl_seconds: 0,
                refresh_ttl_seconds: 0,
            },
        )
        .await
        .expect("create client")
    }
}

pub fn test_config() -> EngineConfig {
    EngineConfig::builder()
        .base_domain("auth.example.com")
        .master_key(vec![0xAB; 32])
        .build()
}
