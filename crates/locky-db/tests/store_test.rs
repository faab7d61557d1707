//! Store-level state machine tests: single-use consumption, rotation
//! chains, key lifecycle, session monotonicity.
//!
//! Run with:
//!   cargo test -p locky-db --features integration --test store_test
//!
//! Requires PostgreSQL and DATABASE_URL.

#![cfg(feature = "integration")]

use chrono::{DateTime, Duration, Utc};
use locky_auth::generate_p256_keypair;
use locky_db::{
    AuthorizationCode, CodeConsumeError, NewAuthorizationCode, NewRefreshToken, NewSigningKey,
    NewSession, RefreshRotateError, RefreshToken, Session, SigningKey, SuccessorToken, Tenant,
};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use uuid::Uuid;

const SCHEMA: &str = r"
CREATE TABLE IF NOT EXISTS tenants (
    id UUID PRIMARY KEY,
    slug TEXT NOT NULL UNIQUE,
    name TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'active',
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
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

async fn pool() -> PgPool {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&url)
        .await
        .expect("connect to test database");
    for statement in SCHEMA.split(';').filter(|s| !s.trim().is_empty()) {
        sqlx::query(statement).execute(&pool).await.expect("schema");
    }
    pool
}

fn unique(prefix: &str) -> String {
    format!("{prefix}-{}", Uuid::new_v4().simple())
}

async fn tenant(pool: &PgPool) -> Tenant {
    Tenant::insert(pool, &unique("store"), "Store Test")
        .await
        .unwrap()
}

fn new_token(tenant_id: Uuid, hash: &str, now: DateTime<Utc>) -> NewRefreshToken {
    NewRefreshToken {
        token_hash: hash.to_string(),
        tenant_id,
        client_id: Uuid::new_v4(),
        user_id: Uuid::new_v4(),
        scope: "openid offline_access".to_string(),
        created_at: now,
        expires_at: now + Duration::days(14),
    }
}

fn new_code(tenant_id: Uuid, hash: &str, expires_at: DateTime<Utc>) -> NewAuthorizationCode {
    NewAuthorizationCode {
        code_hash: hash.to_string(),
        tenant_id,
        client_id: Uuid::new_v4(),
        user_id: Uuid::new_v4(),
        redirect_uri: "http://localhost:3000/callback".to_string(),
        pkce_challenge: "challenge".to_string(),
        pkce_method: "S256".to_string(),
        scope: "openid".to_string(),
        created_at: Utc::now(),
        expires_at,
    }
}

#[tokio::test]
async fn test_consume_state_machine() {
    let pool = pool().await;
    let t = tenant(&pool).await;
    let now = Utc::now();

    // Unknown hash.
    let err = AuthorizationCode::get_and_consume(&pool, t.id, "no-such-code", now)
        .await
        .unwrap_err();
    assert!(matches!(err, CodeConsumeError::NotFound));

    // Fresh code consumes exactly once.
    let hash = unique("code");
    AuthorizationCode::insert(&pool, new_code(t.id, &hash, now + Duration::minutes(10)))
        .await
        .unwrap();
    let consumed = AuthorizationCode::get_and_consume(&pool, t.id, &hash, now)
        .await
        .unwrap();
    assert_eq!(consumed.used_at, Some(now));

    let err = AuthorizationCode::get_and_consume(&pool, t.id, &hash, now)
        .await
        .unwrap_err();
    assert!(matches!(err, CodeConsumeError::AlreadyUsed));

    // Expired code, including exactly at the boundary.
    let hash = unique("code");
    AuthorizationCode::insert(&pool, new_code(t.id, &hash, now)).await.unwrap();
    let err = AuthorizationCode::get_and_consume(&pool, t.id, &hash, now)
        .await
        .unwrap_err();
    assert!(matches!(err, CodeConsumeError::Expired));
}

#[tokio::test]
async fn test_consume_is_tenant_scoped() {
    let pool = pool().await;
    let t1 = tenant(&pool).await;
    let t2 = tenant(&pool).await;
    let now = Utc::now();

    let hash = unique("code");
    AuthorizationCode::insert(&pool, new_code(t1.id, &hash, now + Duration::minutes(10)))
        .await
        .unwrap();

    let err = AuthorizationCode::get_and_consume(&pool, t2.id, &hash, now)
        .await
        .unwrap_err();
    assert!(matches!(err, CodeConsumeError::NotFound));

    // The wrong-tenant attempt consumed nothing.
    assert!(AuthorizationCode::get_and_consume(&pool, t1.id, &hash, now)
        .await
        .is_ok());
}

#[tokio::test]
async fn test_rotation_links_and_copies_the_grant() {
    let pool = pool().await;
    let t = tenant(&pool).await;
    let now = Utc::now();

    let old_hash = unique("rt");
    let original = new_token(t.id, &old_hash, now);
    RefreshToken::insert(&pool, original.clone()).await.unwrap();

    let new_hash = unique("rt");
    let rotated = RefreshToken::rotate(
        &pool,
        t.id,
        original.client_id,
        &old_hash,
        SuccessorToken {
            token_hash: new_hash.clone(),
            created_at: now,
            expires_at: now + Duration::days(14),
        },
        now,
    )
    .await
    .unwrap();
    assert_eq!(rotated.revoked_at, Some(now));

    let successor = RefreshToken::find_by_hash(&pool, t.id, &new_hash)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(successor.rotated_from_hash.as_deref(), Some(old_hash.as_str()));
    assert_eq!(successor.user_id, original.user_id);
    assert_eq!(successor.client_id, original.client_id);
    assert_eq!(successor.scope, original.scope);
    assert!(successor.revoked_at.is_none());
}

#[tokio::test]
async fn test_replay_revokes_the_whole_descendant_chain() {
    let pool = pool().await;
    let t = tenant(&pool).await;
    let now = Utc::now();

    // Build a three-link chain rt1 -> rt2 -> rt3 by rotating twice.
    let h1 = unique("rt");
    let original = new_token(t.id, &h1, now);
    RefreshToken::insert(&pool, original.clone()).await.unwrap();

    let h2 = unique("rt");
    RefreshToken::rotate(
        &pool,
        t.id,
        original.client_id,
        &h1,
        SuccessorToken {
            token_hash: h2.clone(),
            created_at: now,
            expires_at: now + Duration::days(14),
        },
        now,
    )
    .await
    .unwrap();

    let h3 = unique("rt");
    RefreshToken::rotate(
        &pool,
        t.id,
        original.client_id,
        &h2,
        SuccessorToken {
            token_hash: h3.clone(),
            created_at: now,
            expires_at: now + Duration::days(14),
        },
        now,
    )
    .await
    .unwrap();

    // rt3 is the only live token. Replaying rt1 must kill it too.
    let err = RefreshToken::rotate(
        &pool,
        t.id,
        original.client_id,
        &h1,
        SuccessorToken {
            token_hash: unique("rt"),
            created_at: now,
            expires_at: now + Duration::days(14),
        },
        now,
    )
    .await
    .unwrap_err();
    assert!(matches!(err, RefreshRotateError::Replayed));

    for hash in [&h2, &h3] {
        let row = RefreshToken::find_by_hash(&pool, t.id, hash)
            .await
            .unwrap()
            .unwrap();
        assert!(row.is_revoked(), "descendant {hash} must be revoked");
    }
}

#[tokio::test]
async fn test_rotate_expired_leaves_the_row_untouched() {
    let pool = pool().await;
    let t = tenant(&pool).await;
    let now = Utc::now();

    let hash = unique("rt");
    let mut stale = new_token(t.id, &hash, now - Duration::days(15));
    stale.expires_at = now - Duration::days(1);
    let client_id = stale.client_id;
    RefreshToken::insert(&pool, stale).await.unwrap();

    let err = RefreshToken::rotate(
        &pool,
        t.id,
        client_id,
        &hash,
        SuccessorToken {
            token_hash: unique("rt"),
            created_at: now,
            expires_at: now + Duration::days(14),
        },
        now,
    )
    .await
    .unwrap_err();
    assert!(matches!(err, RefreshRotateError::Expired));

    // The expired token was not revoked by the failed attempt.
    let row = RefreshToken::find_by_hash(&pool, t.id, &hash)
        .await
        .unwrap()
        .unwrap();
    assert!(row.revoked_at.is_none());
}

#[tokio::test]
async fn test_rotate_rejects_foreign_client() {
    let pool = pool().await;
    let t = tenant(&pool).await;
    let now = Utc::now();

    let hash = unique("rt");
    RefreshToken::insert(&pool, new_token(t.id, &hash, now)).await.unwrap();

    let err = RefreshToken::rotate(
        &pool,
        t.id,
        Uuid::new_v4(), // some other client
        &hash,
        SuccessorToken {
            token_hash: unique("rt"),
            created_at: now,
            expires_at: now + Duration::days(14),
        },
        now,
    )
    .await
    .unwrap_err();
    assert!(matches!(err, RefreshRotateError::NotFound));
}

#[tokio::test]
async fn test_key_rotation_keeps_one_active() {
    let pool = pool().await;
    let t = tenant(&pool).await;
    let now = Utc::now();

    let make = |tenant_id| {
        let keypair = generate_p256_keypair().unwrap();
        NewSigningKey::starting_now(
            tenant_id,
            keypair.kid.clone(),
            keypair.jwk,
            keypair.pkcs8_der,
            now,
            Duration::days(90),
        )
    };

    SigningKey::insert(&pool, make(t.id)).await.unwrap();
    SigningKey::rotate(&pool, make(t.id)).await.unwrap();
    let current = SigningKey::rotate(&pool, make(t.id)).await.unwrap();

    let active: Vec<SigningKey> =
        sqlx::query_as("SELECT * FROM signing_keys WHERE tenant_id = $1 AND status = 'active'")
            .bind(t.id)
            .fetch_all(&pool)
            .await
            .unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].kid, current.kid);

    // All keys still publish for verification until not_after passes.
    let verification = SigningKey::list_verification(&pool, t.id, now).await.unwrap();
    assert_eq!(verification.len(), 3);
}

#[tokio::test]
async fn test_session_touch_is_monotone() {
    let pool = pool().await;
    let t = tenant(&pool).await;
    let now = Utc::now();

    let session = Session::insert(
        &pool,
        NewSession {
            tenant_id: t.id,
            user_id: Uuid::new_v4(),
            client_id: None,
            ip: "203.0.113.9".to_string(),
            user_agent: "UA".to_string(),
            created_at: now,
        },
    )
    .await
    .unwrap();

    let later = now + Duration::minutes(10);
    assert_eq!(Session::touch(&pool, t.id, session.id, later).await.unwrap(), 1);

    // A stale racer cannot move last_seen_at backwards.
    let earlier = now + Duration::minutes(5);
    assert_eq!(Session::touch(&pool, t.id, session.id, earlier).await.unwrap(), 0);

    let row = Session::find_by_id(&pool, t.id, session.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(row.last_seen_at, later);
}
