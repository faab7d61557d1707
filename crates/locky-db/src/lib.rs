//! Postgres entity models and queries for the locky identity engine.
//!
//! Every per-tenant entity carries `tenant_id` and every query here
//! filters by it; cross-tenant reads are impossible through this crate's
//! API. Single-use and rotation state machines are enforced with row
//! locks plus conditional-update predicates, never read-then-write.
//!
//! Connection pooling and schema migration are the host's concern; all
//! functions take an executor or a pool.

pub mod models;

pub use models::{
    AuthorizationCode, CodeConsumeError, NewAuthorizationCode, NewOAuthClient, NewRefreshToken,
    NewSession, NewSigningKey, OAuthClient, RefreshRotateError, RefreshToken, Session, SigningKey,
    SuccessorToken, Tenant, TenantDomain, User, UserCredential,
};
