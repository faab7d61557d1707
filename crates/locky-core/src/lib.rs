//! Core types and contracts for the locky identity engine.
//!
//! This crate carries what every other engine crate needs: strongly typed
//! identifiers, the immutable [`EngineConfig`], the audit event model, and
//! the behavior contracts ([`Authorizer`], [`AuditSink`], [`Clock`]) the
//! host injects at construction time.

pub mod audit;
pub mod config;
pub mod ids;
pub mod traits;

pub use audit::{AuditActor, AuditEvent};
pub use config::{ConfigError, EngineConfig, EngineConfigBuilder, DEFAULT_SESSION_COOKIE};
pub use ids::{ParseIdError, TenantId, UserId};
pub use traits::{
    AuditSink, Authorizer, AuthzError, Clock, LogAuditSink, SharedClock, StaticRoles, SystemClock,
};
