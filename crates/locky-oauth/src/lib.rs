//! OAuth2/OIDC flow orchestration for the locky identity engine.
//!
//! This crate wires the storage models and crypto primitives into the
//! protocol services: key lifecycle ([`KeyService`]), token issuance and
//! rotation ([`TokenService`]), sessions ([`SessionService`]), end-user
//! login ([`LoginService`]), the grant flows ([`OAuthService`]), and the
//! background [`Sweeper`]. A thin HTTP adapter resolves the tenant (via
//! `locky-tenant`), decodes the wire forms into the `models` types, and
//! maps [`OAuthError`] onto RFC 6749 responses.

pub mod engine;
pub mod error;
pub mod models;
pub mod services;
pub mod sweeper;

pub use engine::{ClientRegistration, Engine};
pub use error::{OAuthError, OAuthErrorCode, OAuthErrorResponse};
pub use models::{
    AuthorizeRequest, AuthorizeResponse, DiscoveryDocument, IntrospectionResponse, TokenRequest,
    TokenResponse, UserInfo,
};
pub use services::{KeyService, LoginService, OAuthService, SessionService, TokenService};
pub use sweeper::{SweepReport, Sweeper};
