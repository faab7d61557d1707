//! Entity models and their tenant-scoped queries.

pub mod authorization_code;
pub mod oauth_client;
pub mod refresh_token;
pub mod session;
pub mod signing_key;
pub mod tenant;
pub mod tenant_domain;
pub mod user;
pub mod user_credential;

pub use authorization_code::{AuthorizationCode, CodeConsumeError, NewAuthorizationCode};
pub use oauth_client::{NewOAuthClient, OAuthClient};
pub use refresh_token::{NewRefreshToken, RefreshRotateError, RefreshToken, SuccessorToken};
pub use session::{NewSession, Session};
pub use signing_key::{NewSigningKey, SigningKey};
pub use tenant::Tenant;
pub use tenant_domain::TenantDomain;
pub use user::User;
pub use user_credential::UserCredential;
