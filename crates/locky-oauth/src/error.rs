//! OAuth2/OIDC error types.
//!
//! The engine returns typed errors; the adapter serializes them onto the
//! wire using [`OAuthError::error_code`], which yields the RFC 6749 error
//! string.

use locky_auth::AuthError;
use locky_db::{CodeConsumeError, RefreshRotateError};
use locky_tenant::TenantResolveError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// OAuth2 error codes as defined in RFC 6749.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OAuthErrorCode {
    /// The request is missing a required parameter or is malformed.
    InvalidRequest,
    /// Client authentication failed.
    InvalidClient,
    /// The authorization grant or refresh token is invalid.
    InvalidGrant,
    /// The client is not authorized for this grant type.
    UnauthorizedClient,
    /// The grant type is not supported.
    UnsupportedGrantType,
    /// The requested scope is invalid or exceeds what may be granted.
    InvalidScope,
    /// The resource owner or the server denied the request.
    AccessDenied,
    /// The response type is not supported.
    UnsupportedResponseType,
    /// The server encountered an unexpected condition.
    ServerError,
    /// The server is temporarily unable to handle the request.
    TemporarilyUnavailable,
}

impl std::fmt::Display for OAuthErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::InvalidRequest => "invalid_request",
            Self::InvalidClient => "invalid_client",
            Self::InvalidGrant => "invalid_grant",
            Self::UnauthorizedClient => "unauthorized_client",
            Self::UnsupportedGrantType => "unsupported_grant_type",
            Self::InvalidScope => "invalid_scope",
            Self::AccessDenied => "access_denied",
            Self::UnsupportedResponseType => "unsupported_response_type",
            Self::ServerError => "server_error",
            Self::TemporarilyUnavailable => "temporarily_unavailable",
        };
        write!(f, "{s}")
    }
}

/// OAuth2 error response body following RFC 6749 §5.2.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuthErrorResponse {
    pub error: OAuthErrorCode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_description: Option<String>,
}

impl OAuthErrorResponse {
    /// Create an error response with a description.
    pub fn new(error: OAuthErrorCode, description: impl Into<String>) -> Self {
        Self {
            error,
            error_description: Some(description.into()),
        }
    }
}

/// Engine error taxonomy.
#[derive(Debug, Error)]
pub enum OAuthError {
    // Tenant resolution
    /// No tenant matches the request host.
    #[error("tenant not found")]
    TenantNotFound,

    /// The tenant is suspended; every operation fails closed.
    #[error("tenant suspended")]
    TenantSuspended,

    /// The request host matches an unverified custom domain.
    #[error("domain not verified")]
    DomainUnverified,

    // Authorize / token entry
    /// A required parameter is missing or malformed.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// No such client for this tenant.
    #[error("unknown client")]
    UnknownClient,

    /// The presented redirect URI is not registered for the client.
    #[error("invalid redirect uri")]
    InvalidRedirectUri,

    /// Only `response_type=code` is supported.
    #[error("unsupported response type: {0}")]
    UnsupportedResponseType(String),

    /// The grant type is not supported or not registered for the client.
    #[error("unsupported grant type: {0}")]
    UnsupportedGrantType(String),

    /// The client is not registered for the requested grant.
    #[error("client not authorized for grant type: {0}")]
    UnauthorizedClient(String),

    /// PKCE is required: `code_challenge` with method `S256`.
    #[error("missing or unsupported PKCE challenge")]
    MissingPkce,

    /// Client authentication failed.
    #[error("invalid client: {0}")]
    InvalidClient(String),

    /// The requested scope exceeds what may be granted.
    #[error("invalid scope: {0}")]
    InvalidScope(String),

    // Login
    /// Email or password is wrong, or no such user. Deliberately
    /// indistinguishable.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// The user exists but is disabled.
    #[error("user disabled")]
    UserDisabled,

    // Code consumption
    /// No authorization code with this value.
    #[error("authorization code not found")]
    CodeNotFound,

    /// The authorization code expired before it was exchanged.
    #[error("authorization code expired")]
    CodeExpired,

    /// The authorization code was already exchanged once.
    #[error("authorization code already used")]
    CodeAlreadyUsed,

    /// The PKCE verifier does not match the stored challenge.
    #[error("PKCE verifier mismatch")]
    PkceMismatch,

    // Refresh rotation
    /// No refresh token with this value.
    #[error("refresh token not found")]
    RefreshTokenNotFound,

    /// The refresh token expired.
    #[error("refresh token expired")]
    RefreshTokenExpired,

    /// The refresh token was explicitly revoked.
    #[error("refresh token revoked")]
    RefreshTokenRevoked,

    /// A rotated or revoked refresh token was presented again; its
    /// descendant chain has been revoked.
    #[error("refresh token replay detected")]
    RefreshTokenReplay,

    // Sessions
    /// No such session for this tenant.
    #[error("session not found")]
    SessionNotFound,

    /// The session passed its absolute lifetime.
    #[error("session expired")]
    SessionExpired,

    /// The session was revoked.
    #[error("session revoked")]
    SessionRevoked,

    // Keys
    /// The tenant has no key usable for the requested operation.
    #[error("no usable signing key for tenant")]
    SigningKeyUnavailable,

    // Infrastructure
    /// A cryptographic operation failed.
    #[error("crypto failure: {0}")]
    Crypto(#[from] AuthError),

    /// The storage layer failed.
    #[error("storage failure: {0}")]
    Storage(#[from] sqlx::Error),

    /// Unexpected internal condition.
    #[error("internal error: {0}")]
    Internal(String),
}

impl OAuthError {
    /// The RFC 6749 error code the adapter should put on the wire.
    #[must_use]
    pub fn error_code(&self) -> OAuthErrorCode {
        match self {
            Self::InvalidRequest(_) | Self::TenantNotFound | Self::DomainUnverified => {
                OAuthErrorCode::InvalidRequest
            }
            Self::TenantSuspended => OAuthErrorCode::AccessDenied,
            Self::UnknownClient | Self::InvalidClient(_) => OAuthErrorCode::InvalidClient,
            Self::InvalidRedirectUri | Self::MissingPkce => OAuthErrorCode::InvalidRequest,
            Self::UnsupportedResponseType(_) => OAuthErrorCode::UnsupportedResponseType,
            Self::UnsupportedGrantType(_) => OAuthErrorCode::UnsupportedGrantType,
            Self::UnauthorizedClient(_) => OAuthErrorCode::UnauthorizedClient,
            Self::InvalidScope(_) => OAuthErrorCode::InvalidScope,
            Self::InvalidCredentials | Self::UserDisabled => OAuthErrorCode::AccessDenied,
            Self::CodeNotFound
            | Self::CodeExpired
            | Self::CodeAlreadyUsed
            | Self::PkceMismatch
            | Self::RefreshTokenNotFound
            | Self::RefreshTokenExpired
            | Self::RefreshTokenRevoked
            | Self::RefreshTokenReplay => OAuthErrorCode::InvalidGrant,
            Self::SessionNotFound | Self::SessionExpired | Self::SessionRevoked => {
                OAuthErrorCode::AccessDenied
            }
            Self::SigningKeyUnavailable
            | Self::Crypto(_)
            | Self::Storage(_)
            | Self::Internal(_) => OAuthErrorCode::ServerError,
        }
    }

    /// Build the RFC 6749 wire body for this error.
    #[must_use]
    pub fn to_response(&self) -> OAuthErrorResponse {
        OAuthErrorResponse::new(self.error_code(), self.to_string())
    }
}

impl From<CodeConsumeError> for OAuthError {
    fn from(err: CodeConsumeError) -> Self {
        match err {
            CodeConsumeError::NotFound => Self::CodeNotFound,
            CodeConsumeError::AlreadyUsed => Self::CodeAlreadyUsed,
            CodeConsumeError::Expired => Self::CodeExpired,
            CodeConsumeError::Storage(e) => Self::Storage(e),
        }
    }
}

impl From<RefreshRotateError> for OAuthError {
    fn from(err: RefreshRotateError) -> Self {
        match err {
            RefreshRotateError::NotFound => Self::RefreshTokenNotFound,
            RefreshRotateError::Replayed => Self::RefreshTokenReplay,
            RefreshRotateError::Expired => Self::RefreshTokenExpired,
            RefreshRotateError::Storage(e) => Self::Storage(e),
        }
    }
}

impl From<TenantResolveError> for OAuthError {
    fn from(err: TenantResolveError) -> Self {
        match err {
            TenantResolveError::NotFound => Self::TenantNotFound,
            TenantResolveError::NotVerified => Self::DomainUnverified,
            TenantResolveError::Storage(e) => Self::Storage(e),
        }
    }
}

impl From<locky_core::AuthzError> for OAuthError {
    fn from(err: locky_core::AuthzError) -> Self {
        Self::Internal(err.to_string())
    }
}
