//! Tenant resolution errors.

use thiserror::Error;

/// Why a host failed to resolve to a tenant.
#[derive(Debug, Error)]
pub enum TenantResolveError {
    /// No verified domain and no slug match for the host.
    #[error("tenant not found")]
    NotFound,

    /// The host matched a custom domain that has not been verified.
    #[error("domain not verified")]
    NotVerified,

    /// The lookup itself failed.
    #[error("storage failure: {0}")]
    Storage(#[from] sqlx::Error),
}
