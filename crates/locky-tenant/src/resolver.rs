//! Host-based tenant resolution.
//!
//! Two-step lookup: an exact match against verified custom domains wins;
//! otherwise a `<slug>.<base_domain>` host resolves through the tenant
//! slug. Everything else fails closed.
//!
//! Suspended tenants DO resolve — rejection happens in the downstream
//! operation so that requests for a suspended tenant remain attributable.

use crate::error::TenantResolveError;
use locky_db::{Tenant, TenantDomain};
use sqlx::PgPool;

/// Resolves inbound host names to tenants.
#[derive(Debug, Clone)]
pub struct TenantResolver {
    pool: PgPool,
    base_domain: String,
}

impl TenantResolver {
    /// Create a resolver for the given base domain.
    #[must_use]
    pub fn new(pool: PgPool, base_domain: impl Into<String>) -> Self {
        Self {
            pool,
            base_domain: normalize_host(&base_domain.into()),
        }
    }

    /// Map a host string to exactly one tenant.
    ///
    /// # Errors
    ///
    /// - `TenantResolveError::NotFound` - no verified domain and no slug
    ///   match (including empty/malformed hosts)
    /// - `TenantResolveError::NotVerified` - the host matches a custom
    ///   domain whose ownership has not been proven
    /// - `TenantResolveError::Storage` - the lookup itself failed
    pub async fn resolve(&self, host: &str) -> Result<Tenant, TenantResolveError> {
        let host = normalize_host(host);
        if host.is_empty() {
            return Err(TenantResolveError::NotFound);
        }

        // Custom domains take precedence over slug subdomains.
        if let Some(domain) = TenantDomain::find_by_domain(&self.pool, &host).await? {
            if !domain.is_verified() {
                tracing::debug!(host = %host, "domain matched but is unverified");
                return Err(TenantResolveError::NotVerified);
            }
            return Tenant::find_by_id(&self.pool, domain.tenant_id)
                .await?
                .ok_or(TenantResolveError::NotFound);
        }

        if let Some(slug) = extract_slug(&host, &self.base_domain) {
            return Tenant::find_by_slug(&self.pool, &slug)
                .await?
                .ok_or(TenantResolveError::NotFound);
        }

        Err(TenantResolveError::NotFound)
    }
}

/// Reduce a host string to a bare lowercase hostname: strip a scheme and
/// path if the caller passed a URL, strip the port, lowercase.
#[must_use]
pub fn normalize_host(host: &str) -> String {
    let mut host = host.trim();

    if let Some(idx) = host.find("://") {
        host = &host[idx + 3..];
    }
    if let Some(idx) = host.find('/') {
        host = &host[..idx];
    }
    if let Some(idx) = host.find(':') {
        host = &host[..idx];
    }

    host.to_ascii_lowercase()
}

/// Extract the tenant slug from a subdomain of `base_domain`.
///
/// `acme.auth.example.com` under base `auth.example.com` yields `acme`;
/// a multi-level prefix like `eu.acme.auth.example.com` yields its
/// leftmost label `eu`. The host must sit on a dot boundary: a host that
/// merely ends with the base domain's characters does not match.
#[must_use]
pub fn extract_slug(host: &str, base_domain: &str) -> Option<String> {
    let host = normalize_host(host);
    let base_domain = normalize_host(base_domain);

    if base_domain.is_empty() || host == base_domain {
        return None;
    }

    let prefix = host.strip_suffix(&base_domain)?.strip_suffix('.')?;

    let label = prefix.split('.').next().unwrap_or("");
    if label.is_empty() {
        return None;
    }
    Some(label.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_strips_port() {
        assert_eq!(normalize_host("acme.example.com:8080"), "acme.example.com");
    }

    #[test]
    fn test_normalize_strips_scheme_and_path() {
        assert_eq!(
            normalize_host("https://acme.example.com/login?x=1"),
            "acme.example.com"
        );
        assert_eq!(
            normalize_host("http://acme.example.com:3000/cb"),
            "acme.example.com"
        );
    }

    #[test]
    fn test_normalize_lowercases() {
        assert_eq!(normalize_host("ACME.Example.COM"), "acme.example.com");
    }

    #[test]
    fn test_normalize_is_deterministic() {
        let inputs = ["Acme.Example.com:443", "acme.example.com"];
        for input in inputs {
            assert_eq!(normalize_host(input), normalize_host(input));
        }
    }

    #[test]
    fn test_normalize_empty() {
        assert_eq!(normalize_host(""), "");
        assert_eq!(normalize_host("   "), "");
    }

    #[test]
    fn test_extract_slug_simple() {
        assert_eq!(
            extract_slug("acme.auth.example.com", "auth.example.com"),
            Some("acme".to_string())
        );
    }

    #[test]
    fn test_extract_slug_multi_level_takes_leftmost() {
        assert_eq!(
            extract_slug("eu.acme.auth.example.com", "auth.example.com"),
            Some("eu".to_string())
        );
    }

    #[test]
    fn test_extract_slug_case_insensitive() {
        assert_eq!(
            extract_slug("ACME.Auth.Example.Com", "auth.example.com"),
            Some("acme".to_string())
        );
    }

    #[test]
    fn test_extract_slug_bare_base_domain() {
        assert_eq!(extract_slug("auth.example.com", "auth.example.com"), None);
    }

    #[test]
    fn test_extract_slug_unrelated_host() {
        assert_eq!(extract_slug("login.acme.com", "auth.example.com"), None);
    }

    #[test]
    fn test_extract_slug_requires_dot_boundary() {
        // Ends with the base domain's characters but not on a label
        // boundary; must not resolve.
        assert_eq!(extract_slug("evilauth.example.com", "auth.example.com"), None);
    }

    #[test]
    fn test_extract_slug_with_port() {
        assert_eq!(
            extract_slug("acme.auth.example.com:8443", "auth.example.com"),
            Some("acme".to_string())
        );
    }

    #[test]
    fn test_extract_slug_empty_inputs() {
        assert_eq!(extract_slug("", "auth.example.com"), None);
        assert_eq!(extract_slug("acme.auth.example.com", ""), None);
    }
}
