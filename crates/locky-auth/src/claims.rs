//! Access-token claims.
//!
//! The claim set combines RFC 7519 standard claims with the engine's
//! tenant claims: `tid` (tenant), `sid` (session), `roles`, and `scope`.

use chrono::Utc;
use locky_core::TenantId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Claims carried by every issued access token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AccessClaims {
    /// Issuer: the tenant's issuer URL.
    pub iss: String,

    /// Subject: the user id, or the client id for client-credentials
    /// tokens.
    pub sub: String,

    /// Audience: the client the token was issued to.
    pub aud: String,

    /// Tenant the token is scoped to.
    pub tid: TenantId,

    /// Browser session backing the token, when one exists.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sid: Option<Uuid>,

    /// Roles held by the subject at issuance time.
    #[serde(default)]
    pub roles: Vec<String>,

    /// Granted scopes, space separated.
    #[serde(default)]
    pub scope: String,

    /// Issued-at, Unix seconds.
    pub iat: i64,

    /// Not-before, Unix seconds. Equal to `iat`.
    pub nbf: i64,

    /// Expiration, Unix seconds.
    pub exp: i64,

    /// Unique token identifier.
    pub jti: String,
}

impl AccessClaims {
    /// Start building a claim set.
    #[must_use]
    pub fn builder() -> AccessClaimsBuilder {
        AccessClaimsBuilder::default()
    }

    /// Whether the token carries the given scope.
    #[must_use]
    pub fn has_scope(&self, scope: &str) -> bool {
        self.scope.split_whitespace().any(|s| s == scope)
    }
}

/// Builder for [`AccessClaims`].
#[derive(Debug, Default)]
pub struct AccessClaimsBuilder {
    iss: Option<String>,
    sub: Option<String>,
    aud: Option<String>,
    tid: Option<TenantId>,
    sid: Option<Uuid>,
    roles: Vec<String>,
    scope: Option<String>,
    expires_in_secs: Option<i64>,
}

impl AccessClaimsBuilder {
    /// Set the issuer.
    #[must_use]
    pub fn issuer(mut self, iss: impl Into<String>) -> Self {
        self.iss = Some(iss.into());
        self
    }

    /// Set the subject.
    #[must_use]
    pub fn subject(mut self, sub: impl Into<String>) -> Self {
        self.sub = Some(sub.into());
        self
    }

    /// Set the audience.
    #[must_use]
    pub fn audience(mut self, aud: impl Into<String>) -> Self {
        self.aud = Some(aud.into());
        self
    }

    /// Set the tenant.
    #[must_use]
    pub fn tenant(mut self, tid: TenantId) -> Self {
        self.tid = Some(tid);
        self
    }

    /// Set the backing session.
    #[must_use]
    pub fn session(mut self, sid: Uuid) -> Self {
        self.sid = Some(sid);
        self
    }

    /// Set the subject's roles.
    #[must_use]
    pub fn roles(mut self, roles: Vec<String>) -> Self {
        self.roles = roles;
        self
    }

    /// Set the granted scope.
    #[must_use]
    pub fn scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    /// Set the token lifetime in seconds from now.
    #[must_use]
    pub fn expires_in_secs(mut self, secs: i64) -> Self {
        self.expires_in_secs = Some(secs);
        self
    }

    /// Build the claims, stamping `iat = nbf = now` and a random `jti`.
    #[must_use]
    pub fn build(self) -> AccessClaims {
        let now = Utc::now().timestamp();

        AccessClaims {
            iss: self.iss.unwrap_or_default(),
            sub: self.sub.unwrap_or_default(),
            aud: self.aud.unwrap_or_default(),
            tid: self.tid.unwrap_or_else(|| TenantId::from_uuid(Uuid::nil())),
            sid: self.sid,
            roles: self.roles,
            scope: self.scope.unwrap_or_default(),
            iat: now,
            nbf: now,
            exp: now + self.expires_in_secs.unwrap_or(900),
            jti: Uuid::new_v4().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_stamps_iat_nbf_exp() {
        let before = Utc::now().timestamp();
        let claims = AccessClaims::builder()
            .issuer("https://acme.auth.example.com")
            .subject("user-1")
            .audience("web")
            .tenant(TenantId::new())
            .scope("openid profile")
            .expires_in_secs(900)
            .build();
        let after = Utc::now().timestamp();

        assert!(claims.iat >= before && claims.iat <= after);
        assert_eq!(claims.nbf, claims.iat);
        assert_eq!(claims.exp, claims.iat + 900);
        assert!(!claims.jti.is_empty());
    }

    #[test]
    fn test_has_scope() {
        let claims = AccessClaims::builder().scope("openid profile email").build();
        assert!(claims.has_scope("profile"));
        assert!(!claims.has_scope("offline_access"));
    }

    #[test]
    fn test_sid_omitted_when_absent() {
        let claims = AccessClaims::builder().subject("user-1").build();
        let json = serde_json::to_string(&claims).unwrap();
        assert!(!json.contains("\"sid\""));
    }

    #[test]
    fn test_serde_round_trip() {
        let claims = AccessClaims::builder()
            .issuer("iss")
            .subject("sub")
            .audience("aud")
            .tenant(TenantId::new())
            .session(Uuid::new_v4())
            .roles(vec!["admin".to_string()])
            .scope("openid")
            .build();

        let json = serde_json::to_string(&claims).unwrap();
        let back: AccessClaims = serde_json::from_str(&json).unwrap();
        assert_eq!(back, claims);
    }
}
