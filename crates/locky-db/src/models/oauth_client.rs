//! Registered OAuth2 client entity model.

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// Grant type names.
pub const GRANT_AUTHORIZATION_CODE: &str = "authorization_code";
pub const GRANT_REFRESH_TOKEN: &str = "refresh_token";
pub const GRANT_CLIENT_CREDENTIALS: &str = "client_credentials";

/// A registered application that requests tokens.
///
/// A null `client_secret_hash` marks a public client: PKCE is mandatory
/// and the `client_credentials` grant is unavailable.
#[derive(Debug, Clone, FromRow)]
pub struct OAuthClient {
    /// Internal unique identifier.
    pub id: Uuid,

    pub tenant_id: Uuid,

    /// The OAuth2 `client_id` presented on the wire. Unique per tenant.
    pub client_id: String,

    /// Argon2id hash of the client secret; null for public clients.
    pub client_secret_hash: Option<String>,

    /// Registered redirect URIs, matched exactly.
    pub redirect_uris: Vec<String>,

    /// Registered post-logout redirect URIs, matched exactly.
    pub post_logout_redirect_uris: Vec<String>,

    /// Grant types the client may use.
    pub grant_types: Vec<String>,

    /// Response types the client may request.
    pub response_types: Vec<String>,

    /// Scopes the client may be granted.
    pub scopes: Vec<String>,

    /// Per-client access-token lifetime override, seconds.
    pub token_ttl_seconds: i32,

    /// Per-client refresh-token lifetime override, seconds.
    pub refresh_ttl_seconds: i32,

    pub created_at: DateTime<Utc>,
}

/// Data required to register a client.
#[derive(Debug, Clone)]
pub struct NewOAuthClient {
    pub tenant_id: Uuid,
    pub client_id: String,
    pub client_secret_hash: Option<String>,
    pub redirect_uris: Vec<String>,
    pub post_logout_redirect_uris: Vec<String>,
    pub grant_types: Vec<String>,
    pub response_types: Vec<String>,
    pub scopes: Vec<String>,
    pub token_ttl_seconds: i32,
    pub refresh_ttl_seconds: i32,
}

impl OAuthClient {
    /// Whether the client is public (no secret registered).
    #[must_use]
    pub fn is_public(&self) -> bool {
        self.client_secret_hash.is_none()
    }

    /// Whether `uri` exactly matches a registered redirect URI. No
    /// normalization, no wildcards.
    #[must_use]
    pub fn allows_redirect_uri(&self, uri: &str) -> bool {
        self.redirect_uris.iter().any(|u| u == uri)
    }

    /// Whether `uri` exactly matches a registered post-logout redirect URI.
    #[must_use]
    pub fn allows_post_logout_redirect_uri(&self, uri: &str) -> bool {
        self.post_logout_redirect_uris.iter().any(|u| u == uri)
    }

    /// Whether the client is registered for a grant type.
    #[must_use]
    pub fn allows_grant(&self, grant_type: &str) -> bool {
        self.grant_types.iter().any(|g| g == grant_type)
    }

    /// Insert a new client.
    pub async fn insert<'e, E>(executor: E, new: NewOAuthClient) -> Result<Self, sqlx::Error>
    where
        E: sqlx::PgExecutor<'e>,
    {
        sqlx::query_as(
            r"
            INSERT INTO oauth_clients (
                id, tenant_id, client_id, client_secret_hash,
                redirect_uris, post_logout_redirect_uris,
                grant_types, response_types, scopes,
                token_ttl_seconds, refresh_ttl_seconds
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING *
            ",
        )
        .bind(Uuid::new_v4())
        .bind(new.tenant_id)
        .bind(&new.client_id)
        .bind(&new.client_secret_hash)
        .bind(&new.redirect_uris)
        .bind(&new.post_logout_redirect_uris)
        .bind(&new.grant_types)
        .bind(&new.response_types)
        .bind(&new.scopes)
        .bind(new.token_ttl_seconds)
        .bind(new.refresh_ttl_seconds)
        .fetch_one(executor)
        .await
    }

    /// Find a client by its wire `client_id` within a tenant.
    pub async fn find_by_client_id<'e, E>(
        executor: E,
        tenant_id: Uuid,
        client_id: &str,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: sqlx::PgExecutor<'e>,
    {
        sqlx::query_as("SELECT * FROM oauth_clients WHERE tenant_id = $1 AND client_id = $2")
            .bind(tenant_id)
            .bind(client_id)
            .fetch_optional(executor)
            .await
    }

    /// Find a client by internal id within a tenant.
    pub async fn find_by_id<'e, E>(
        executor: E,
        tenant_id: Uuid,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: sqlx::PgExecutor<'e>,
    {
        sqlx::query_as("SELECT * FROM oauth_clients WHERE tenant_id = $1 AND id = $2")
            .bind(tenant_id)
            .bind(id)
            .fetch_optional(executor)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(secret_hash: Option<&str>) -> OAuthClient {
        OAuthClient {
            id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            client_id: "web".to_string(),
            client_secret_hash: secret_hash.map(String::from),
            redirect_uris: vec!["http://localhost:3000/callback".to_string()],
            post_logout_redirect_uris: vec!["http://localhost:3000/".to_string()],
            grant_types: vec![
                GRANT_AUTHORIZATION_CODE.to_string(),
                GRANT_REFRESH_TOKEN.to_string(),
            ],
            response_types: vec!["code".to_string()],
            scopes: vec!["openid".to_string(), "profile".to_string()],
            token_ttl_seconds: 900,
            refresh_ttl_seconds: 1_209_600,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_public_client() {
        assert!(client(None).is_public());
        assert!(!client(Some("$argon2id$...")).is_public());
    }

    #[test]
    fn test_redirect_uri_exact_match() {
        let c = client(None);
        assert!(c.allows_redirect_uri("http://localhost:3000/callback"));
        // Trailing slash is a different URI.
        assert!(!c.allows_redirect_uri("http://localhost:3000/callback/"));
        assert!(!c.allows_redirect_uri("http://localhost:3000"));
    }

    #[test]
    fn test_grant_registration() {
        let c = client(None);
        assert!(c.allows_grant(GRANT_AUTHORIZATION_CODE));
        assert!(c.allows_grant(GRANT_REFRESH_TOKEN));
        assert!(!c.allows_grant(GRANT_CLIENT_CREDENTIALS));
    }

    #[test]
    fn test_post_logout_uri_match() {
        let c = client(None);
        assert!(c.allows_post_logout_redirect_uri("http://localhost:3000/"));
        assert!(!c.allows_post_logout_redirect_uri("http://localhost:3000"));
    }
}
