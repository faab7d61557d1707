//! OAuth2/OIDC flow orchestration.
//!
//! The entry points mirror the protocol surface: `authorize`, `token`
//! (three grants), `revoke`, `introspect`, `userinfo`, and `logout`.
//! Every operation takes the already-resolved tenant and fails closed
//! when it is suspended.

use crate::error::OAuthError;
use crate::models::{
    AuthorizeRequest, AuthorizeResponse, DiscoveryDocument, IntrospectionResponse, TokenRequest,
    TokenResponse, UserInfo,
};
use crate::services::session::SessionService;
use crate::services::token::TokenService;
use locky_auth::{generate_opaque_token, token_digest, verify_code_verifier, METHOD_S256};
use locky_core::{AuditActor, AuditEvent, AuditSink, Authorizer, EngineConfig, SharedClock};
use locky_db::models::oauth_client;
use locky_db::{AuthorizationCode, NewAuthorizationCode, OAuthClient, Tenant, User};
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

/// Orchestrates the authorization-code, refresh-token, and
/// client-credentials grants, plus revocation, introspection, userinfo,
/// and logout.
pub struct OAuthService {
    pool: PgPool,
    config: EngineConfig,
    tokens: Arc<TokenService>,
    sessions: Arc<SessionService>,
    authorizer: Arc<dyn Authorizer>,
    audit: Arc<dyn AuditSink>,
    clock: SharedClock,
}

impl OAuthService {
    /// Create the OAuth service with its collaborators injected.
    #[must_use]
    pub fn new(
        pool: PgPool,
        config: EngineConfig,
        tokens: Arc<TokenService>,
        sessions: Arc<SessionService>,
        authorizer: Arc<dyn Authorizer>,
        audit: Arc<dyn AuditSink>,
        clock: SharedClock,
    ) -> Self {
        Self {
            pool,
            config,
            tokens,
            sessions,
            authorizer,
            audit,
            clock,
        }
    }

    /// Handle an authorization request (`response_type=code` only).
    ///
    /// The end user must already be authenticated; `req.user_id` names
    /// them. On success the returned plaintext code is delivered to the
    /// client via redirect and is never seen again by the engine.
    pub async fn authorize(
        &self,
        tenant: &Tenant,
        req: &AuthorizeRequest,
    ) -> Result<AuthorizeResponse, OAuthError> {
        if tenant.is_suspended() {
            return Err(OAuthError::TenantSuspended);
        }

        let client = OAuthClient::find_by_client_id(&self.pool, tenant.id, &req.client_id)
            .await?
            .ok_or(OAuthError::UnknownClient)?;

        if req.response_type != "code" || !client.response_types.iter().any(|r| r == "code") {
            return Err(OAuthError::UnsupportedResponseType(req.response_type.clone()));
        }

        if !client.allows_redirect_uri(&req.redirect_uri) {
            return Err(OAuthError::InvalidRedirectUri);
        }

        if !client.allows_grant(oauth_client::GRANT_AUTHORIZATION_CODE) {
            return Err(OAuthError::UnauthorizedClient(
                oauth_client::GRANT_AUTHORIZATION_CODE.to_string(),
            ));
        }

        // PKCE is mandatory for every client, public or confidential.
        if req.code_challenge.is_empty() || req.code_challenge_method != METHOD_S256 {
            return Err(OAuthError::MissingPkce);
        }

        let user = User::find_by_id(&self.pool, tenant.id, req.user_id)
            .await?
            .ok_or(OAuthError::InvalidCredentials)?;
        if !user.is_active() {
            return Err(OAuthError::UserDisabled);
        }

        self.check_scopes(&client, &req.scope)?;

        let code = generate_opaque_token();
        let now = self.clock.now();

        AuthorizationCode::insert(
            &self.pool,
            NewAuthorizationCode {
                code_hash: token_digest(&code),
                tenant_id: tenant.id,
                client_id: client.id,
                user_id: user.id,
                redirect_uri: req.redirect_uri.clone(),
                pkce_challenge: req.code_challenge.clone(),
                pkce_method: METHOD_S256.to_string(),
                scope: req.scope.clone(),
                created_at: now,
                expires_at: now + self.config.code_ttl,
            },
        )
        .await?;

        self.audit
            .record(
                AuditEvent::new(tenant.id, AuditActor::User, "oauth.authorize")
                    .actor_id(user.id)
                    .data(serde_json::json!({
                        "client_id": req.client_id,
                        "scope": req.scope,
                    })),
            )
            .await;

        Ok(AuthorizeResponse {
            code,
            state: req.state.clone(),
            redirect_uri: req.redirect_uri.clone(),
        })
    }

    /// Handle a token request, dispatching on `grant_type`.
    pub async fn token(
        &self,
        tenant: &Tenant,
        req: &TokenRequest,
    ) -> Result<TokenResponse, OAuthError> {
        if tenant.is_suspended() {
            return Err(OAuthError::TenantSuspended);
        }

        match req.grant_type.as_str() {
            "authorization_code" => self.exchange_authorization_code(tenant, req).await,
            "refresh_token" => self.exchange_refresh_token(tenant, req).await,
            "client_credentials" => self.client_credentials(tenant, req).await,
            other => Err(OAuthError::UnsupportedGrantType(other.to_string())),
        }
    }

    async fn exchange_authorization_code(
        &self,
        tenant: &Tenant,
        req: &TokenRequest,
    ) -> Result<TokenResponse, OAuthError> {
        let client = self
            .load_client_for_grant(tenant, req, oauth_client::GRANT_AUTHORIZATION_CODE)
            .await?;
        self.authenticate_client(&client, req.client_secret.as_deref())
            .await?;

        let plaintext = req
            .code
            .as_deref()
            .ok_or_else(|| OAuthError::InvalidRequest("code is required".to_string()))?;

        // Single-use consumption happens FIRST: a code burns even when the
        // verifier below turns out to be wrong.
        let code = AuthorizationCode::get_and_consume(
            &self.pool,
            tenant.id,
            &token_digest(plaintext),
            self.clock.now(),
        )
        .await
        .map_err(|e| {
            if matches!(e, locky_db::CodeConsumeError::AlreadyUsed) {
                tracing::warn!(tenant_id = %tenant.id, client_id = %req.client_id,
                    "authorization code replay attempt");
            }
            OAuthError::from(e)
        })?;

        if code.client_id != client.id {
            return Err(OAuthError::CodeNotFound);
        }

        let presented_uri = req
            .redirect_uri
            .as_deref()
            .ok_or_else(|| OAuthError::InvalidRequest("redirect_uri is required".to_string()))?;
        if code.redirect_uri != presented_uri {
            return Err(OAuthError::InvalidRedirectUri);
        }

        let verifier = req.code_verifier.as_deref().ok_or(OAuthError::MissingPkce)?;
        if !verify_code_verifier(verifier, &code.pkce_challenge) {
            return Err(OAuthError::PkceMismatch);
        }

        let roles = self
            .authorizer
            .roles_for_user(tenant.id, code.user_id)
            .await?;

        let access_token = self
            .tokens
            .issue_access_token(tenant, Some(code.user_id), &client, &code.scope, roles, None)
            .await?;
        let refresh_token = self
            .tokens
            .issue_refresh_token(tenant.id, code.user_id, &client, &code.scope)
            .await?;

        self.audit
            .record(
                AuditEvent::new(tenant.id, AuditActor::User, "oauth.token")
                    .actor_id(code.user_id)
                    .data(serde_json::json!({
                        "client_id": client.client_id,
                        "grant_type": "authorization_code",
                    })),
            )
            .await;

        Ok(TokenResponse {
            access_token,
            token_type: "Bearer".to_string(),
            expires_in: self.tokens.access_ttl_for(&client),
            refresh_token: Some(refresh_token),
            scope: Some(code.scope),
        })
    }

    async fn exchange_refresh_token(
        &self,
        tenant: &Tenant,
        req: &TokenRequest,
    ) -> Result<TokenResponse, OAuthError> {
        let client = self
            .load_client_for_grant(tenant, req, oauth_client::GRANT_REFRESH_TOKEN)
            .await?;
        self.authenticate_client(&client, req.client_secret.as_deref())
            .await?;

        let plaintext = req
            .refresh_token
            .as_deref()
            .ok_or_else(|| OAuthError::InvalidRequest("refresh_token is required".to_string()))?;

        let (rotated, new_refresh_token) = self
            .tokens
            .rotate_refresh_token(tenant.id, plaintext, &client)
            .await?;

        // Scope may narrow on refresh, never widen.
        let scope = match req.scope.as_deref().filter(|s| !s.is_empty()) {
            Some(requested) => {
                let granted = rotated.scopes();
                for s in requested.split_whitespace() {
                    if !granted.contains(&s) {
                        return Err(OAuthError::InvalidScope(s.to_string()));
                    }
                }
                requested.to_string()
            }
            None => rotated.scope.clone(),
        };

        let roles = self
            .authorizer
            .roles_for_user(tenant.id, rotated.user_id)
            .await?;

        let access_token = self
            .tokens
            .issue_access_token(tenant, Some(rotated.user_id), &client, &scope, roles, None)
            .await?;

        self.audit
            .record(
                AuditEvent::new(tenant.id, AuditActor::User, "oauth.token")
                    .actor_id(rotated.user_id)
                    .data(serde_json::json!({
                        "client_id": client.client_id,
                        "grant_type": "refresh_token",
                    })),
            )
            .await;

        Ok(TokenResponse {
            access_token,
            token_type: "Bearer".to_string(),
            expires_in: self.tokens.access_ttl_for(&client),
            refresh_token: Some(new_refresh_token),
            scope: Some(scope),
        })
    }

    async fn client_credentials(
        &self,
        tenant: &Tenant,
        req: &TokenRequest,
    ) -> Result<TokenResponse, OAuthError> {
        let client = self
            .load_client_for_grant(tenant, req, oauth_client::GRANT_CLIENT_CREDENTIALS)
            .await?;

        // Public clients have nothing to authenticate with.
        if client.is_public() {
            return Err(OAuthError::InvalidClient(
                "public clients may not use client_credentials".to_string(),
            ));
        }
        self.authenticate_client(&client, req.client_secret.as_deref())
            .await?;

        let scope = match req.scope.as_deref().filter(|s| !s.is_empty()) {
            Some(requested) => {
                self.check_scopes(&client, requested)?;
                requested.to_string()
            }
            None => client.scopes.join(" "),
        };

        let access_token = self
            .tokens
            .issue_access_token(tenant, None, &client, &scope, Vec::new(), None)
            .await?;

        self.audit
            .record(
                AuditEvent::new(tenant.id, AuditActor::Client, "oauth.token")
                    .actor_id(client.id)
                    .data(serde_json::json!({
                        "client_id": client.client_id,
                        "grant_type": "client_credentials",
                    })),
            )
            .await;

        Ok(TokenResponse {
            access_token,
            token_type: "Bearer".to_string(),
            expires_in: self.tokens.access_ttl_for(&client),
            refresh_token: None,
            scope: Some(scope),
        })
    }

    /// Revoke a token (RFC 7009). Succeeds whether or not the token
    /// existed so callers cannot probe.
    pub async fn revoke(&self, tenant: &Tenant, token: &str) -> Result<(), OAuthError> {
        if tenant.is_suspended() {
            return Err(OAuthError::TenantSuspended);
        }

        self.tokens.revoke_refresh_token(tenant.id, token).await?;

        self.audit
            .record(AuditEvent::new(tenant.id, AuditActor::Client, "oauth.revoke"))
            .await;

        Ok(())
    }

    /// Introspect a token (RFC 7662). Refresh tokens are looked up by
    /// digest; anything else is treated as an access token and verified.
    /// Unknown, revoked, and expired tokens are all the same inactive
    /// response.
    pub async fn introspect(
        &self,
        tenant: &Tenant,
        token: &str,
    ) -> Result<IntrospectionResponse, OAuthError> {
        if tenant.is_suspended() {
            return Err(OAuthError::TenantSuspended);
        }

        if let Some(rt) = self.tokens.find_refresh_token(tenant.id, token).await? {
            if rt.is_revoked() || rt.is_expired(self.clock.now()) {
                return Ok(IntrospectionResponse::inactive());
            }

            let aud = OAuthClient::find_by_id(&self.pool, tenant.id, rt.client_id)
                .await?
                .map(|c| c.client_id);

            return Ok(IntrospectionResponse {
                active: true,
                sub: Some(rt.user_id.to_string()),
                aud,
                tid: Some(tenant.id),
                scope: Some(rt.scope),
                exp: Some(rt.expires_at.timestamp()),
            });
        }

        match self.tokens.validate_access_token(token).await {
            Ok(claims) if claims.tid.as_uuid() == &tenant.id => Ok(IntrospectionResponse {
                active: true,
                sub: Some(claims.sub),
                aud: Some(claims.aud),
                tid: Some(tenant.id),
                scope: Some(claims.scope),
                exp: Some(claims.exp),
            }),
            _ => Ok(IntrospectionResponse::inactive()),
        }
    }

    /// OIDC userinfo: validate the access token and return the subject's
    /// profile claims.
    pub async fn userinfo(&self, tenant: &Tenant, access_token: &str) -> Result<UserInfo, OAuthError> {
        if tenant.is_suspended() {
            return Err(OAuthError::TenantSuspended);
        }

        let claims = self.tokens.validate_access_token(access_token).await?;

        if claims.tid.as_uuid() != &tenant.id {
            return Err(OAuthError::Crypto(locky_auth::AuthError::InvalidToken(
                "token was issued for another tenant".to_string(),
            )));
        }
        if !claims.has_scope("openid") {
            return Err(OAuthError::InvalidScope("openid scope required".to_string()));
        }

        let user_id: Uuid = claims
            .sub
            .parse()
            .map_err(|_| OAuthError::InvalidCredentials)?;
        let user = User::find_by_id(&self.pool, tenant.id, user_id)
            .await?
            .ok_or(OAuthError::InvalidCredentials)?;

        Ok(UserInfo {
            sub: user.id.to_string(),
            email: Some(user.email),
            email_verified: Some(user.email_verified),
            name: user.display_name,
        })
    }

    /// End a browser session. When the client supplied a
    /// `post_logout_redirect_uri`, it is returned only if registered for
    /// that client; unregistered targets are dropped.
    pub async fn logout(
        &self,
        tenant: &Tenant,
        session_id: Uuid,
        client_id: Option<&str>,
        post_logout_redirect_uri: Option<&str>,
    ) -> Result<Option<String>, OAuthError> {
        if tenant.is_suspended() {
            return Err(OAuthError::TenantSuspended);
        }

        self.sessions.revoke(tenant.id, session_id).await?;

        self.audit
            .record(
                AuditEvent::new(tenant.id, AuditActor::User, "session.logout")
                    .data(serde_json::json!({ "session_id": session_id })),
            )
            .await;

        let (Some(client_id), Some(uri)) = (client_id, post_logout_redirect_uri) else {
            return Ok(None);
        };

        let redirect = OAuthClient::find_by_client_id(&self.pool, tenant.id, client_id)
            .await?
            .filter(|c| c.allows_post_logout_redirect_uri(uri))
            .map(|_| uri.to_string());

        if redirect.is_none() {
            tracing::debug!(tenant_id = %tenant.id, "unregistered post-logout redirect dropped");
        }
        Ok(redirect)
    }

    /// The discovery document for a tenant.
    #[must_use]
    pub fn discovery(&self, tenant: &Tenant) -> DiscoveryDocument {
        DiscoveryDocument::for_issuer(&self.config.issuer_for(&tenant.slug))
    }

    async fn load_client_for_grant(
        &self,
        tenant: &Tenant,
        req: &TokenRequest,
        grant: &str,
    ) -> Result<OAuthClient, OAuthError> {
        let client = OAuthClient::find_by_client_id(&self.pool, tenant.id, &req.client_id)
            .await?
            .ok_or(OAuthError::UnknownClient)?;

        if !client.allows_grant(grant) {
            return Err(OAuthError::UnauthorizedClient(grant.to_string()));
        }
        Ok(client)
    }

    /// Authenticate a confidential client by its secret. Public clients
    /// pass through; their proof is PKCE.
    async fn authenticate_client(
        &self,
        client: &OAuthClient,
        client_secret: Option<&str>,
    ) -> Result<(), OAuthError> {
        let Some(hash) = client.client_secret_hash.clone() else {
            return Ok(());
        };

        let secret = client_secret
            .ok_or_else(|| OAuthError::InvalidClient("client secret required".to_string()))?
            .to_string();

        let matches = tokio::task::spawn_blocking(move || locky_auth::verify_password(&secret, &hash))
            .await
            .map_err(|e| OAuthError::Internal(format!("verify task failed: {e}")))?
            .map_err(|_| OAuthError::InvalidClient("client secret unreadable".to_string()))?;

        if !matches {
            return Err(OAuthError::InvalidClient("invalid client secret".to_string()));
        }
        Ok(())
    }

    /// Every requested scope must be registered for the client.
    fn check_scopes(&self, client: &OAuthClient, requested: &str) -> Result<(), OAuthError> {
        for scope in requested.split_whitespace() {
            if !client.scopes.iter().any(|s| s == scope) {
                return Err(OAuthError::InvalidScope(scope.to_string()));
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for OAuthService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthService")
            .field("code_ttl", &self.config.code_ttl)
            .finish()
    }
}
