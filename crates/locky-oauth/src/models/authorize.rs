//! Authorization endpoint request/response models.

use uuid::Uuid;

/// A validated `GET /oauth2/authorize` request.
///
/// `user_id` is populated by the adapter once the end user has
/// authenticated, either from a validated session cookie or from the
/// embedded login flow. The engine refuses to mint codes for anonymous
/// requests by construction.
#[derive(Debug, Clone)]
pub struct AuthorizeRequest {
    pub response_type: String,
    pub client_id: String,
    pub redirect_uri: String,
    /// Requested scopes, space separated.
    pub scope: String,
    /// Opaque client state, echoed back on redirect.
    pub state: String,
    /// PKCE S256 challenge.
    pub code_challenge: String,
    /// Must be `S256`.
    pub code_challenge_method: String,
    /// OIDC nonce, carried through but not interpreted here.
    pub nonce: Option<String>,
    /// The authenticated end user.
    pub user_id: Uuid,
}

/// The outcome of a successful authorization: the plaintext code to
/// deliver via redirect, plus the echo parameters.
#[derive(Debug, Clone)]
pub struct AuthorizeResponse {
    /// Single-use plaintext code. Never stored; only its digest is.
    pub code: String,
    pub state: String,
    pub redirect_uri: String,
}
