//! Token endpoint request/response models.

use serde::{Deserialize, Serialize};

/// A `POST /oauth2/token` request, already form-decoded by the adapter.
#[derive(Debug, Clone, Default)]
pub struct TokenRequest {
    pub grant_type: String,
    /// `authorization_code` grant: the plaintext code.
    pub code: Option<String>,
    /// `authorization_code` grant: must equal the code's redirect URI.
    pub redirect_uri: Option<String>,
    /// `authorization_code` grant: the PKCE verifier.
    pub code_verifier: Option<String>,
    /// `refresh_token` grant: the plaintext refresh token.
    pub refresh_token: Option<String>,
    pub client_id: String,
    pub client_secret: Option<String>,
    /// Requested scope; on refresh it may only narrow.
    pub scope: Option<String>,
}

/// A successful token response (RFC 6749 §5.1).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_refresh_token_omitted_when_absent() {
        let response = TokenResponse {
            access_token: "jwt".to_string(),
            token_type: "Bearer".to_string(),
            expires_in: 900,
            refresh_token: None,
            scope: Some("api:read".to_string()),
        };
        let json = serde_json::to_string(&response).unwrap();
        assert!(!json.contains("refresh_token"));
        assert!(json.contains("\"expires_in\":900"));
    }
}
