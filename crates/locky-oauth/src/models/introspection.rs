//! Token introspection response model (RFC 7662).

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Introspection result. Inactive responses carry nothing but
/// `active: false` so callers cannot probe for token existence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntrospectionResponse {
    pub active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    /// The client the token was issued to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aud: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tid: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
}

impl IntrospectionResponse {
    /// The anti-enumeration response: nothing but `active: false`.
    #[must_use]
    pub fn inactive() -> Self {
        Self {
            active: false,
            sub: None,
            aud: None,
            tid: None,
            scope: None,
            exp: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inactive_reveals_nothing() {
        let json = serde_json::to_string(&IntrospectionResponse::inactive()).unwrap();
        assert_eq!(json, "{\"active\":false}");
    }
}
