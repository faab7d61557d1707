//! Engine configuration.
//!
//! A plain immutable value constructed by the host and handed to the
//! services at construction time. There is no global state and no
//! environment lookup here; loading is the host's concern.

use chrono::Duration;
use thiserror::Error;

/// Default session cookie name the adapter should use.
pub const DEFAULT_SESSION_COOKIE: &str = "locky_session";

/// Length in bytes required of the private-key master key (AES-256-GCM).
pub const MASTER_KEY_LEN: usize = 32;

/// Configuration error raised by [`EngineConfig::validate`].
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// No master key was supplied and plaintext key storage was not
    /// explicitly permitted.
    #[error("master key is required; set one or explicitly allow plaintext key storage")]
    MasterKeyRequired,

    /// The master key has the wrong length.
    #[error("master key must be {MASTER_KEY_LEN} bytes, got {0}")]
    MasterKeyLength(usize),

    /// `base_domain` is empty.
    #[error("base_domain must not be empty")]
    EmptyBaseDomain,
}

/// Immutable engine configuration.
///
/// All durations are absolute validity windows, not idle timeouts.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Validity of issued access tokens.
    pub access_token_ttl: Duration,

    /// Validity of issued refresh tokens.
    pub refresh_token_ttl: Duration,

    /// Absolute session lifetime, measured from `created_at`.
    pub session_ttl: Duration,

    /// Validity of authorization codes.
    pub code_ttl: Duration,

    /// Suffix under which tenant slugs resolve as subdomains
    /// (`<slug>.<base_domain>`).
    pub base_domain: String,

    /// Lifetime of newly provisioned signing keys
    /// (`not_after - not_before`).
    pub signing_key_lifetime: Duration,

    /// AES-256-GCM key wrapping stored private keys. Required unless
    /// `allow_plaintext_keys` is set.
    pub master_key: Option<Vec<u8>>,

    /// Permit storing private keys unsealed. Development only.
    pub allow_plaintext_keys: bool,

    /// Name of the browser session cookie the adapter sets.
    pub session_cookie_name: String,

    /// Cadence of the background sweeper.
    pub sweep_interval: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            access_token_ttl: Duration::minutes(15),
            refresh_token_ttl: Duration::days(14),
            session_ttl: Duration::days(30),
            code_ttl: Duration::minutes(10),
            base_domain: String::new(),
            signing_key_lifetime: Duration::days(90),
            master_key: None,
            allow_plaintext_keys: false,
            session_cookie_name: DEFAULT_SESSION_COOKIE.to_string(),
            sweep_interval: Duration::hours(1),
        }
    }
}

impl EngineConfig {
    /// Create a builder pre-populated with the defaults.
    #[must_use]
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder {
            config: Self::default(),
        }
    }

    /// Check the configuration for production soundness.
    ///
    /// Fails when no master key is present and plaintext key storage was
    /// not explicitly permitted, when the master key has the wrong length,
    /// or when `base_domain` is empty. Hosts should call this at startup
    /// and refuse to boot on error.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match &self.master_key {
            None if !self.allow_plaintext_keys => return Err(ConfigError::MasterKeyRequired),
            Some(key) if key.len() != MASTER_KEY_LEN => {
                return Err(ConfigError::MasterKeyLength(key.len()))
            }
            _ => {}
        }
        if self.base_domain.is_empty() {
            return Err(ConfigError::EmptyBaseDomain);
        }
        Ok(())
    }

    /// The issuer URL for a tenant, derived from its slug.
    #[must_use]
    pub fn issuer_for(&self, slug: &str) -> String {
        format!("https://{}.{}", slug, self.base_domain)
    }
}

/// Builder for [`EngineConfig`].
#[derive(Debug, Clone)]
pub struct EngineConfigBuilder {
    config: EngineConfig,
}

impl EngineConfigBuilder {
    /// Set the access-token validity.
    #[must_use]
    pub fn access_token_ttl(mut self, ttl: Duration) -> Self {
        self.config.access_token_ttl = ttl;
        self
    }

    /// Set the refresh-token validity.
    #[must_use]
    pub fn refresh_token_ttl(mut self, ttl: Duration) -> Self {
        self.config.refresh_token_ttl = ttl;
        self
    }

    /// Set the absolute session lifetime.
    #[must_use]
    pub fn session_ttl(mut self, ttl: Duration) -> Self {
        self.config.session_ttl = ttl;
        self
    }

    /// Set the authorization-code validity.
    #[must_use]
    pub fn code_ttl(mut self, ttl: Duration) -> Self {
        self.config.code_ttl = ttl;
        self
    }

    /// Set the base domain for subdomain slug resolution.
    #[must_use]
    pub fn base_domain(mut self, domain: impl Into<String>) -> Self {
        self.config.base_domain = domain.into();
        self
    }

    /// Set the signing-key lifetime.
    #[must_use]
    pub fn signing_key_lifetime(mut self, lifetime: Duration) -> Self {
        self.config.signing_key_lifetime = lifetime;
        self
    }

    /// Set the master key wrapping stored private keys.
    #[must_use]
    pub fn master_key(mut self, key: Vec<u8>) -> Self {
        self.config.master_key = Some(key);
        self
    }

    /// Permit plaintext private-key storage. Development only.
    #[must_use]
    pub fn allow_plaintext_keys(mut self, allow: bool) -> Self {
        self.config.allow_plaintext_keys = allow;
        self
    }

    /// Set the session cookie name.
    #[must_use]
    pub fn session_cookie_name(mut self, name: impl Into<String>) -> Self {
        self.config.session_cookie_name = name.into();
        self
    }

    /// Set the sweeper cadence.
    #[must_use]
    pub fn sweep_interval(mut self, interval: Duration) -> Self {
        self.config.sweep_interval = interval;
        self
    }

    /// Finish building.
    #[must_use]
    pub fn build(self) -> EngineConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> EngineConfig {
        EngineConfig::builder()
            .base_domain("auth.example.com")
            .master_key(vec![0u8; MASTER_KEY_LEN])
            .build()
    }

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.access_token_ttl, Duration::minutes(15));
        assert_eq!(config.refresh_token_ttl, Duration::days(14));
        assert_eq!(config.session_ttl, Duration::days(30));
        assert_eq!(config.code_ttl, Duration::minutes(10));
        assert_eq!(config.signing_key_lifetime, Duration::days(90));
        assert_eq!(config.session_cookie_name, DEFAULT_SESSION_COOKIE);
        assert_eq!(config.sweep_interval, Duration::hours(1));
    }

    #[test]
    fn test_validate_accepts_master_key() {
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn test_validate_requires_master_key() {
        let config = EngineConfig::builder()
            .base_domain("auth.example.com")
            .build();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MasterKeyRequired)
        ));
    }

    #[test]
    fn test_validate_allows_explicit_plaintext() {
        let config = EngineConfig::builder()
            .base_domain("auth.example.com")
            .allow_plaintext_keys(true)
            .build();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_short_master_key() {
        let config = EngineConfig::builder()
            .base_domain("auth.example.com")
            .master_key(vec![0u8; 16])
            .build();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MasterKeyLength(16))
        ));
    }

    #[test]
    fn test_validate_rejects_empty_base_domain() {
        let config = EngineConfig::builder()
            .master_key(vec![0u8; MASTER_KEY_LEN])
            .build();
        assert!(matches!(config.validate(), Err(ConfigError::EmptyBaseDomain)));
    }

    #[test]
    fn test_issuer_for_slug() {
        let config = valid_config();
        assert_eq!(config.issuer_for("acme"), "https://acme.auth.example.com");
    }
}
