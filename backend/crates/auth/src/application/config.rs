//! Application Configuration
//!
//! Configuration for the Auth application layer. Built once by the binary
//! and shared behind `Arc`; nothing in this crate reads the environment.

use std::fmt;
use std::net::IpAddr;
use std::time::Duration;

use platform::rate_limit::RateLimitConfig;

/// HMAC key for access tokens
///
/// Debug output is redacted.
#[derive(Clone, PartialEq, Eq)]
pub struct SigningSecret(Vec<u8>);

impl SigningSecret {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// 32 random bytes (for development and tests)
    pub fn random() -> Self {
        Self(platform::crypto::random_bytes(32))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for SigningSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SigningSecret")
            .field(&"[REDACTED]")
            .finish()
    }
}

/// Auth application configuration
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Access token signing key
    pub signing_secret: SigningSecret,
    /// Access token lifetime (15 minutes)
    pub access_token_ttl: Duration,
    /// Refresh token lifetime without "Remember Me" (1 day)
    pub refresh_token_ttl: Duration,
    /// Refresh token lifetime with "Remember Me" (30 days)
    pub refresh_token_extended_ttl: Duration,
    /// Interval of the expired refresh token sweep (1 hour)
    pub sweep_interval: Duration,
    /// Limiter in front of the refresh endpoint (10 per minute)
    pub refresh_rate_limit: RateLimitConfig,
    /// Deadline for every store call
    pub store_timeout: Duration,
    /// Admin role cache lifetime, zero disables the cache
    pub role_cache_ttl: Duration,
    /// Password pepper (optional, application-wide secret)
    pub password_pepper: Option<Vec<u8>>,
    /// Reverse proxies whose X-Forwarded-For is believed, empty trusts none
    pub trusted_proxies: Vec<IpAddr>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self::new(SigningSecret::random())
    }
}

impl AuthConfig {
    /// Default lifetimes with the given signing secret
    pub fn new(signing_secret: SigningSecret) -> Self {
        Self {
            signing_secret,
            access_token_ttl: Duration::from_secs(15 * 60),
            refresh_token_ttl: Duration::from_secs(24 * 3600),
            refresh_token_extended_ttl: Duration::from_secs(30 * 24 * 3600),
            sweep_interval: Duration::from_secs(3600),
            refresh_rate_limit: RateLimitConfig::new(10, 60),
            store_timeout: Duration::from_secs(5),
            role_cache_ttl: Duration::ZERO,
            password_pepper: None,
            trusted_proxies: Vec::new(),
        }
    }

    /// Create config for development (random secret, short role cache)
    pub fn development() -> Self {
        Self {
            role_cache_ttl: Duration::from_secs(5),
            ..Self::default()
        }
    }

    /// Refresh token lifetime for the given "Remember Me" choice
    pub fn refresh_ttl(&self, extended: bool) -> Duration {
        if extended {
            self.refresh_token_extended_ttl
        } else {
            self.refresh_token_ttl
        }
    }

    /// Get password pepper as slice
    pub fn pepper(&self) -> Option<&[u8]> {
        self.password_pepper.as_deref()
    }
}
