//! Server configuration from environment variables
//!
//! Read once at startup after `dotenvy::dotenv()`. Lookups go through a
//! closure so tests never touch the process environment.

use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, bail};
use auth::{AuthConfig, SigningSecret};
use platform::rate_limit::RateLimitConfig;

/// Minimum signing secret length in bytes
const MIN_SECRET_LEN: usize = 32;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:31113";
const DEFAULT_FRONTEND_ORIGINS: &str = "http://localhost:40922,http://127.0.0.1:40922";

#[derive(Debug)]
pub struct ServerConfig {
    pub database_url: String,
    pub bind_addr: SocketAddr,
    pub frontend_origins: Vec<String>,
    pub auth: AuthConfig,
}

impl ServerConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok(), cfg!(debug_assertions))
    }

    /// `development` allows a missing `JWT_SECRET` (a random one is used)
    pub fn from_lookup<F>(lookup: F, development: bool) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let vars = Vars(lookup);

        let database_url = vars
            .get("DATABASE_URL")
            .context("DATABASE_URL must be set in environment")?;

        let bind_addr = vars.parse_or("BIND_ADDR", DEFAULT_BIND_ADDR.parse::<SocketAddr>()?)?;

        let frontend_origins = vars
            .get("FRONTEND_ORIGINS")
            .unwrap_or_else(|| DEFAULT_FRONTEND_ORIGINS.to_string())
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(str::to_owned)
            .collect();

        Ok(Self {
            database_url,
            bind_addr,
            frontend_origins,
            auth: auth_config(&vars, development)?,
        })
    }
}

fn auth_config<F>(vars: &Vars<F>, development: bool) -> anyhow::Result<AuthConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let signing_secret = match vars.get("JWT_SECRET") {
        Some(secret) if secret.len() < MIN_SECRET_LEN => {
            bail!("JWT_SECRET must be at least {MIN_SECRET_LEN} bytes")
        }
        Some(secret) => SigningSecret::new(secret.into_bytes()),
        None if development => {
            tracing::warn!("JWT_SECRET not set, using a random secret (tokens will not survive a restart)");
            SigningSecret::random()
        }
        None => bail!("JWT_SECRET must be set in production"),
    };

    let defaults = AuthConfig::new(signing_secret);

    let access_minutes = vars.parse_or("ACCESS_TOKEN_TTL_MINUTES", defaults.access_token_ttl.as_secs() / MINUTE)?;
    let refresh_days = vars.parse_or("REFRESH_TOKEN_TTL_DAYS", defaults.refresh_token_ttl.as_secs() / DAY)?;
    let extended_days = vars.parse_or(
        "REFRESH_TOKEN_EXTENDED_TTL_DAYS",
        defaults.refresh_token_extended_ttl.as_secs() / DAY,
    )?;
    let sweep_hours = vars.parse_or("TOKEN_CLEANUP_INTERVAL_HOURS", defaults.sweep_interval.as_secs() / HOUR)?;

    let max_requests: u32 = vars.parse_or("REFRESH_RATE_LIMIT_REQUESTS", defaults.refresh_rate_limit.max_requests)?;
    let window_secs: u64 = vars.parse_or(
        "REFRESH_RATE_LIMIT_WINDOW_SECS",
        defaults.refresh_rate_limit.window.as_secs(),
    )?;
    let burst: u32 = vars.parse_or("REFRESH_RATE_LIMIT_BURST", max_requests)?;

    let trusted_proxies = match vars.get("TRUSTED_PROXIES") {
        Some(raw) => raw
            .split(',')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(|entry| {
                entry
                    .parse::<IpAddr>()
                    .with_context(|| format!("TRUSTED_PROXIES has an invalid address: {entry:?}"))
            })
            .collect::<anyhow::Result<Vec<_>>>()?,
        None => Vec::new(),
    };

    let store_timeout_secs = vars.parse_or("STORE_TIMEOUT_SECS", defaults.store_timeout.as_secs())?;
    let role_cache_secs = vars.parse_or("ROLE_CACHE_TTL_SECS", defaults.role_cache_ttl.as_secs())?;

    if access_minutes == 0 || refresh_days == 0 || extended_days == 0 {
        bail!("token lifetimes must be positive");
    }
    if sweep_hours == 0 {
        bail!("TOKEN_CLEANUP_INTERVAL_HOURS must be positive");
    }
    if max_requests == 0 || window_secs == 0 || burst == 0 {
        bail!("refresh rate limit values must be positive");
    }
    if store_timeout_secs == 0 {
        bail!("STORE_TIMEOUT_SECS must be positive");
    }

    if window_secs > MAX_LIFETIME_SECS {
        bail!("REFRESH_RATE_LIMIT_WINDOW_SECS is too large");
    }

    Ok(AuthConfig {
        access_token_ttl: lifetime("ACCESS_TOKEN_TTL_MINUTES", access_minutes, MINUTE)?,
        refresh_token_ttl: lifetime("REFRESH_TOKEN_TTL_DAYS", refresh_days, DAY)?,
        refresh_token_extended_ttl: lifetime("REFRESH_TOKEN_EXTENDED_TTL_DAYS", extended_days, DAY)?,
        sweep_interval: lifetime("TOKEN_CLEANUP_INTERVAL_HOURS", sweep_hours, HOUR)?,
        refresh_rate_limit: RateLimitConfig::new(max_requests, window_secs).with_burst(burst),
        store_timeout: Duration::from_secs(store_timeout_secs),
        role_cache_ttl: Duration::from_secs(role_cache_secs),
        password_pepper: vars.get("PASSWORD_PEPPER").map(String::into_bytes),
        trusted_proxies,
        ..defaults
    })
}

const MINUTE: u64 = 60;
const HOUR: u64 = 60 * MINUTE;
const DAY: u64 = 24 * HOUR;

/// Upper bound for any configured lifetime (100 years)
const MAX_LIFETIME_SECS: u64 = 100 * 365 * DAY;

/// `value * unit` seconds, rejecting overflow and lifetimes past [`MAX_LIFETIME_SECS`]
fn lifetime(key: &str, value: u64, unit: u64) -> anyhow::Result<Duration> {
    match value.checked_mul(unit) {
        Some(secs) if secs <= MAX_LIFETIME_SECS => Ok(Duration::from_secs(secs)),
        _ => bail!("{key} is too large: {value}"),
    }
}

struct Vars<F>(F);

impl<F> Vars<F>
where
    F: Fn(&str) -> Option<String>,
{
    /// Unset and blank are the same
    fn get(&self, key: &str) -> Option<String> {
        (self.0)(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn parse_or<T>(&self, key: &str, default: T) -> anyhow::Result<T>
    where
        T: FromStr,
        T::Err: std::error::Error + Send + Sync + 'static,
    {
        match self.get(key) {
            Some(raw) => raw
                .parse()
                .with_context(|| format!("{key} has an invalid value: {raw:?}")),
            None => Ok(default),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    fn load(pairs: &[(&str, &str)], development: bool) -> anyhow::Result<ServerConfig> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServerConfig::from_lookup(|key| vars.get(key).cloned(), development)
    }

    #[test]
    fn test_defaults() {
        let config = load(&[("DATABASE_URL", "postgres://db"), ("JWT_SECRET", SECRET)], false).unwrap();

        assert_eq!(config.bind_addr, "0.0.0.0:31113".parse::<SocketAddr>().unwrap());
        assert_eq!(config.frontend_origins.len(), 2);
        assert_eq!(config.auth.access_token_ttl.as_secs(), 900);
        assert_eq!(config.auth.refresh_token_ttl.as_secs(), 86_400);
        assert_eq!(config.auth.refresh_token_extended_ttl.as_secs(), 30 * 86_400);
        assert_eq!(config.auth.sweep_interval.as_secs(), 3600);
        assert_eq!(config.auth.refresh_rate_limit.max_requests, 10);
        assert_eq!(config.auth.refresh_rate_limit.burst, 10);
        assert_eq!(config.auth.signing_secret.as_bytes(), SECRET.as_bytes());
        assert!(config.auth.password_pepper.is_none());
        assert!(config.auth.trusted_proxies.is_empty());
    }

    #[test]
    fn test_overrides() {
        let config = load(
            &[
                ("DATABASE_URL", "postgres://db"),
                ("JWT_SECRET", SECRET),
                ("BIND_ADDR", "127.0.0.1:8080"),
                ("FRONTEND_ORIGINS", "https://a.example, https://b.example,"),
                ("ACCESS_TOKEN_TTL_MINUTES", "5"),
                ("REFRESH_TOKEN_TTL_DAYS", "2"),
                ("REFRESH_TOKEN_EXTENDED_TTL_DAYS", "7"),
                ("TOKEN_CLEANUP_INTERVAL_HOURS", "6"),
                ("REFRESH_RATE_LIMIT_REQUESTS", "30"),
                ("REFRESH_RATE_LIMIT_WINDOW_SECS", "120"),
                ("REFRESH_RATE_LIMIT_BURST", "5"),
                ("ROLE_CACHE_TTL_SECS", "10"),
                ("TRUSTED_PROXIES", "10.0.0.1, ::1"),
            ],
            false,
        )
        .unwrap();

        assert_eq!(config.bind_addr, "127.0.0.1:8080".parse::<SocketAddr>().unwrap());
        assert_eq!(config.frontend_origins, vec!["https://a.example", "https://b.example"]);
        assert_eq!(config.auth.access_token_ttl.as_secs(), 300);
        assert_eq!(config.auth.refresh_token_ttl.as_secs(), 2 * 86_400);
        assert_eq!(config.auth.refresh_token_extended_ttl.as_secs(), 7 * 86_400);
        assert_eq!(config.auth.sweep_interval.as_secs(), 6 * 3600);
        assert_eq!(config.auth.refresh_rate_limit.max_requests, 30);
        assert_eq!(config.auth.refresh_rate_limit.window.as_secs(), 120);
        assert_eq!(config.auth.refresh_rate_limit.burst, 5);
        assert_eq!(config.auth.role_cache_ttl.as_secs(), 10);
        assert_eq!(
            config.auth.trusted_proxies,
            vec!["10.0.0.1".parse::<IpAddr>().unwrap(), "::1".parse::<IpAddr>().unwrap()]
        );
    }

    #[test]
    fn test_secret_rules() {
        assert!(load(&[("DATABASE_URL", "postgres://db")], false).is_err());
        assert!(load(&[("DATABASE_URL", "postgres://db"), ("JWT_SECRET", "short")], true).is_err());

        let config = load(&[("DATABASE_URL", "postgres://db")], true).unwrap();
        assert_eq!(config.auth.signing_secret.len(), 32);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let base = [("DATABASE_URL", "postgres://db"), ("JWT_SECRET", SECRET)];

        for bad in [
            ("ACCESS_TOKEN_TTL_MINUTES", "fifteen"),
            ("ACCESS_TOKEN_TTL_MINUTES", "0"),
            ("REFRESH_RATE_LIMIT_REQUESTS", "-1"),
            ("BIND_ADDR", "nowhere"),
            ("TRUSTED_PROXIES", "10.0.0.1, proxy.internal"),
        ] {
            let mut pairs = base.to_vec();
            pairs.push(bad);
            assert!(load(&pairs, false).is_err(), "{bad:?}");
        }

        assert!(load(&[("JWT_SECRET", SECRET)], false).is_err());
    }

    #[test]
    fn test_oversized_values_rejected() {
        let base = [("DATABASE_URL", "postgres://db"), ("JWT_SECRET", SECRET)];

        for bad in [
            ("REFRESH_TOKEN_EXTENDED_TTL_DAYS", "100000000"),
            ("REFRESH_TOKEN_TTL_DAYS", "18446744073709551615"),
            ("ACCESS_TOKEN_TTL_MINUTES", "18446744073709551615"),
            ("TOKEN_CLEANUP_INTERVAL_HOURS", "18446744073709551615"),
            ("REFRESH_RATE_LIMIT_WINDOW_SECS", "18446744073709551615"),
        ] {
            let mut pairs = base.to_vec();
            pairs.push(bad);
            let err = load(&pairs, false).unwrap_err();
            assert!(err.to_string().contains("too large"), "{bad:?}: {err}");
        }

        let config = load(
            &[
                ("DATABASE_URL", "postgres://db"),
                ("JWT_SECRET", SECRET),
                ("REFRESH_TOKEN_EXTENDED_TTL_DAYS", "3650"),
            ],
            false,
        )
        .unwrap();
        assert_eq!(config.auth.refresh_token_extended_ttl.as_secs(), 3650 * 86_400);
    }
}
