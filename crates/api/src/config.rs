//! Process configuration read from the environment.

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Context, bail};

use boardroom_auth::{DEFAULT_SESSION_TTL_DAYS, MAX_SESSION_TTL_DAYS};

const DEV_JWT_SECRET: &str = "dev-secret";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub jwt_secret: String,
    /// Postgres connection string. `None` selects the in-memory store.
    pub database_url: Option<String>,
    pub bind_addr: SocketAddr,
    /// Single origin allowed to make credentialed cross-origin requests.
    pub cors_origin: String,
    pub session_ttl_days: i64,
    pub request_timeout: Duration,
    /// Adds `Secure` to the session cookie.
    pub cookie_secure: bool,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let jwt_secret = get("JWT_SECRET").unwrap_or_else(|| {
            tracing::warn!("JWT_SECRET not set; using insecure dev default");
            DEV_JWT_SECRET.to_string()
        });

        let bind_addr = get("BIND_ADDR")
            .unwrap_or_else(|| "0.0.0.0:8080".to_string())
            .parse()
            .context("BIND_ADDR must be host:port")?;

        let session_ttl_days = match get("SESSION_TTL_DAYS") {
            Some(v) => v.trim().parse().context("SESSION_TTL_DAYS must be an integer")?,
            None => DEFAULT_SESSION_TTL_DAYS,
        };
        if !(1..=MAX_SESSION_TTL_DAYS).contains(&session_ttl_days) {
            bail!("SESSION_TTL_DAYS must be between 1 and {MAX_SESSION_TTL_DAYS}");
        }

        let timeout_secs: u64 = match get("REQUEST_TIMEOUT_SECS") {
            Some(v) => v.trim().parse().context("REQUEST_TIMEOUT_SECS must be an integer")?,
            None => 10,
        };

        let cookie_secure = match get("COOKIE_SECURE").as_deref().map(str::trim) {
            None | Some("0") | Some("false") => false,
            Some("1") | Some("true") => true,
            Some(other) => bail!("COOKIE_SECURE must be true or false, got {other:?}"),
        };

        Ok(Self {
            jwt_secret,
            database_url: get("DATABASE_URL"),
            bind_addr,
            cors_origin: get("CORS_ORIGIN").unwrap_or_else(|| "http://localhost:5173".to_string()),
            session_ttl_days,
            request_timeout: Duration::from_secs(timeout_secs),
            cookie_secure,
        })
    }

    /// In-memory configuration with the given signing secret.
    pub fn in_memory(jwt_secret: impl Into<String>) -> Self {
        Self {
            jwt_secret: jwt_secret.into(),
            database_url: None,
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
            cors_origin: "http://localhost:5173".to_string(),
            session_ttl_days: DEFAULT_SESSION_TTL_DAYS,
            request_timeout: Duration::from_secs(10),
            cookie_secure: false,
        }
    }

    pub fn session_ttl(&self) -> chrono::Duration {
        chrono::Duration::days(self.session_ttl_days)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn from_map(pairs: &[(&str, &str)]) -> anyhow::Result<AppConfig> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|k| map.get(k).cloned())
    }

    #[test]
    fn defaults() {
        let cfg = from_map(&[]).unwrap();
        assert_eq!(cfg.jwt_secret, DEV_JWT_SECRET);
        assert!(cfg.database_url.is_none());
        assert_eq!(cfg.bind_addr.port(), 8080);
        assert_eq!(cfg.cors_origin, "http://localhost:5173");
        assert_eq!(cfg.session_ttl(), chrono::Duration::days(30));
        assert_eq!(cfg.request_timeout, Duration::from_secs(10));
        assert!(!cfg.cookie_secure);
    }

    #[test]
    fn overrides() {
        let cfg = from_map(&[
            ("JWT_SECRET", "s3cret"),
            ("DATABASE_URL", "postgres://localhost/boards"),
            ("BIND_ADDR", "127.0.0.1:9000"),
            ("SESSION_TTL_DAYS", "7"),
            ("COOKIE_SECURE", "true"),
        ])
        .unwrap();
        assert_eq!(cfg.jwt_secret, "s3cret");
        assert_eq!(cfg.database_url.as_deref(), Some("postgres://localhost/boards"));
        assert_eq!(cfg.bind_addr.port(), 9000);
        assert_eq!(cfg.session_ttl_days, 7);
        assert!(cfg.cookie_secure);
    }

    #[test]
    fn empty_values_are_unset() {
        let cfg = from_map(&[("DATABASE_URL", ""), ("JWT_SECRET", "  ")]).unwrap();
        assert!(cfg.database_url.is_none());
        assert_eq!(cfg.jwt_secret, DEV_JWT_SECRET);
    }

    #[test]
    fn rejects_bad_values() {
        assert!(from_map(&[("BIND_ADDR", "nope")]).is_err());
        assert!(from_map(&[("SESSION_TTL_DAYS", "0")]).is_err());
        assert!(from_map(&[("SESSION_TTL_DAYS", "x")]).is_err());
        assert!(from_map(&[("SESSION_TTL_DAYS", "100000000")]).is_err());
        assert!(from_map(&[("SESSION_TTL_DAYS", "3650")]).is_ok());
        assert!(from_map(&[("COOKIE_SECURE", "maybe")]).is_err());
    }
}
