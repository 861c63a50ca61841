//! Client configuration.
//!
//! Values come from the process environment (a `.env` file is honoured via
//! `dotenvy`). Every setting has a default matching the portal's own
//! front-end constants, so an empty environment yields a usable config.

use std::time::Duration;

use crate::error::ClientError;

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:5000";
pub const DEFAULT_MAX_RECONNECT_ATTEMPTS: u32 = 5;
pub const DEFAULT_RECONNECT_DELAY_MS: u64 = 3_000;
pub const DEFAULT_LIKE_CACHE_TTL_SECS: u64 = 30;
pub const DEFAULT_LOGS_PER_PAGE: u32 = 50;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortalConfig {
    pub base_url: String,
    /// Raw `Cookie` header value carrying the portal login session.
    pub session_cookie: Option<String>,
    pub max_reconnect_attempts: u32,
    pub reconnect_delay: Duration,
    pub like_cache_ttl: Duration,
    pub logs_per_page: u32,
    pub request_timeout: Duration,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            session_cookie: None,
            max_reconnect_attempts: DEFAULT_MAX_RECONNECT_ATTEMPTS,
            reconnect_delay: Duration::from_millis(DEFAULT_RECONNECT_DELAY_MS),
            like_cache_ttl: Duration::from_secs(DEFAULT_LIKE_CACHE_TTL_SECS),
            logs_per_page: DEFAULT_LOGS_PER_PAGE,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }
}

impl PortalConfig {
    /// Load from the environment, reading `.env` first when present.
    pub fn from_env() -> Result<Self, ClientError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup. Split out so tests do not
    /// have to mutate process-wide environment variables.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ClientError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let base_url = non_empty(lookup("ESG_PORTAL_BASE_URL"))
            .map(|value| value.trim_end_matches('/').to_string())
            .unwrap_or(defaults.base_url);
        let session_cookie = non_empty(lookup("ESG_PORTAL_SESSION_COOKIE"));

        let max_reconnect_attempts = parse_or(
            &lookup,
            "ESG_PORTAL_MAX_RECONNECT_ATTEMPTS",
            defaults.max_reconnect_attempts,
        )?;
        let reconnect_delay = Duration::from_millis(parse_or(
            &lookup,
            "ESG_PORTAL_RECONNECT_DELAY_MS",
            DEFAULT_RECONNECT_DELAY_MS,
        )?);
        let like_cache_ttl = Duration::from_secs(parse_or(
            &lookup,
            "ESG_PORTAL_LIKE_CACHE_TTL_SECS",
            DEFAULT_LIKE_CACHE_TTL_SECS,
        )?);
        let logs_per_page = parse_or(&lookup, "ESG_PORTAL_LOGS_PER_PAGE", defaults.logs_per_page)?;
        if logs_per_page == 0 {
            return Err(ClientError::Config(
                "ESG_PORTAL_LOGS_PER_PAGE must be greater than 0".to_string(),
            ));
        }
        let request_timeout = Duration::from_secs(parse_or(
            &lookup,
            "ESG_PORTAL_REQUEST_TIMEOUT_SECS",
            DEFAULT_REQUEST_TIMEOUT_SECS,
        )?);

        Ok(Self {
            base_url,
            session_cookie,
            max_reconnect_attempts,
            reconnect_delay,
            like_cache_ttl,
            logs_per_page,
            request_timeout,
        })
    }

    /// Join a portal path onto the configured base URL.
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ClientError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match non_empty(lookup(key)) {
        Some(raw) => raw
            .parse::<T>()
            .map_err(|e| ClientError::Config(format!("invalid {key} value '{raw}': {e}"))),
        None => Ok(default),
    }
}
