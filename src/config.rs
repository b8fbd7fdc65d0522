//! Client configuration parsed from environment variables.
//!
//! The API base URL is resolved once here and never re-derived per request.

use std::time::Duration;

use url::Url;

pub const DEFAULT_DEV_API_URL: &str = "http://localhost:5173/api";
pub const DEFAULT_PROD_API_URL: &str = "http://localhost:8000/api";
pub const DEFAULT_CSRF_COOKIE: &str = "csrftoken";
/// Wait after a token is issued before the caller proceeds. Empirical: gives
/// the cookie write time to land.
pub const DEFAULT_CSRF_SETTLE_MS: u64 = 100;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

const API_SUFFIX: &str = "/api";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("unknown TASKDESK_ENV: {0}")]
    UnknownEnvironment(String),
    #[error("invalid API URL {url:?}: {reason}")]
    InvalidApiUrl { url: String, reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    /// Talks to the dev server, which proxies `/api` to the backend.
    Development,
    /// Talks to the backend directly.
    Production,
}

impl std::str::FromStr for Environment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_environment(Some(s.trim()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub request_secs: u64,
    pub connect_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub environment: Environment,
    pub api_url: Url,
    pub origin: Option<String>,
    pub csrf_cookie: String,
    pub csrf_settle: Duration,
    pub timeouts: Timeouts,
}

impl ClientConfig {
    /// Build typed client config from environment variables.
    ///
    /// Optional:
    /// - `TASKDESK_ENV`: `development` (default) or `production`
    /// - `TASKDESK_API_URL`: API base, normalized to end in `/api`
    /// - `TASKDESK_ORIGIN`: sent as `Origin`/`Referer`
    /// - `TASKDESK_CSRF_COOKIE`: default `csrftoken`
    /// - `TASKDESK_CSRF_SETTLE_MS`: default 100
    /// - `TASKDESK_REQUEST_TIMEOUT_SECS`: default 30
    /// - `TASKDESK_CONNECT_TIMEOUT_SECS`: default 10
    ///
    /// # Errors
    ///
    /// Returns an error if the environment name or API URL is invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        let environment = parse_environment(env_non_empty("TASKDESK_ENV").as_deref())?;
        let api_url = resolve_api_url(environment, env_non_empty("TASKDESK_API_URL").as_deref())?;
        let origin = env_non_empty("TASKDESK_ORIGIN").map(|o| o.trim_end_matches('/').to_owned());
        let csrf_cookie = env_non_empty("TASKDESK_CSRF_COOKIE").unwrap_or_else(|| DEFAULT_CSRF_COOKIE.to_owned());

        Ok(Self {
            environment,
            api_url,
            origin,
            csrf_cookie,
            csrf_settle: Duration::from_millis(env_parse_u64("TASKDESK_CSRF_SETTLE_MS", DEFAULT_CSRF_SETTLE_MS)),
            timeouts: Timeouts {
                request_secs: env_parse_u64("TASKDESK_REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS),
                connect_secs: env_parse_u64("TASKDESK_CONNECT_TIMEOUT_SECS", DEFAULT_CONNECT_TIMEOUT_SECS),
            },
        })
    }

    /// Config for a given environment with every other value defaulted.
    #[must_use]
    pub fn for_api_url(environment: Environment, api_url: Url) -> Self {
        Self {
            environment,
            api_url,
            origin: None,
            csrf_cookie: DEFAULT_CSRF_COOKIE.to_owned(),
            csrf_settle: Duration::from_millis(DEFAULT_CSRF_SETTLE_MS),
            timeouts: Timeouts {
                request_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
                connect_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            },
        }
    }
}

fn env_non_empty(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

fn env_parse_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(default)
}

pub(crate) fn parse_environment(raw: Option<&str>) -> Result<Environment, ConfigError> {
    match raw.unwrap_or("development").to_ascii_lowercase().as_str() {
        "development" | "dev" => Ok(Environment::Development),
        "production" | "prod" => Ok(Environment::Production),
        other => Err(ConfigError::UnknownEnvironment(other.to_owned())),
    }
}

/// Pick the API base for `environment`, honoring an explicit override.
///
/// # Errors
///
/// Returns an error if the URL is not absolute http(s).
pub fn resolve_api_url(environment: Environment, raw: Option<&str>) -> Result<Url, ConfigError> {
    let raw = raw.unwrap_or(match environment {
        Environment::Development => DEFAULT_DEV_API_URL,
        Environment::Production => DEFAULT_PROD_API_URL,
    });
    normalize_api_url(raw)
}

/// Parse `raw` and make its path end in exactly `/api`.
///
/// `https://tasks.example.com` and `https://tasks.example.com/api/` both
/// become `https://tasks.example.com/api`.
///
/// # Errors
///
/// Returns an error if `raw` is not an absolute http(s) URL.
pub fn normalize_api_url(raw: &str) -> Result<Url, ConfigError> {
    let invalid = |reason: &str| ConfigError::InvalidApiUrl { url: raw.to_owned(), reason: reason.to_owned() };

    let mut url = Url::parse(raw.trim()).map_err(|e| invalid(&e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid("scheme must be http or https"));
    }
    if url.query().is_some() || url.fragment().is_some() {
        return Err(invalid("query and fragment are not allowed"));
    }

    let path = url.path().trim_end_matches('/');
    let path = if path.ends_with(API_SUFFIX) { path.to_owned() } else { format!("{path}{API_SUFFIX}") };
    url.set_path(&path);
    Ok(url)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
